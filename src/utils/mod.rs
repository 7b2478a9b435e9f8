//! 유틸리티 모듈.

pub mod count;
pub mod filename;
pub mod time;

pub use count::{count_from_value, duration_from_value, parse_count_with_unit, parse_duration};
pub use filename::filter_name;
pub use time::format_publish_time;
