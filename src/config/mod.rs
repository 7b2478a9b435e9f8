//! 설정 모듈.

pub mod cache;
pub mod env;
pub mod http;

pub use cache::*;
pub use env::*;
pub use http::*;
