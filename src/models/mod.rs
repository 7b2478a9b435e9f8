//! Model module.
//!
//! Contains the normalized video schema and background task records.

pub mod task;
pub mod video;

pub use task::*;
pub use video::*;
