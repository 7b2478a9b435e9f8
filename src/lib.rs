//! Kuaishou API service library.
//!
//! Resolves Kuaishou share links into normalized work metadata and runs
//! background media downloads.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
