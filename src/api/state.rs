//! Application state module.
//!
//! Contains the shared Kuaishou service and the download task registry.

use crate::models::TaskRegistry;
use crate::services::KuaishouService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Link resolution, extraction and downloads
    pub service: KuaishouService,
    /// Background download tasks
    pub tasks: TaskRegistry,
}

impl AppState {
    /// Creates a new `AppState` instance.
    #[must_use]
    pub const fn new(service: KuaishouService, tasks: TaskRegistry) -> Self {
        Self { service, tasks }
    }
}
