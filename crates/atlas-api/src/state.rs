//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use atlas_lookup::LookupCoordinator;

/// State shared by all handlers. Cheap to clone; the coordinator is the
/// single process-wide read point for the published atlas.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<LookupCoordinator>,
    /// Deployment environment label surfaced by the health probe.
    pub environment: String,
    /// Per-request lookup budget.
    pub lookup_timeout: Duration,
}

impl AppState {
    pub fn new(coordinator: Arc<LookupCoordinator>, environment: impl Into<String>) -> Self {
        Self {
            coordinator,
            environment: environment.into(),
            lookup_timeout: Duration::from_millis(500),
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }
}
