//! Application state for the web layer.

use std::sync::Arc;

use crate::departures::DepartureService;

use super::cors::AllowedOrigins;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Read-through departure lookup
    pub departures: Arc<DepartureService>,

    /// The stop served by `/next-departures`
    pub stop_id: Arc<str>,

    /// Origins allowed by the CORS layer
    pub allowed_origins: Arc<AllowedOrigins>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        departures: DepartureService,
        stop_id: impl Into<Arc<str>>,
        allowed_origins: AllowedOrigins,
    ) -> Self {
        Self {
            departures: Arc::new(departures),
            stop_id: stop_id.into(),
            allowed_origins: Arc::new(allowed_origins),
        }
    }
}
