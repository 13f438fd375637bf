//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::rmv::RmvError;

use super::cors::cors;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let allowed_origins = state.allowed_origins.clone();

    Router::new()
        .route("/next-departures", get(next_departures))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(allowed_origins, cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Upcoming departures for the configured stop, passed through verbatim.
async fn next_departures(State(state): State<AppState>) -> Result<Response, AppError> {
    let departures = state
        .departures
        .get_departures(&state.stop_id)
        .await
        .map_err(|source| AppError::Departures {
            stop_id: state.stop_id.to_string(),
            source,
        })?;

    Ok(Json(&*departures).into_response())
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type.
///
/// The full error is logged; clients only see a generic message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("failed to fetch departures for stop {stop_id}: {source}")]
    Departures { stop_id: String, source: RmvError },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Departures { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch departures",
            ),
        };

        tracing::error!(%status, error = %self, "request failed");

        let body = Json(ErrorResponse {
            error: message.to_string(),
        });
        (status, body).into_response()
    }
}
