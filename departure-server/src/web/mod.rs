//! Web layer for the departure server.
//!
//! One JSON endpoint passing the cached departure board through, plus a
//! health check, behind the allow-list CORS middleware.

mod cors;
mod routes;
mod state;

pub use cors::{AllowedOrigins, cors};
pub use routes::{AppError, ErrorResponse, create_router};
pub use state::AppState;
