//! Allow-list CORS middleware.
//!
//! The request `Origin` is echoed back only when it is on the allow-list or
//! the list contains `*`. Every `OPTIONS` request is answered with
//! `204 No Content` before it reaches a route.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Origins permitted to read responses from a browser.
#[derive(Debug, Clone, Default)]
pub struct AllowedOrigins {
    origins: Vec<String>,
}

impl AllowedOrigins {
    /// Parse a comma-separated list, trimming entries and dropping empty ones.
    pub fn parse(raw: &str) -> Self {
        let origins = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        Self { origins }
    }

    /// Whether `origin` may be reflected back.
    pub fn allows(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == origin || o == "*")
    }

    pub fn as_slice(&self) -> &[String] {
        &self.origins
    }
}

/// CORS middleware, layered with `axum::middleware::from_fn_with_state`.
pub async fn cors(
    State(allowed): State<Arc<AllowedOrigins>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .filter(|o| o.to_str().is_ok_and(|o| allowed.allows(o)))
        .cloned();

    let mut response = if *request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    if let Some(origin) = origin {
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
    }

    response
}
