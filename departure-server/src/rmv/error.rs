//! RMV client error types.

/// Errors from the RMV departure-board client.
#[derive(Debug, thiserror::Error)]
pub enum RmvError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status code
    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Client configuration was rejected before any request was made
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Response body was not valid JSON
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },
}

impl RmvError {
    /// Whether the request was abandoned because it hit the client timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RmvError::Http(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RmvError::Status {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "API returned status 503: Service Unavailable"
        );
        assert!(!err.is_timeout());

        let err = RmvError::Json {
            message: "expected value at line 1 column 1".into(),
            body: Some("<html>".into()),
        };
        assert!(err.to_string().contains("JSON parse error"));
        assert!(err.to_string().contains("expected value"));

        let err = RmvError::Config("access ID is empty".into());
        assert_eq!(err.to_string(), "invalid configuration: access ID is empty");
    }
}
