use http::StatusCode;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The remote API answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never produced an HTTP status (connection, TLS, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Whether a failed dispatch is worth repeating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Quota exhaustion or a server-side fault
    Retryable,
    /// Anything else; surfaced to the caller immediately
    Fatal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Retryable => "retryable",
            ErrorClass::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an HTTP status: 429 and every 5xx are retryable, the rest is fatal.
pub fn classify_status(status: u16) -> ErrorClass {
    match StatusCode::from_u16(status) {
        Ok(code) if code == StatusCode::TOO_MANY_REQUESTS || code.is_server_error() => {
            ErrorClass::Retryable
        }
        _ => ErrorClass::Fatal,
    }
}

impl GatewayError {
    /// Build an HTTP error from a status and a response body.
    ///
    /// Google APIs wrap failures as `{"error": {"code": .., "message": ..}}`;
    /// the inner message is used when present, otherwise the raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| {
                json.pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.trim().to_string());

        GatewayError::Http { status, message }
    }

    /// The HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Retry classification of this error
    pub fn class(&self) -> ErrorClass {
        match self.status() {
            Some(status) => classify_status(status),
            None => ErrorClass::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => GatewayError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => GatewayError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for GatewayError {
    fn from(err: config::ConfigError) -> Self {
        GatewayError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(429), ErrorClass::Retryable);
        assert_eq!(classify_status(500), ErrorClass::Retryable);
        assert_eq!(classify_status(503), ErrorClass::Retryable);
        assert_eq!(classify_status(599), ErrorClass::Retryable);

        assert_eq!(classify_status(400), ErrorClass::Fatal);
        assert_eq!(classify_status(403), ErrorClass::Fatal);
        assert_eq!(classify_status(404), ErrorClass::Fatal);
        assert_eq!(classify_status(600), ErrorClass::Fatal);
        assert_eq!(classify_status(42), ErrorClass::Fatal);
    }

    #[test]
    fn test_error_class() {
        let err = GatewayError::Http {
            status: 503,
            message: "backend unavailable".to_string(),
        };
        assert_eq!(err.status(), Some(503));
        assert!(err.is_retryable());

        let err = GatewayError::Transport("connection reset".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.class(), ErrorClass::Fatal);

        let err = GatewayError::InvalidArgument("bad channel".to_string());
        assert_eq!(err.class(), ErrorClass::Fatal);
    }

    #[test]
    fn test_from_response_extracts_google_message() {
        let body = r#"{"error": {"code": 404, "message": "File not found: abc", "status": "NOT_FOUND"}}"#;
        let err = GatewayError::from_response(404, body);
        assert_eq!(err.to_string(), "HTTP 404: File not found: abc");

        let err = GatewayError::from_response(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::Config("read_rate must be > 0".to_string());
        assert_eq!(err.to_string(), "Configuration error: read_rate must be > 0");
    }
}
