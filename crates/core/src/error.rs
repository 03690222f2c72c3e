//! Error types for the ML Studio client.
//!
//! Uses `thiserror` for ergonomic error definitions. Everything a caller can
//! observe from the session and data-synchronization layer is a
//! [`ClientError`]; raw transport failures never cross the gateway.

use std::fmt;
use thiserror::Error;

/// Generic message shown when no response reached the client.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Unable to reach the server. Please ensure the backend is running.";

/// The classified error returned by every client operation.
///
/// `Clone` so a single in-flight fetch can hand the same error to every
/// caller attached to it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// No response reached the gateway (connectivity failure or timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a failure status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The server answered 401. Callers should treat the session as invalid.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// Client-side pre-flight rejection; never reaches the network.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The request could not be built locally; nothing was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A success response whose body did not have the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// HTTP status associated with this error, if the server responded.
    ///
    /// `Auth` reports 401 so it also satisfies HTTP-status checks.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Auth { .. } => Some(401),
            _ => None,
        }
    }

    /// Whether this error should invalidate the session.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Whether no response reached the client.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// A single human-readable message suitable for display.
    ///
    /// Prefers the server-supplied detail text and falls back to a generic
    /// message per error kind.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Self::Http { message, .. } | Self::Auth { message } => message.clone(),
            Self::Validation(err) => err.user_message(),
            Self::InvalidRequest(detail) => format!("The request could not be sent: {detail}"),
            Self::Decode(_) => "The server returned an unexpected response.".to_string(),
        }
    }
}

/// Result type alias using our error.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Why an upload candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationReason {
    TooLarge,
    UnsupportedType,
}

impl ValidationReason {
    /// Stable machine-readable code (`too_large`, `unsupported_type`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooLarge => "too_large",
            Self::UnsupportedType => "unsupported_type",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client-side upload rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {detail}")]
pub struct ValidationError {
    pub reason: ValidationReason,
    pub detail: String,
}

impl ValidationError {
    pub fn too_large(size: u64, max: u64) -> Self {
        Self {
            reason: ValidationReason::TooLarge,
            detail: format!("{size} bytes exceeds the {max} byte limit"),
        }
    }

    pub fn unsupported_type(what: impl Into<String>) -> Self {
        Self {
            reason: ValidationReason::UnsupportedType,
            detail: what.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self.reason {
            ValidationReason::TooLarge => format!("File is too large ({})", self.detail),
            ValidationReason::UnsupportedType => format!(
                "Unsupported file type: {}. Supported: CSV, JSON, Excel, Parquet",
                self.detail
            ),
        }
    }
}

/// Errors from token persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupted token record: {0}")]
    Corrupted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_correctly() {
        let err = ClientError::Http {
            status: 404,
            message: "Dataset not found".into(),
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("Dataset not found"));
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_auth());
    }

    #[test]
    fn auth_error_reports_401() {
        let err = ClientError::Auth {
            message: "Could not validate credentials".into(),
        };
        assert_eq!(err.status(), Some(401));
        assert!(err.is_auth());
        assert_eq!(err.user_message(), "Could not validate credentials");
    }

    #[test]
    fn network_error_uses_generic_message() {
        let err = ClientError::Network("connection refused".into());
        assert!(err.is_network());
        assert_eq!(err.status(), None);
        assert_eq!(err.user_message(), NETWORK_ERROR_MESSAGE);
    }

    #[test]
    fn invalid_request_is_not_a_network_error() {
        let err = ClientError::InvalidRequest("Invalid mime type 'x'".into());
        assert!(!err.is_network());
        assert_eq!(err.status(), None);
        assert!(err.user_message().contains("Invalid mime type"));
    }

    #[test]
    fn validation_reason_codes() {
        assert_eq!(ValidationReason::TooLarge.as_str(), "too_large");
        assert_eq!(ValidationReason::UnsupportedType.as_str(), "unsupported_type");

        let err: ClientError = ValidationError::unsupported_type(".exe").into();
        assert!(err.to_string().contains("unsupported_type"));
        assert!(err.user_message().contains(".exe"));
    }
}
