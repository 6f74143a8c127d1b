//! Result and error types for Fingir.

use thiserror::Error;

/// Result type for Fingir operations
pub type FingirResult<T> = Result<T, FingirError>;

/// Errors that can occur when driving a fake request
#[derive(Debug, Error)]
pub enum FingirError {
    /// Operation called in the wrong readyState (or while a send is in flight)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Request header rejected by the forbidden-header rules
    #[error("Refused to set unsafe request header {name:?}")]
    UnsafeHeader {
        /// The rejected header name
        name: String,
    },

    /// Response headers or body delivered twice in the same cycle
    #[error("Protocol violation: {message}")]
    Protocol {
        /// Error message
        message: String,
    },

    /// Response body payload is not string-like
    #[error("Invalid response body: {message}")]
    InvalidBody {
        /// Error message
        message: String,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FingirError {
    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = FingirError::invalid_state("send() before open()");
        assert_eq!(err.to_string(), "Invalid state: send() before open()");

        let err = FingirError::UnsafeHeader {
            name: "Cookie".to_string(),
        };
        assert!(err.to_string().contains("Cookie"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: FingirError = json_err.into();
        assert!(matches!(err, FingirError::Json(_)));
    }
}
