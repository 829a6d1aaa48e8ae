//! REST protocol error types.

use thiserror::Error;

/// Result type for REST operations.
pub type RestResult<T> = Result<T, RestError>;

/// Errors raised below the driver API, while talking HTTP.
#[derive(Error, Debug)]
pub enum RestError {
    /// The transport could not complete the request
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status
    #[error("HTTP {code} {text}")]
    Status {
        /// Status code
        code: u16,
        /// Status text, including any server message
        text: String,
    },

    /// The request deadline elapsed
    #[error("Request timed out")]
    Timeout,

    /// The request was cancelled through the connection token
    #[error("Request cancelled")]
    Cancelled,

    /// The response body did not match the expected envelope
    #[error("Decode error: {0}")]
    Decode(String),
}

impl RestError {
    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether this error came from the response shape rather than the network.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = RestError::Status { code: 404, text: "Not Found".into() };
        assert_eq!(err.to_string(), "HTTP 404 Not Found");
    }

    #[test]
    fn test_json_error_is_decode() {
        let err: RestError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(err.is_decode());
        assert!(!RestError::Timeout.is_decode());
    }
}
