//! Error types for airshipUI

use thiserror::Error;

/// Result type alias using airshipUI Error
pub type Result<T> = std::result::Result<T, Error>;

/// airshipUI error types
///
/// Failures reported by the backend travel as data in the envelope `error`
/// field and never become one of these.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Timed out waiting for {what} after {millis}ms")]
    Timeout { what: String, millis: u64 },

    #[error("Protocol version mismatch: expected {expected}, backend reported {}", found.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string()))]
    ProtocolMismatch { expected: u32, found: Option<u32> },

    #[error("Transport has been shut down")]
    TransportClosed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Token store error: {0}")]
    TokenStore(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Errors after which reconnecting cannot help.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Error::ProtocolMismatch { .. } | Error::TransportClosed)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Encoding(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Error::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_mismatch_message() {
        let err = Error::ProtocolMismatch {
            expected: 2,
            found: None,
        };
        assert_eq!(
            err.to_string(),
            "Protocol version mismatch: expected 2, backend reported none"
        );
        assert!(err.is_terminal());
        assert!(!Error::ConnectionClosed.is_terminal());
    }
}
