//! Jarvis Bridge Error Types
//!
//! Central error type shared by the bridge, the agent session and the servers.

use thiserror::Error;

/// Central error type for the bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_prefixes() {
        let err = BridgeError::Agent("session refused".to_string());
        assert_eq!(err.to_string(), "Agent error: session refused");

        let err = BridgeError::Protocol("bad frame".to_string());
        assert_eq!(err.to_string(), "Protocol error: bad frame");
    }

    #[test]
    fn test_json_error_converts() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{ nope");
        let err: BridgeError = parse.unwrap_err().into();
        assert!(matches!(err, BridgeError::Json(_)));
    }
}
