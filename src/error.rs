//! Error types for the warden service

/// Errors that can occur in the warden service
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("Remote API error: code={code}, msg={message}")]
    RemoteApi { code: i64, message: String },

    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for warden operations
pub type Result<T> = std::result::Result<T, WardenError>;
