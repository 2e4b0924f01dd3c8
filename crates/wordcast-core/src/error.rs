//! Error types for wordcast

use crate::types::ConnectionId;

/// Result type alias using wordcast's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for broadcast operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The connection's liveness flag is down or its writer has gone away
    #[error("connection {0} closed")]
    ConnectionClosed(ConnectionId),

    /// The connection's outbound buffer is full (reader stalled)
    #[error("connection {0} lagging: outbound buffer full")]
    Lagging(ConnectionId),

    /// The word source could not produce a value
    #[error("word source unavailable: {0}")]
    SourceUnavailable(String),

    /// A connection-change subscriber failed
    #[error("notification callback failed: {0}")]
    Callback(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new source-unavailable error
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Create a new callback error
    pub fn callback(msg: impl Into<String>) -> Self {
        Self::Callback(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
