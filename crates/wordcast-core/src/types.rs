//! Core types for wordcast

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of one live connection, unique for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One word pushed to every stream client on a tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub word: String,
}

impl BroadcastMessage {
    pub fn new(word: impl Into<String>) -> Self {
        Self { word: word.into() }
    }

    /// Serialize once for sharing across all recipients of a tick
    pub fn to_frame(&self) -> crate::Result<Arc<str>> {
        Ok(serde_json::to_string(self)?.into())
    }
}

/// Live number of stream clients, pushed to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountMessage {
    pub active_connections: usize,
}

impl CountMessage {
    pub fn new(active_connections: usize) -> Self {
        Self { active_connections }
    }

    /// JSON payload carried in the `data:` field of an event-stream event
    pub fn to_frame(&self) -> crate::Result<Arc<str>> {
        Ok(serde_json::to_string(self)?.into())
    }
}

/// Direction of a ClientRegistry membership change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Joined,
    Left,
}

/// Event handed to connection-change subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionChange {
    pub kind: ChangeKind,
    pub id: ConnectionId,
    /// Registry size right after the mutation
    pub active_connections: usize,
}
