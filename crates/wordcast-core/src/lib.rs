//! wordcast core
//!
//! The dual-channel broadcast engine behind the wordcast server.
//!
//! This crate provides:
//! - Stream-client and observer registries with atomic Join/Leave/Size/Snapshot
//! - A connection-change notifier bridging the two audiences
//! - The periodic word scheduler and the connection-count publisher
//! - Shared delivery and pruning of failed connections
//!
//! It knows nothing about HTTP: transports create a handle per connection,
//! drain its [`Outbox`] onto the wire and hold the [`Membership`] guard for
//! as long as the connection lives.

pub mod engine;
pub mod error;
pub mod fanout;
pub mod handle;
pub mod metrics;
pub mod notifier;
pub mod publisher;
pub mod registry;
pub mod scheduler;
pub mod types;
pub mod words;

pub use engine::{BroadcastConfig, BroadcastEngine};
pub use error::{Error, Result};
pub use fanout::{fan_out, FanOutReport};
pub use handle::{ClientHandle, Handle, HandleKind, ObserverHandle, Outbox};
pub use notifier::{ConnectionNotifier, SubscriptionId};
pub use publisher::CountPublisher;
pub use registry::{ClientRegistry, Membership, PushRegistry, Registry};
pub use scheduler::{BroadcastScheduler, TickOutcome};
pub use types::{BroadcastMessage, ChangeKind, ConnectionChange, ConnectionId, CountMessage};
pub use words::{RandomWords, WordSource};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::{BroadcastConfig, BroadcastEngine};
    pub use crate::error::{Error, Result};
    pub use crate::handle::{ClientHandle, ObserverHandle, Outbox};
    pub use crate::registry::Membership;
    pub use crate::types::{BroadcastMessage, CountMessage};
    pub use crate::words::{RandomWords, WordSource};
}
