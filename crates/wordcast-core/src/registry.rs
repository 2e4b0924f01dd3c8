//! Client and observer registries
//!
//! Both registries are sets of handles keyed by [`ConnectionId`]. Every
//! operation takes the set's lock once, so Join/Leave/Size/Snapshot are
//! atomic with respect to each other. Only [`ClientRegistry`] notifies on
//! membership changes, and it does so after releasing the lock.

use crate::handle::{ClientHandle, Handle, HandleKind, ObserverHandle};
use crate::metrics as m;
use crate::notifier::ConnectionNotifier;
use crate::types::{ChangeKind, ConnectionChange, ConnectionId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Lock-protected set of handles of one kind
struct HandleSet<K: HandleKind> {
    handles: RwLock<HashMap<ConnectionId, Handle<K>>>,
}

impl<K: HandleKind> HandleSet<K> {
    fn new() -> Self {
        Self {
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the new size, or `None` if the handle was already present
    fn insert(&self, handle: Handle<K>) -> Option<usize> {
        let mut handles = self.handles.write();
        if handles.contains_key(&handle.id()) {
            return None;
        }
        handles.insert(handle.id(), handle);
        Some(handles.len())
    }

    /// Returns the removed handle and the new size
    fn remove(&self, id: ConnectionId) -> Option<(Handle<K>, usize)> {
        let mut handles = self.handles.write();
        let handle = handles.remove(&id)?;
        Some((handle, handles.len()))
    }

    fn len(&self) -> usize {
        self.handles.read().len()
    }

    fn contains(&self, id: ConnectionId) -> bool {
        self.handles.read().contains_key(&id)
    }

    fn snapshot(&self) -> Vec<Handle<K>> {
        self.handles.read().values().cloned().collect()
    }

    fn drain(&self) -> Vec<Handle<K>> {
        self.handles.write().drain().map(|(_, h)| h).collect()
    }
}

/// Leave side of a registry, used by [`Membership`]
pub trait Registry: Send + Sync {
    /// Remove a member; absent ids are a no-op returning false
    fn leave(&self, id: ConnectionId) -> bool;

    fn size(&self) -> usize;
}

/// Set of live stream clients, the word broadcast audience
pub struct ClientRegistry {
    handles: HandleSet<crate::handle::Stream>,
    notifier: Arc<ConnectionNotifier>,
}

impl ClientRegistry {
    pub fn new(notifier: Arc<ConnectionNotifier>) -> Self {
        Self {
            handles: HandleSet::new(),
            notifier,
        }
    }

    pub fn notifier(&self) -> &Arc<ConnectionNotifier> {
        &self.notifier
    }

    /// Add a client and fire the notifier once it is visible to `size()`.
    ///
    /// Returns false (and does not notify) if the handle is already present.
    pub fn join(&self, handle: ClientHandle) -> bool {
        let id = handle.id();
        let Some(active) = self.handles.insert(handle) else {
            return false;
        };

        ::metrics::gauge!(m::STREAM_CLIENTS).set(active as f64);
        tracing::info!(connection = %id, "Client connected. Total clients: {}", active);

        self.notifier.fire(&ConnectionChange {
            kind: ChangeKind::Joined,
            id,
            active_connections: active,
        });
        true
    }

    /// Remove a client and fire the notifier after removal.
    ///
    /// Removing an absent client is a no-op and does not notify.
    pub fn leave(&self, id: ConnectionId) -> bool {
        let Some((handle, active)) = self.handles.remove(id) else {
            return false;
        };
        handle.close();

        ::metrics::gauge!(m::STREAM_CLIENTS).set(active as f64);
        tracing::info!(connection = %id, "Client disconnected. Total clients: {}", active);

        self.notifier.fire(&ConnectionChange {
            kind: ChangeKind::Left,
            id,
            active_connections: active,
        });
        true
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.handles.contains(id)
    }

    /// Point-in-time copy of the membership, safe to iterate while others join
    pub fn snapshot(&self) -> Vec<ClientHandle> {
        self.handles.snapshot()
    }

    /// Close and drop every client without notifying. Used at shutdown.
    pub fn close_all(&self) -> usize {
        let drained = self.handles.drain();
        for handle in &drained {
            handle.close();
        }
        ::metrics::gauge!(m::STREAM_CLIENTS).set(0.0);
        drained.len()
    }
}

impl Registry for ClientRegistry {
    fn leave(&self, id: ConnectionId) -> bool {
        ClientRegistry::leave(self, id)
    }

    fn size(&self) -> usize {
        ClientRegistry::size(self)
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("size", &self.size())
            .finish()
    }
}

/// Set of live observers, the connection-count audience.
///
/// Joining and leaving never notify: observers are not counted.
pub struct PushRegistry {
    handles: HandleSet<crate::handle::Observer>,
}

impl PushRegistry {
    pub fn new() -> Self {
        Self {
            handles: HandleSet::new(),
        }
    }

    /// Returns false if the handle is already present
    pub fn join(&self, handle: ObserverHandle) -> bool {
        let id = handle.id();
        let Some(total) = self.handles.insert(handle) else {
            return false;
        };

        ::metrics::gauge!(m::OBSERVERS).set(total as f64);
        tracing::info!(connection = %id, "SSE client connected. Total SSE clients: {}", total);
        true
    }

    pub fn leave(&self, id: ConnectionId) -> bool {
        let Some((handle, total)) = self.handles.remove(id) else {
            return false;
        };
        handle.close();

        ::metrics::gauge!(m::OBSERVERS).set(total as f64);
        tracing::info!(connection = %id, "SSE client disconnected. Total SSE clients: {}", total);
        true
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.handles.contains(id)
    }

    pub fn snapshot(&self) -> Vec<ObserverHandle> {
        self.handles.snapshot()
    }

    /// Close and drop every observer. Used at shutdown.
    pub fn close_all(&self) -> usize {
        let drained = self.handles.drain();
        for handle in &drained {
            handle.close();
        }
        ::metrics::gauge!(m::OBSERVERS).set(0.0);
        drained.len()
    }
}

impl Default for PushRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry for PushRegistry {
    fn leave(&self, id: ConnectionId) -> bool {
        PushRegistry::leave(self, id)
    }

    fn size(&self) -> usize {
        PushRegistry::size(self)
    }
}

impl fmt::Debug for PushRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushRegistry")
            .field("size", &self.size())
            .finish()
    }
}

/// Guard tying a registry entry to its connection.
///
/// Dropping the guard leaves the registry, so removal happens on every exit
/// path of the connection task, including panics and aborted tasks.
#[must_use = "dropping the membership leaves the registry immediately"]
pub struct Membership {
    id: ConnectionId,
    registry: Arc<dyn Registry>,
}

impl Membership {
    pub fn new(registry: Arc<dyn Registry>, id: ConnectionId) -> Self {
        Self { id, registry }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.registry.leave(self.id);
    }
}

impl fmt::Debug for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Membership").field("id", &self.id).finish()
    }
}
