//! Broadcast engine: owns and wires the registries, notifier, publisher and
//! scheduler for one process.

use crate::handle::{ClientHandle, ObserverHandle, Outbox};
use crate::notifier::ConnectionNotifier;
use crate::publisher::CountPublisher;
use crate::registry::{ClientRegistry, Membership, PushRegistry};
use crate::scheduler::BroadcastScheduler;
use crate::words::WordSource;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Time between word broadcasts
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Frames a stream client may fall behind before it is dropped
    #[serde(default = "default_client_buffer")]
    pub client_buffer: usize,
}

impl BroadcastConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(Error::config("broadcast interval must be greater than zero"));
        }
        if self.client_buffer == 0 {
            return Err(Error::config("client buffer must hold at least one frame"));
        }
        Ok(())
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            client_buffer: default_client_buffer(),
        }
    }
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_client_buffer() -> usize {
    32
}

/// Composition root for the dual-channel broadcaster
pub struct BroadcastEngine {
    config: BroadcastConfig,
    clients: Arc<ClientRegistry>,
    observers: Arc<PushRegistry>,
    publisher: Arc<CountPublisher>,
    scheduler: BroadcastScheduler,
    shutdown: CancellationToken,
}

impl BroadcastEngine {
    pub fn new(config: BroadcastConfig, source: Arc<dyn WordSource>) -> Self {
        let notifier = Arc::new(ConnectionNotifier::new());
        let clients = Arc::new(ClientRegistry::new(notifier.clone()));
        let observers = Arc::new(PushRegistry::new());
        let publisher = Arc::new(CountPublisher::new(clients.clone(), observers.clone()));
        let scheduler = BroadcastScheduler::new(clients.clone(), source, config.interval());

        // Weak: the notifier is owned (through the registry) by the publisher.
        let weak = Arc::downgrade(&publisher);
        notifier.subscribe(move |_change| {
            if let Some(publisher) = weak.upgrade() {
                publisher.publish();
            }
            Ok(())
        });

        Self {
            config,
            clients,
            observers,
            publisher,
            scheduler,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    pub fn observers(&self) -> &Arc<PushRegistry> {
        &self.observers
    }

    pub fn publisher(&self) -> &Arc<CountPublisher> {
        &self.publisher
    }

    pub fn scheduler(&self) -> &BroadcastScheduler {
        &self.scheduler
    }

    /// New stream-client handle sized from the config
    pub fn client_channel(&self) -> (ClientHandle, Outbox) {
        ClientHandle::channel(self.config.client_buffer)
    }

    /// New observer handle
    pub fn observer_channel(&self) -> (ObserverHandle, Outbox) {
        ObserverHandle::channel()
    }

    /// Join a stream client; dropping the returned guard leaves.
    ///
    /// After shutdown the handle is closed instead of joined.
    pub fn connect_client(&self, handle: ClientHandle) -> Membership {
        let id = handle.id();
        if !self.shutdown.is_cancelled() {
            self.clients.join(handle.clone());
        }
        // A shutdown that drained the registry before our join has already
        // cancelled the token.
        if self.shutdown.is_cancelled() {
            self.clients.leave(id);
            handle.close();
        }
        Membership::new(self.clients.clone(), id)
    }

    /// Send the baseline count to an observer and join it; dropping the
    /// returned guard leaves.
    pub fn connect_observer(&self, handle: ObserverHandle) -> Result<Membership> {
        let id = handle.id();
        if self.shutdown.is_cancelled() {
            handle.close();
            return Err(Error::ConnectionClosed(id));
        }
        self.publisher.welcome(handle.clone())?;
        if self.shutdown.is_cancelled() {
            self.observers.leave(id);
            handle.close();
            return Err(Error::ConnectionClosed(id));
        }
        Ok(Membership::new(self.observers.clone(), id))
    }

    /// Drive the scheduler until [`shutdown`](Self::shutdown)
    pub async fn run_scheduler(&self) {
        self.scheduler.run(self.shutdown.clone()).await;
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop the scheduler and close every connection.
    ///
    /// Closed handles refuse writes, so nothing is delivered after this.
    pub fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        let clients = self.clients.close_all();
        let observers = self.observers.close_all();
        tracing::info!(clients, observers, "Broadcast engine shut down");
    }

    pub fn active_connections(&self) -> usize {
        self.clients.size()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.size()
    }
}
