//! Connection-count publishing to observers

use crate::fanout::{deliver_one, fan_out, FanOutReport};
use crate::handle::{HandleKind, Observer, ObserverHandle};
use crate::metrics as m;
use crate::registry::{ClientRegistry, PushRegistry};
use crate::types::CountMessage;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Pushes the current stream-client count to observers.
///
/// Publishes and baselines are serialised, and the count is read inside the
/// critical section, so the last frame an observer receives always carries
/// the latest count.
pub struct CountPublisher {
    clients: Arc<ClientRegistry>,
    observers: Arc<PushRegistry>,
    gate: Mutex<()>,
}

impl CountPublisher {
    pub fn new(clients: Arc<ClientRegistry>, observers: Arc<PushRegistry>) -> Self {
        Self {
            clients,
            observers,
            gate: Mutex::new(()),
        }
    }

    /// Count as of now
    pub fn current(&self) -> CountMessage {
        CountMessage::new(self.clients.size())
    }

    /// Push the current count to every observer, pruning failed ones.
    ///
    /// Never fails: a broken observer is removed, not reported upward.
    pub fn publish(&self) -> FanOutReport {
        let report = {
            let _gate = self.gate.lock();
            let message = self.current();
            let frame = match message.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!("Failed to serialize connection count: {}", e);
                    return FanOutReport::default();
                }
            };
            let observers = self.observers.snapshot();
            tracing::debug!(
                active_connections = message.active_connections,
                observers = observers.len(),
                "Publishing connection count"
            );
            fan_out(&observers, &frame)
        };

        for id in &report.failed {
            if self.observers.leave(*id) {
                ::metrics::counter!(m::PRUNED_TOTAL, "channel" => Observer::LABEL).increment(1);
            }
        }
        report
    }

    /// Send one baseline count to a new observer, then make it eligible for
    /// [`publish`](Self::publish).
    ///
    /// An observer whose baseline write fails is not joined.
    pub fn welcome(&self, handle: ObserverHandle) -> Result<CountMessage> {
        let _gate = self.gate.lock();
        let message = self.current();
        deliver_one(&handle, &message.to_frame()?)?;
        self.observers.join(handle);
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ClientHandle;
    use crate::notifier::ConnectionNotifier;
    use crate::Error;

    fn setup() -> (Arc<ClientRegistry>, Arc<PushRegistry>, CountPublisher) {
        let clients = Arc::new(ClientRegistry::new(Arc::new(ConnectionNotifier::new())));
        let observers = Arc::new(PushRegistry::new());
        let publisher = CountPublisher::new(clients.clone(), observers.clone());
        (clients, observers, publisher)
    }

    #[tokio::test]
    async fn test_welcome_sends_baseline_before_joining() {
        let (clients, observers, publisher) = setup();
        let mut outboxes = Vec::new();
        for _ in 0..3 {
            let (handle, outbox) = ClientHandle::channel(1);
            clients.join(handle);
            outboxes.push(outbox);
        }

        let (observer, mut outbox) = ObserverHandle::channel();
        let baseline = publisher.welcome(observer.clone()).unwrap();

        assert_eq!(baseline, CountMessage::new(3));
        assert!(observers.contains(observer.id()));
        assert_eq!(
            outbox.next().await.as_deref(),
            Some(r#"{"active_connections":3}"#)
        );
    }

    #[test]
    fn test_welcome_failure_does_not_join() {
        let (_clients, observers, publisher) = setup();
        let (observer, outbox) = ObserverHandle::channel();
        drop(outbox);

        let err = publisher.welcome(observer).unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed(_)));
        assert_eq!(observers.size(), 0);
    }

    #[tokio::test]
    async fn test_publish_reaches_all_and_prunes_failed() {
        let (clients, observers, publisher) = setup();
        let (live, mut live_outbox) = ObserverHandle::channel();
        let (dead, dead_outbox) = ObserverHandle::channel();
        publisher.welcome(live.clone()).unwrap();
        publisher.welcome(dead.clone()).unwrap();
        drop(dead_outbox);
        assert_eq!(live_outbox.next().await.as_deref(), Some(r#"{"active_connections":0}"#));

        let (client, _client_outbox) = ClientHandle::channel(1);
        clients.join(client);
        let report = publisher.publish();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.failed, vec![dead.id()]);
        assert!(!observers.contains(dead.id()));
        assert!(observers.contains(live.id()));
        assert_eq!(live_outbox.next().await.as_deref(), Some(r#"{"active_connections":1}"#));
    }

    #[test]
    fn test_publish_without_observers() {
        let (_clients, _observers, publisher) = setup();
        assert_eq!(publisher.publish(), FanOutReport::default());
    }
}
