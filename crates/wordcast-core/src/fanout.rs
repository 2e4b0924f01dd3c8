//! Shared delivery and pruning for both audiences

use crate::handle::{Handle, HandleKind};
use crate::metrics as m;
use crate::types::ConnectionId;
use crate::Error;
use std::sync::Arc;

/// Result of delivering one frame to a set of handles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Handles a write was attempted on
    pub attempted: usize,
    /// Handles whose write failed; the caller prunes these
    pub failed: Vec<ConnectionId>,
}

impl FanOutReport {
    pub fn delivered(&self) -> usize {
        self.attempted - self.failed.len()
    }
}

/// Deliver `frame` to every handle, continuing past failures.
///
/// Failed handles are closed and reported so the caller can remove them from
/// their registry.
pub fn fan_out<'a, K, I>(handles: I, frame: &Arc<str>) -> FanOutReport
where
    K: HandleKind,
    I: IntoIterator<Item = &'a Handle<K>>,
{
    let mut report = FanOutReport::default();

    for handle in handles {
        report.attempted += 1;
        if let Err(e) = deliver_one(handle, frame) {
            tracing::debug!(
                channel = K::LABEL,
                connection = %handle.id(),
                "Delivery failed, pruning: {}",
                e
            );
            report.failed.push(handle.id());
        }
    }

    report
}

/// Deliver to a single handle, closing it on failure
pub fn deliver_one<K: HandleKind>(handle: &Handle<K>, frame: &Arc<str>) -> crate::Result<()> {
    let result = handle.deliver(Arc::clone(frame));
    let outcome = match &result {
        Ok(()) => "ok",
        Err(Error::Lagging(_)) => "lagging",
        Err(_) => "closed",
    };
    ::metrics::counter!(m::DELIVERIES_TOTAL, "channel" => K::LABEL, "outcome" => outcome)
        .increment(1);

    if result.is_err() {
        handle.close();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ClientHandle;

    #[tokio::test]
    async fn test_failure_does_not_abort_remaining_deliveries() {
        let (alive_a, mut outbox_a) = ClientHandle::channel(4);
        let (dead, outbox_dead) = ClientHandle::channel(4);
        let (alive_b, mut outbox_b) = ClientHandle::channel(4);
        drop(outbox_dead);

        let frame: Arc<str> = Arc::from(r#"{"word":"ember"}"#);
        let report = fan_out([&alive_a, &dead, &alive_b], &frame);

        assert_eq!(report.attempted, 3);
        assert_eq!(report.failed, vec![dead.id()]);
        assert_eq!(report.delivered(), 2);
        assert_eq!(outbox_a.next().await, Some(frame.clone()));
        assert_eq!(outbox_b.next().await, Some(frame));
    }

    #[test]
    fn test_lagging_handle_is_closed() {
        let (slow, _outbox) = ClientHandle::channel(1);
        let frame: Arc<str> = Arc::from("x");

        assert!(deliver_one(&slow, &frame).is_ok());
        assert!(deliver_one(&slow, &frame).is_err());
        assert!(slow.is_closed());
    }
}
