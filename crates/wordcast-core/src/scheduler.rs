//! Periodic word broadcast

use crate::fanout::fan_out;
use crate::handle::{HandleKind, Stream};
use crate::metrics as m;
use crate::registry::ClientRegistry;
use crate::types::BroadcastMessage;
use crate::words::WordSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No stream clients; the word source was not consulted
    Idle,
    /// The tick produced nothing (word source failure)
    Skipped { reason: String },
    /// A word went out to a snapshot of the registry
    Broadcast {
        word: String,
        attempted: usize,
        failed: usize,
    },
}

/// Wakes once per interval and fans one word out to every stream client
pub struct BroadcastScheduler {
    clients: Arc<ClientRegistry>,
    source: Arc<dyn WordSource>,
    interval: Duration,
}

impl BroadcastScheduler {
    pub fn new(clients: Arc<ClientRegistry>, source: Arc<dyn WordSource>, interval: Duration) -> Self {
        Self {
            clients,
            source,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one tick.
    ///
    /// Clients whose delivery fails are removed from the registry, which
    /// notifies like any other Leave.
    pub fn tick(&self) -> TickOutcome {
        if self.clients.size() == 0 {
            ::metrics::counter!(m::TICKS_TOTAL, "outcome" => "idle").increment(1);
            return TickOutcome::Idle;
        }

        let message = match self.source.next_word() {
            Ok(word) => BroadcastMessage::new(word),
            Err(e) => return self.skip(e.to_string()),
        };
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => return self.skip(e.to_string()),
        };

        tracing::info!("Broadcasting: {}", message.word);
        let snapshot = self.clients.snapshot();
        let report = fan_out(&snapshot, &frame);

        for id in &report.failed {
            if self.clients.leave(*id) {
                ::metrics::counter!(m::PRUNED_TOTAL, "channel" => Stream::LABEL).increment(1);
            }
        }

        ::metrics::counter!(m::TICKS_TOTAL, "outcome" => "broadcast").increment(1);
        TickOutcome::Broadcast {
            word: message.word,
            attempted: report.attempted,
            failed: report.failed.len(),
        }
    }

    /// Tick every interval until `shutdown` is cancelled.
    ///
    /// The first tick happens immediately. Late ticks are delayed rather than
    /// bunched, so clients never see more than one word per interval.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Broadcast scheduler started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        tracing::info!("Broadcast scheduler stopped");
    }

    fn skip(&self, reason: String) -> TickOutcome {
        tracing::warn!("Skipping tick: {}", reason);
        ::metrics::counter!(m::TICKS_TOTAL, "outcome" => "skipped").increment(1);
        TickOutcome::Skipped { reason }
    }
}
