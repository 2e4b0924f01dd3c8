//! Metric names recorded through the `metrics` facade
//!
//! Recording is a no-op until the binary installs a recorder.

/// Gauge: stream clients currently joined
pub const STREAM_CLIENTS: &str = "wordcast_stream_clients";

/// Gauge: observers currently joined
pub const OBSERVERS: &str = "wordcast_observers";

/// Counter: scheduler ticks by outcome (`idle`, `broadcast`, `skipped`)
pub const TICKS_TOTAL: &str = "wordcast_ticks_total";

/// Counter: frame deliveries by channel and outcome (`ok`, `closed`, `lagging`)
pub const DELIVERIES_TOTAL: &str = "wordcast_deliveries_total";

/// Counter: handles pruned after a failed delivery, by channel
pub const PRUNED_TOTAL: &str = "wordcast_pruned_total";

/// Counter: connection-change subscribers that failed or panicked
pub const CALLBACK_FAILURES_TOTAL: &str = "wordcast_callback_failures_total";

/// Register descriptions with the installed recorder
pub fn describe() {
    ::metrics::describe_gauge!(STREAM_CLIENTS, "Stream clients currently connected");
    ::metrics::describe_gauge!(OBSERVERS, "Observers currently connected");
    ::metrics::describe_counter!(TICKS_TOTAL, "Broadcast scheduler ticks by outcome");
    ::metrics::describe_counter!(
        DELIVERIES_TOTAL,
        "Frame deliveries by channel and outcome"
    );
    ::metrics::describe_counter!(PRUNED_TOTAL, "Handles pruned after a failed delivery");
    ::metrics::describe_counter!(
        CALLBACK_FAILURES_TOTAL,
        "Connection change subscribers that failed"
    );
}
