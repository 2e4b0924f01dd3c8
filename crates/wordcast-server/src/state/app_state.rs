use crate::config::ServerConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use wordcast_core::{BroadcastEngine, RandomWords, WordSource};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Registries, notifier, publisher and scheduler
    pub engine: Arc<BroadcastEngine>,

    /// Prometheus renderer, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State backed by the built-in random word lists
    pub fn new(config: ServerConfig, metrics: Option<PrometheusHandle>) -> Self {
        let source = Arc::new(RandomWords::new(config.words.english_ratio));
        Self::with_source(config, source, metrics)
    }

    pub fn with_source(
        config: ServerConfig,
        source: Arc<dyn WordSource>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let engine = BroadcastEngine::new(config.broadcast.clone(), source);
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            metrics,
        }
    }
}
