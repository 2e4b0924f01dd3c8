//! Server configuration

use crate::cli::Cli;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use wordcast_core::{BroadcastConfig, Error};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for both servers
    #[serde(default = "default_host")]
    pub host: String,

    /// WebSocket stream port
    #[serde(default = "default_stream_port")]
    pub stream_port: u16,

    /// SSE push port
    #[serde(default = "default_push_port")]
    pub push_port: u16,

    /// Path of the connection-count event stream
    #[serde(default = "default_push_path")]
    pub push_path: String,

    /// Interval of keep-alive comments on the push stream; a failed write
    /// is how a vanished observer is noticed
    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_ms: u64,

    /// Allow any origin on the push server
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// Scheduler and buffer tuning
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Word source settings
    #[serde(default)]
    pub words: WordsConfig,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(host) = &cli.host {
            config.host = host.clone();
        }
        if let Some(port) = cli.stream_port {
            config.stream_port = port;
        }
        if let Some(port) = cli.push_port {
            config.push_port = port;
        }
        if let Some(interval_ms) = cli.interval_ms {
            config.broadcast.interval_ms = interval_ms;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> wordcast_core::Result<()> {
        self.broadcast.validate()?;

        if self.stream_port != 0 && self.stream_port == self.push_port {
            return Err(Error::config(format!(
                "stream and push ports must differ (both {})",
                self.stream_port
            )));
        }
        if !self.push_path.starts_with('/') || self.push_path.len() < 2 {
            return Err(Error::config(format!(
                "push path must be an absolute path other than '/', got {:?}",
                self.push_path
            )));
        }
        if matches!(self.push_path.as_str(), "/health" | "/metrics") {
            return Err(Error::config(format!(
                "push path {} collides with a built-in route",
                self.push_path
            )));
        }
        if self.keep_alive_ms == 0 {
            return Err(Error::config("keep_alive_ms must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.words.english_ratio) {
            return Err(Error::config(format!(
                "english_ratio must be within [0, 1], got {}",
                self.words.english_ratio
            )));
        }
        Ok(())
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    pub fn stream_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.stream_port).parse()?)
    }

    pub fn push_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.push_port).parse()?)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            stream_port: default_stream_port(),
            push_port: default_push_port(),
            push_path: default_push_path(),
            keep_alive_ms: default_keep_alive_ms(),
            cors_allow_any_origin: false,
            broadcast: BroadcastConfig::default(),
            words: WordsConfig::default(),
        }
    }
}

/// Word source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordsConfig {
    /// Probability that a tick picks an English word rather than a Telugu one
    #[serde(default = "default_english_ratio")]
    pub english_ratio: f64,
}

impl Default for WordsConfig {
    fn default() -> Self {
        Self {
            english_ratio: default_english_ratio(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_stream_port() -> u16 {
    8765
}

fn default_push_port() -> u16 {
    8080
}

fn default_push_path() -> String {
    "/connections".to_string()
}

fn default_keep_alive_ms() -> u64 {
    15_000
}

fn default_english_ratio() -> f64 {
    0.5
}
