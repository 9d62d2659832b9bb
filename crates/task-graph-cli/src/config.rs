//! CLI configuration management.
//!
//! Precedence, highest first: command-line flags, environment variables
//! (after `.env` is loaded), the config file, built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use task_graph_client::ChannelConfig;
use task_graph_layout::{StabilizerConfig, Viewport};
use task_graph_viz::{DriverConfig, FetchOrdering, SessionConfig};

/// Application-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the task server.
    pub base_url: String,

    /// Wait between a dropped update channel and the next attempt.
    pub reconnect_delay_ms: u64,

    /// Shadow ticks run before new nodes are shown.
    pub warmup_ticks: usize,

    /// Simulation timer interval.
    pub tick_interval_ms: u64,

    pub viewport_width: f32,
    pub viewport_height: f32,

    /// How overlapping fetches are resolved.
    pub fetch_ordering: FetchOrdering,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            reconnect_delay_ms: 5000,
            warmup_ticks: 10,
            tick_interval_ms: 16,
            viewport_width: 800.0,
            viewport_height: 400.0,
            fetch_ordering: FetchOrdering::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid {key}={raw}: {e}")),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from the config file and environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config from {}", path.display()))?;
                serde_json::from_str(&contents).with_context(|| "Failed to parse config file")?
            }
            _ => Self::default(),
        };

        // Environment takes precedence over the file
        if let Ok(base_url) = std::env::var("TG_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(delay) = env_parse("TG_RECONNECT_DELAY_MS")? {
            config.reconnect_delay_ms = delay;
        }
        if let Some(ticks) = env_parse("TG_WARMUP_TICKS")? {
            config.warmup_ticks = ticks;
        }

        Ok(config)
    }

    /// Save current configuration to the config file.
    pub fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::config_file_path() {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
            }
            let contents = serde_json::to_string_pretty(self)?;
            std::fs::write(&config_path, contents)
                .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
        }
        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "task-graph", "tg").map(|dirs| dirs.config_dir().join("config.json"))
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    pub fn stabilizer(&self) -> StabilizerConfig {
        StabilizerConfig {
            warmup_ticks: self.warmup_ticks,
        }
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            viewport: self.viewport(),
            ordering: self.fetch_ordering,
            stabilizer: self.stabilizer(),
            ..SessionConfig::default()
        }
    }

    pub fn driver(&self) -> DriverConfig {
        DriverConfig {
            tick_interval: Duration::from_millis(self.tick_interval_ms.max(1)),
            channel: ChannelConfig {
                reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            },
        }
    }
}
