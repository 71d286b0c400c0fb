//! Environment-driven configuration.
//!
//! Reads `DEDUP_*` variables:
//!
//! | Variable                        | Default       |
//! |---------------------------------|---------------|
//! | `DEDUP_WINDOW_SECONDS`          | `60`          |
//! | `DEDUP_MAX_SIZE`                | `10000`       |
//! | `DEDUP_SWEEP_INTERVAL_SECONDS`  | window, ≤ 60  |
//! | `DEDUP_EVICTION`                | `oldest`      |
//! | `DEDUP_STRATEGY`                | `fingerprint` |
//! | `DEDUP_MAX_EVENTS_PER_WINDOW`   | `100`         |
//! | `DEDUP_FIELDS`                  | empty         |
//!
//! `DEDUP_FIELDS` is comma-separated, e.g. `source,kind,name`.

use crate::application::deduper::{Deduper, DeduperError, DEFAULT_MAX_SIZE, DEFAULT_WINDOW};
use crate::application::strategy::{
    get_strategy, Strategy, StrategyConfig, StrategyError, DEFAULT_MAX_EVENTS_PER_WINDOW,
};
use crate::infrastructure::eviction::EvictionStrategy;
use serde::Deserialize;
use std::time::Duration;

const ENV_PREFIX: &str = "DEDUP_";

/// Error returned when configuration cannot be loaded or applied.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is missing or malformed
    #[error("invalid dedup environment: {0}")]
    Env(#[from] envy::Error),
    /// The deduper settings are invalid
    #[error(transparent)]
    Deduper(#[from] DeduperError),
    /// The strategy settings are invalid
    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// Dedup settings loaded from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct DedupSettings {
    /// Default dedup window in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Capacity bound
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Sweep period in seconds
    #[serde(default)]
    pub sweep_interval_seconds: Option<u64>,
    /// Capacity policy
    #[serde(default)]
    pub eviction: EvictionStrategy,
    /// Strategy name
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Noisy-stream threshold for the event-stream strategy
    #[serde(default = "default_max_events_per_window")]
    pub max_events_per_window: usize,
    /// Key fields for the key strategy
    #[serde(default)]
    pub fields: Vec<String>,
}

fn default_window_seconds() -> u64 {
    DEFAULT_WINDOW.as_secs()
}

fn default_max_size() -> usize {
    DEFAULT_MAX_SIZE
}

fn default_strategy() -> String {
    "fingerprint".to_string()
}

fn default_max_events_per_window() -> usize {
    DEFAULT_MAX_EVENTS_PER_WINDOW
}

impl DedupSettings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError::Env` if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::prefixed(ENV_PREFIX).from_env::<Self>()?)
    }

    /// Load settings from an explicit set of variables.
    ///
    /// Variables without the `DEDUP_` prefix are ignored.
    ///
    /// # Errors
    /// Returns `ConfigError::Env` if a variable cannot be parsed.
    #[allow(clippy::should_implement_trait)]
    pub fn from_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(ENV_PREFIX).from_iter::<_, Self>(vars)?)
    }

    /// Strategy selection described by these settings.
    pub fn strategy_config(&self) -> StrategyConfig {
        StrategyConfig {
            strategy: self.strategy.clone(),
            max_events_per_window: self.max_events_per_window,
            fields: self
                .fields
                .iter()
                .map(|f| f.trim())
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Build a deduper from these settings.
    ///
    /// # Errors
    /// Returns `ConfigError::Deduper` if the settings are invalid or no tokio
    /// runtime is available.
    pub fn build_deduper(&self) -> Result<Deduper, ConfigError> {
        let mut builder = Deduper::builder()
            .with_window(Duration::from_secs(self.window_seconds))
            .with_max_size(self.max_size)
            .with_eviction_strategy(self.eviction.clone());

        if let Some(secs) = self.sweep_interval_seconds {
            builder = builder.with_sweep_interval(Duration::from_secs(secs));
        }

        Ok(builder.build()?)
    }

    /// Build the configured strategy.
    ///
    /// # Errors
    /// Returns `ConfigError::Strategy` if the strategy settings are invalid.
    pub fn build_strategy(&self) -> Result<Strategy, ConfigError> {
        Ok(get_strategy(&self.strategy_config())?)
    }
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            max_size: default_max_size(),
            sweep_interval_seconds: None,
            eviction: EvictionStrategy::default(),
            strategy: default_strategy(),
            max_events_per_window: default_max_events_per_window(),
            fields: Vec::new(),
        }
    }
}
