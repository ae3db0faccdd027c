//! Configuration management for Turnstile.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::error::{Result, TurnstileError};
use crate::ratelimit::{
    Clock, LimiterHandle, LimiterSettings, StrategyKind, SystemClock, DEFAULT_MAX_REQUESTS,
    DEFAULT_STRATEGY, DEFAULT_WINDOW_MS,
};

/// Prefix of environment variables overriding file settings,
/// e.g. `TURNSTILE__LIMITER__MAX_REQUESTS=50`.
const ENV_PREFIX: &str = "TURNSTILE";

/// Main configuration for Turnstile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Limiter configuration
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Expired-state eviction configuration
    #[serde(default)]
    pub eviction: EvictionConfig,
}

/// Limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Strategy name, matched case-insensitively
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Requests admitted per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in milliseconds
    #[serde(default = "default_window_size_ms")]
    pub window_size_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            max_requests: default_max_requests(),
            window_size_ms: default_window_size_ms(),
        }
    }
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY.to_string()
}

fn default_max_requests() -> u32 {
    DEFAULT_MAX_REQUESTS
}

fn default_window_size_ms() -> u64 {
    DEFAULT_WINDOW_MS
}

/// Expired-state eviction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictionConfig {
    /// Whether to run the background sweeper
    #[serde(default = "default_eviction_enabled")]
    pub enabled: bool,

    /// Sweep interval in milliseconds
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            enabled: default_eviction_enabled(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

fn default_eviction_enabled() -> bool {
    true
}

fn default_sweep_interval_ms() -> u64 {
    60_000
}

impl EvictionConfig {
    /// The sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl LimiterConfig {
    /// The configured strategy.
    pub fn kind(&self) -> Result<StrategyKind> {
        self.strategy.parse()
    }

    /// The configured limiter parameters.
    pub fn settings(&self) -> LimiterSettings {
        LimiterSettings::new(self.max_requests, self.window_size_ms)
    }

    /// Build a limiter on the system clock.
    pub fn build(&self) -> Result<LimiterHandle> {
        self.build_with_clock(Arc::new(SystemClock))
    }

    /// Build a limiter reading time from `clock`.
    pub fn build_with_clock(&self, clock: Arc<dyn Clock>) -> Result<LimiterHandle> {
        crate::ratelimit::create_with_clock(
            &self.strategy,
            self.max_requests,
            self.window_size_ms,
            clock,
        )
    }
}

impl TurnstileConfig {
    /// Load configuration from an optional file, overlaid with
    /// `TURNSTILE__*` environment variables.
    ///
    /// The file format is inferred from its extension (YAML, TOML, JSON).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let config: TurnstileConfig = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file path, without environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: TurnstileConfig = serde_yaml::from_str(yaml)
            .map_err(|e| TurnstileError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values no limiter can be built from.
    pub fn validate(&self) -> Result<()> {
        self.limiter.kind()?;

        if self.limiter.max_requests == 0 {
            return Err(TurnstileError::Config(
                "limiter.max_requests must be at least 1".to_string(),
            ));
        }

        if self.eviction.enabled && self.eviction.sweep_interval_ms == 0 {
            return Err(TurnstileError::Config(
                "eviction.sweep_interval_ms must be positive when eviction is enabled".to_string(),
            ));
        }

        Ok(())
    }
}
