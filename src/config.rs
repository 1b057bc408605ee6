//! Configuration management
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

lazy_static! {
    static ref ENV_VAR_PATTERN: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub node: NodeConfig,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub rpc_urls: Vec<String>,
    pub chain_id: u64,
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,
}

/// Receipt polling policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub initial_poll_interval_ms: u64,
    pub max_poll_interval_ms: u64,
    pub backoff_multiplier: f64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Buffer percentage added to estimated gas limits (e.g., 20 = 20% buffer)
    pub limit_buffer_percent: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    pub private_key_env: Option<String>,
}

fn default_request_interval_ms() -> u64 {
    100
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_poll_interval_ms: 500,
            max_poll_interval_ms: 10_000,
            backoff_multiplier: 2.0,
            timeout_secs: 300,
        }
    }
}

/// Floor for receipt polling intervals
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

impl WaitConfig {
    /// First polling delay, never below [`MIN_POLL_INTERVAL`]
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_poll_interval_ms).max(MIN_POLL_INTERVAL)
    }

    /// Polling delay cap, never below the initial interval
    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms).max(self.initial_interval())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay to use after `current`, capped at the max interval
    ///
    /// Multipliers below 1.0 or not finite keep the delay constant.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let multiplier = if self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0 {
            self.backoff_multiplier
        } else {
            1.0
        };

        let max = self.max_interval();
        Duration::try_from_secs_f64(current.as_secs_f64() * multiplier)
            .unwrap_or(max)
            .clamp(MIN_POLL_INTERVAL, max)
    }
}

impl Settings {
    /// Load settings from the file named by `WEB3_CONTRACT_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("WEB3_CONTRACT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&config_str)
    }

    /// Parse settings from TOML text
    pub fn parse(input: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(input);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.node.rpc_urls.is_empty() {
            anyhow::bail!("No RPC URLs configured");
        }
        if self.node.rpc_urls.iter().any(|url| url.trim().is_empty()) {
            anyhow::bail!("RPC URL must not be empty");
        }
        if self.node.chain_id == 0 {
            anyhow::bail!("Chain ID must be non-zero");
        }

        let wait = &self.wait;
        if wait.initial_poll_interval_ms == 0 {
            anyhow::bail!("Initial poll interval must be non-zero");
        }
        if wait.max_poll_interval_ms < wait.initial_poll_interval_ms {
            anyhow::bail!("Max poll interval is below the initial poll interval");
        }
        if wait.backoff_multiplier.is_nan() || wait.backoff_multiplier < 1.0 {
            anyhow::bail!("Backoff multiplier must be at least 1.0");
        }
        if wait.timeout_secs == 0 {
            anyhow::bail!("Wait timeout must be non-zero");
        }

        if self.gas.limit_buffer_percent > 100 {
            tracing::warn!(
                "Gas limit buffer of {}% is unusually large",
                self.gas.limit_buffer_percent
            );
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
