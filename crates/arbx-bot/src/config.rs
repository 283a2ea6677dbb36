//! Application configuration.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use arbx_adapter::{OkexAdapterConfig, MAX_QUOTES_PER_SIDE, OKEX_BROKER};
use arbx_core::Broker;
use arbx_exchange::OKEX_REST_URL;
use arbx_risk::StabilityTrackerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Largest scale `rust_decimal` can represent.
const MAX_FILL_PRECISION: u32 = 28;

/// Static configuration of one broker.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker identity, e.g. "Okex".
    pub broker: Broker,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub passphrase: String,
}

impl BrokerConfig {
    /// Broker without credentials (public endpoints only).
    pub fn public(broker: impl Into<Broker>) -> Self {
        Self {
            broker: broker.into(),
            key: String::new(),
            secret: String::new(),
            passphrase: String::new(),
        }
    }

    /// Check if an API key and secret are set.
    pub fn has_credentials(&self) -> bool {
        !self.key.is_empty() && !self.secret.is_empty()
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("BrokerConfig")
            .field("broker", &self.broker)
            .field("key", &redact(&self.key))
            .field("secret", &redact(&self.secret))
            .field("passphrase", &redact(&self.passphrase))
            .finish()
    }
}

/// OKEx connectivity and adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkexConfig {
    /// REST base URL. Default: production endpoint.
    #[serde(default = "default_okex_rest_url")]
    pub rest_url: String,

    #[serde(flatten)]
    pub adapter: OkexAdapterConfig,
}

fn default_okex_rest_url() -> String {
    OKEX_REST_URL.to_string()
}

impl Default for OkexConfig {
    fn default() -> Self {
        Self {
            rest_url: default_okex_rest_url(),
            adapter: OkexAdapterConfig::default(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configured brokers. Defines the universe the stability tracker knows.
    #[serde(default = "default_brokers")]
    pub brokers: Vec<BrokerConfig>,

    #[serde(default)]
    pub stability_tracker: StabilityTrackerConfig,

    #[serde(default)]
    pub okex: OkexConfig,

    /// Quote polling period (ms). Default: 3,000.
    #[serde(default = "default_quote_poll_interval_ms")]
    pub quote_poll_interval_ms: u64,
}

fn default_brokers() -> Vec<BrokerConfig> {
    vec![BrokerConfig::public(OKEX_BROKER)]
}

fn default_quote_poll_interval_ms() -> u64 {
    3_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            stability_tracker: StabilityTrackerConfig::default(),
            okex: OkexConfig::default(),
            quote_poll_interval_ms: default_quote_poll_interval_ms(),
        }
    }
}

impl AppConfig {
    /// Load from `ARBX_CONFIG` or `config/default.toml`, falling back to defaults.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("ARBX_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML content.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        if self.brokers.is_empty() {
            return Err(AppError::Config("at least one broker must be configured".to_string()));
        }

        let mut seen = HashSet::new();
        for broker in &self.brokers {
            if broker.broker.as_str().is_empty() {
                return Err(AppError::Config("broker name must not be empty".to_string()));
            }
            if !seen.insert(&broker.broker) {
                return Err(AppError::Config(format!(
                    "broker {} configured more than once",
                    broker.broker
                )));
            }
        }

        self.stability_tracker
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        if self.quote_poll_interval_ms == 0 {
            return Err(AppError::Config(
                "quote_poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.okex.adapter.fill_precision > MAX_FILL_PRECISION {
            return Err(AppError::Config(format!(
                "okex.fill_precision {} exceeds {MAX_FILL_PRECISION}",
                self.okex.adapter.fill_precision
            )));
        }
        if self.okex.adapter.quote_depth == 0 {
            return Err(AppError::Config("okex.quote_depth must be positive".to_string()));
        }
        if self.okex.adapter.quote_depth > MAX_QUOTES_PER_SIDE {
            return Err(AppError::Config(format!(
                "okex.quote_depth {} exceeds {MAX_QUOTES_PER_SIDE}",
                self.okex.adapter.quote_depth
            )));
        }

        Ok(())
    }

    /// Configured broker identities, in file order.
    pub fn broker_names(&self) -> Vec<Broker> {
        self.brokers.iter().map(|b| b.broker.clone()).collect()
    }
}
