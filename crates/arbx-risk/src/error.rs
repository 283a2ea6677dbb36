//! Risk error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Broker not configured: {0}")]
    BrokerNotConfigured(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

pub type RiskResult<T> = Result<T, RiskError>;
