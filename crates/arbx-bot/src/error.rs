//! Application error types.

use arbx_core::Broker;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No adapter registered for broker {0}")]
    UnknownBroker(Broker),

    #[error("Broker {broker} is below the stability threshold (score {score})")]
    BrokerUnstable { broker: Broker, score: u8 },

    #[error("Adapter error: {0}")]
    Adapter(#[from] arbx_adapter::AdapterError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] arbx_exchange::ExchangeError),

    #[error("Risk error: {0}")]
    Risk(#[from] arbx_risk::RiskError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] arbx_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
