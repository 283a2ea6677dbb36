//! arbx order routing application.
//!
//! Wires the components together:
//! - Configuration (brokers, credentials, stability gating)
//! - One order lifecycle adapter per configured broker
//! - `BrokerRouter`: stability-gated dispatch with outcome feedback
//! - Quote polling loop

pub mod app;
pub mod config;
pub mod error;
pub mod router;

pub use app::{top_of_book, Application, TopOfBook};
pub use config::{AppConfig, BrokerConfig, OkexConfig};
pub use error::{AppError, AppResult};
pub use router::BrokerRouter;
