//! Core domain types for the arbx order routing engine.
//!
//! This crate provides the broker-agnostic vocabulary shared by every
//! exchange adapter and by the routing layer:
//! - `Broker`: Configured exchange identity
//! - `Price`, `Size`: Precision-safe numeric types, plus `e_round`
//! - `Order`, `Execution`: Order intent, lifecycle state and fills
//! - `Quote`: One price level of an order book snapshot

pub mod broker;
pub mod decimal;
pub mod error;
pub mod execution;
pub mod order;
pub mod quote;

pub use broker::Broker;
pub use decimal::{e_round, Price, Size, DEFAULT_ROUND_DP};
pub use error::{CoreError, Result};
pub use execution::{Execution, Order};
pub use order::{BrokerOrderId, CashMarginType, OrderId, OrderSide, OrderStatus, OrderType};
pub use quote::{Quote, QuoteSide};
