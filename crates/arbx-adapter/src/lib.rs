//! Order lifecycle adapters for arbx.
//!
//! One adapter per exchange translates broker-agnostic `Order`s into
//! exchange requests, drives the order status state machine from
//! exchange-reported state and reconciles fills into `Execution`s:
//! - `OrderLifecycleAdapter`: the dyn-compatible contract the router uses
//! - `OkexAdapter`: OKEx implementation over an `ExchangeClient`

pub mod adapter;
pub mod error;
pub mod okex;

pub use adapter::{DynAdapter, OrderLifecycleAdapter};
pub use error::{AdapterError, AdapterResult};
pub use okex::{OkexAdapter, OkexAdapterConfig, MAX_QUOTES_PER_SIDE, OKEX_BROKER};
