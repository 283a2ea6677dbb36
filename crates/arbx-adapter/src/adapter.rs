//! Order lifecycle adapter trait.
//!
//! Adapters mutate the caller's `Order` in place. The `&mut Order` borrow
//! makes each adapter call the single writer of that order for its
//! duration; serializing calls across time is the caller's job.

use std::str::FromStr;
use std::sync::Arc;

use arbx_core::{Broker, Order, Quote, Size};
use arbx_exchange::BoxFuture;
use rust_decimal::Decimal;

use crate::error::{AdapterError, AdapterResult};

/// Uniform order lifecycle contract, one implementation per exchange.
///
/// No method retries. Exchange failures are returned as
/// `AdapterError::Exchange` and leave the order as it was before the call.
pub trait OrderLifecycleAdapter: Send + Sync {
    /// Broker this adapter serves.
    fn broker(&self) -> &Broker;

    /// Submit a pending order. On success the order is `New` with its
    /// exchange order id assigned.
    fn send<'a>(&'a self, order: &'a mut Order) -> BoxFuture<'a, AdapterResult<()>>;

    /// Pull exchange state: filled size, status and executions.
    fn refresh<'a>(&'a self, order: &'a mut Order) -> BoxFuture<'a, AdapterResult<()>>;

    /// Cancel a live order. On success the order is `Canceled`.
    fn cancel<'a>(&'a self, order: &'a mut Order) -> BoxFuture<'a, AdapterResult<()>>;

    /// Snapshot of the top of the book: asks first, then bids.
    fn fetch_quotes(&self) -> BoxFuture<'_, AdapterResult<Vec<Quote>>>;

    /// Free balance of the traded asset.
    fn get_position(&self) -> BoxFuture<'_, AdapterResult<Size>>;
}

/// Arc wrapper for adapter trait objects.
pub type DynAdapter = Arc<dyn OrderLifecycleAdapter>;

/// Reject orders routed to the wrong adapter.
pub(crate) fn ensure_broker(adapter: &Broker, order: &Order) -> AdapterResult<()> {
    if order.broker() != adapter {
        return Err(AdapterError::BrokerMismatch {
            expected: adapter.clone(),
            actual: order.broker().clone(),
        });
    }
    Ok(())
}

/// Numeric value from an order book level, sent either as a JSON string or number.
pub(crate) fn coerce_decimal(value: &serde_json::Value) -> AdapterResult<Decimal> {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            return Err(AdapterError::MalformedResponse(format!(
                "expected numeric value, got {other}"
            )))
        }
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| AdapterError::MalformedResponse(format!("invalid number '{text}': {e}")))
}
