//! Exchange client trait and wire types.
//!
//! The trait is the only way adapters talk to an exchange. It allows for:
//! - Dependency injection for testing (`MockExchangeClient`)
//! - One REST implementation per exchange behind the same adapter logic

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExchangeResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Order placement request in exchange vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Unified symbol, e.g. "BTC/USDT".
    pub symbol: String,
    /// Lower-case order type ("limit" / "market").
    pub order_type: String,
    /// Lower-case side ("buy" / "sell").
    pub side: String,
    /// Limit price; zero for market orders.
    pub price: Decimal,
    /// Base-asset amount.
    pub amount: Decimal,
}

/// Acknowledgement of an order placement or cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequestResponse {
    /// Exchange order id.
    pub id: String,
}

/// Order status as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteOrderStatus {
    /// Resting on the book, possibly partially filled.
    Open,
    /// Fully filled.
    Closed,
    Canceled,
    Expired,
    /// Anything else, kept verbatim.
    Other(String),
}

impl RemoteOrderStatus {
    /// Map an exchange status string (any case).
    pub fn from_exchange(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "live" | "open" | "new" | "partially_filled" => Self::Open,
            "filled" | "closed" => Self::Closed,
            "canceled" | "cancelled" | "mmp_canceled" => Self::Canceled,
            "expired" => Self::Expired,
            _ => Self::Other(status.to_string()),
        }
    }
}

/// Current state of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    /// Exchange order id.
    pub id: String,
    pub symbol: String,
    pub status: RemoteOrderStatus,
    /// Cumulative filled amount.
    pub filled: Decimal,
    /// Original amount, if reported.
    pub amount: Option<Decimal>,
    /// Limit price, if any.
    pub price: Option<Decimal>,
    /// Average fill price, if any fills.
    pub average: Option<Decimal>,
}

/// Trade history query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TradesQuery {
    pub symbol: String,
    /// Only trades at or after this time (Unix milliseconds).
    pub since: Option<i64>,
    pub limit: Option<u32>,
    /// Only trades of this exchange order id, if the exchange supports filtering.
    pub order_id: Option<String>,
}

/// One trade from the account's trade history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Exchange order id the trade belongs to.
    pub order_id: Option<String>,
    pub amount: Decimal,
    pub price: Decimal,
    /// Unix milliseconds.
    pub timestamp: i64,
}

/// Balance of one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub free: Decimal,
    pub used: Decimal,
    pub total: Decimal,
}

/// Balances keyed by asset code (e.g. "BTC").
pub type Balances = HashMap<String, BalanceEntry>;

/// Raw order book snapshot.
///
/// Levels are kept as raw JSON values (`[price, volume, ...]`) because
/// exchanges disagree on whether numbers are sent as strings; callers
/// coerce them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderBookResponse {
    pub asks: Vec<Vec<serde_json::Value>>,
    pub bids: Vec<Vec<serde_json::Value>>,
    /// Unix milliseconds, if reported.
    pub timestamp: Option<i64>,
}

/// Remote operations on one exchange account.
///
/// Every call may fail with a transient or permanent `ExchangeError`.
/// Implementations apply their own request timeout; callers add none.
pub trait ExchangeClient: Send + Sync {
    /// Place an order.
    fn create_order(&self, request: OrderRequest)
        -> BoxFuture<'_, ExchangeResult<OrderRequestResponse>>;

    /// Fetch current state of an order.
    fn fetch_order<'a>(
        &'a self,
        id: &'a str,
        symbol: &'a str,
    ) -> BoxFuture<'a, ExchangeResult<OrderResponse>>;

    /// Request cancellation of an order.
    fn cancel_order<'a>(
        &'a self,
        id: &'a str,
        symbol: &'a str,
    ) -> BoxFuture<'a, ExchangeResult<OrderRequestResponse>>;

    /// Fetch the account's trade history for a symbol.
    fn fetch_trades(&self, query: TradesQuery) -> BoxFuture<'_, ExchangeResult<Vec<TradeRecord>>>;

    /// Fetch account balances.
    fn fetch_balance(&self) -> BoxFuture<'_, ExchangeResult<Balances>>;

    /// Fetch an order book snapshot for a pair (e.g. "BTC/USDT").
    fn fetch_order_book<'a>(&'a self, pair: &'a str)
        -> BoxFuture<'a, ExchangeResult<OrderBookResponse>>;
}

/// Arc wrapper for ExchangeClient trait objects.
pub type DynExchangeClient = Arc<dyn ExchangeClient>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_status_mapping() {
        assert_eq!(RemoteOrderStatus::from_exchange("CANCELED"), RemoteOrderStatus::Canceled);
        assert_eq!(RemoteOrderStatus::from_exchange("canceled"), RemoteOrderStatus::Canceled);
        assert_eq!(
            RemoteOrderStatus::from_exchange("mmp_canceled"),
            RemoteOrderStatus::Canceled
        );
        assert_eq!(RemoteOrderStatus::from_exchange("EXPIRED"), RemoteOrderStatus::Expired);
        assert_eq!(RemoteOrderStatus::from_exchange("live"), RemoteOrderStatus::Open);
        assert_eq!(
            RemoteOrderStatus::from_exchange("partially_filled"),
            RemoteOrderStatus::Open
        );
        assert_eq!(RemoteOrderStatus::from_exchange("filled"), RemoteOrderStatus::Closed);
        assert_eq!(
            RemoteOrderStatus::from_exchange("weird"),
            RemoteOrderStatus::Other("weird".to_string())
        );
    }
}
