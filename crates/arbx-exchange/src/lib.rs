//! Exchange connectivity for arbx.
//!
//! Provides the `ExchangeClient` seam used by order lifecycle adapters:
//! - `ExchangeClient`: dyn-compatible async trait over one exchange account
//! - Wire DTOs (`OrderRequest`, `OrderResponse`, `TradeRecord`, ...)
//! - `OkexRestClient`: signed OKX v5 REST implementation
//! - `MockExchangeClient`: scriptable test double

pub mod client;
pub mod error;
pub mod mock;
pub mod okex;

pub use client::{
    BalanceEntry, Balances, BoxFuture, DynExchangeClient, ExchangeClient, OrderBookResponse,
    OrderRequest, OrderRequestResponse, OrderResponse, RemoteOrderStatus, TradeRecord,
    TradesQuery,
};
pub use error::{ExchangeError, ExchangeResult};
pub use mock::{MockCall, MockExchangeClient};
pub use okex::{OkexCredentials, OkexRestClient, OKEX_REST_URL};
