//! Scriptable exchange client for tests.
//!
//! Each operation pops the next queued result; an empty queue yields an
//! `ExchangeError::Http` so unscripted calls fail loudly. All calls are
//! recorded for verification. Scripted trades honor `TradesQuery::since`
//! the way the exchange applies its `begin` bound.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::client::{
    Balances, BoxFuture, ExchangeClient, OrderBookResponse, OrderRequest, OrderRequestResponse,
    OrderResponse, TradeRecord, TradesQuery,
};
use crate::error::{ExchangeError, ExchangeResult};

/// A recorded call to the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    CreateOrder(OrderRequest),
    FetchOrder { id: String, symbol: String },
    CancelOrder { id: String, symbol: String },
    FetchTrades(TradesQuery),
    FetchBalance,
    FetchOrderBook { pair: String },
}

/// Mock exchange client for testing.
#[derive(Debug, Default)]
pub struct MockExchangeClient {
    calls: Mutex<Vec<MockCall>>,
    create_order: Mutex<VecDeque<ExchangeResult<OrderRequestResponse>>>,
    fetch_order: Mutex<VecDeque<ExchangeResult<OrderResponse>>>,
    cancel_order: Mutex<VecDeque<ExchangeResult<OrderRequestResponse>>>,
    fetch_trades: Mutex<VecDeque<ExchangeResult<Vec<TradeRecord>>>>,
    fetch_balance: Mutex<VecDeque<ExchangeResult<Balances>>>,
    fetch_order_book: Mutex<VecDeque<ExchangeResult<OrderBookResponse>>>,
}

fn unscripted<T>(op: &str) -> ExchangeResult<T> {
    Err(ExchangeError::Http(format!("mock: no scripted response for {op}")))
}

impl MockExchangeClient {
    /// Create a new mock client with empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_create_order(&self, result: ExchangeResult<OrderRequestResponse>) {
        self.create_order.lock().push_back(result);
    }

    pub fn push_fetch_order(&self, result: ExchangeResult<OrderResponse>) {
        self.fetch_order.lock().push_back(result);
    }

    pub fn push_cancel_order(&self, result: ExchangeResult<OrderRequestResponse>) {
        self.cancel_order.lock().push_back(result);
    }

    pub fn push_fetch_trades(&self, result: ExchangeResult<Vec<TradeRecord>>) {
        self.fetch_trades.lock().push_back(result);
    }

    pub fn push_fetch_balance(&self, result: ExchangeResult<Balances>) {
        self.fetch_balance.lock().push_back(result);
    }

    pub fn push_fetch_order_book(&self, result: ExchangeResult<OrderBookResponse>) {
        self.fetch_order_book.lock().push_back(result);
    }

    /// Get recorded calls.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Clear recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
    }
}

impl ExchangeClient for MockExchangeClient {
    fn create_order(
        &self,
        request: OrderRequest,
    ) -> BoxFuture<'_, ExchangeResult<OrderRequestResponse>> {
        Box::pin(async move {
            self.record(MockCall::CreateOrder(request));
            self.create_order
                .lock()
                .pop_front()
                .unwrap_or_else(|| unscripted("create_order"))
        })
    }

    fn fetch_order<'a>(
        &'a self,
        id: &'a str,
        symbol: &'a str,
    ) -> BoxFuture<'a, ExchangeResult<OrderResponse>> {
        Box::pin(async move {
            self.record(MockCall::FetchOrder {
                id: id.to_string(),
                symbol: symbol.to_string(),
            });
            self.fetch_order
                .lock()
                .pop_front()
                .unwrap_or_else(|| unscripted("fetch_order"))
        })
    }

    fn cancel_order<'a>(
        &'a self,
        id: &'a str,
        symbol: &'a str,
    ) -> BoxFuture<'a, ExchangeResult<OrderRequestResponse>> {
        Box::pin(async move {
            self.record(MockCall::CancelOrder {
                id: id.to_string(),
                symbol: symbol.to_string(),
            });
            self.cancel_order
                .lock()
                .pop_front()
                .unwrap_or_else(|| unscripted("cancel_order"))
        })
    }

    fn fetch_trades(&self, query: TradesQuery) -> BoxFuture<'_, ExchangeResult<Vec<TradeRecord>>> {
        Box::pin(async move {
            let since = query.since;
            self.record(MockCall::FetchTrades(query));
            let result = self
                .fetch_trades
                .lock()
                .pop_front()
                .unwrap_or_else(|| unscripted("fetch_trades"));
            result.map(|trades| match since {
                Some(since) => trades.into_iter().filter(|t| t.timestamp >= since).collect(),
                None => trades,
            })
        })
    }

    fn fetch_balance(&self) -> BoxFuture<'_, ExchangeResult<Balances>> {
        Box::pin(async move {
            self.record(MockCall::FetchBalance);
            self.fetch_balance
                .lock()
                .pop_front()
                .unwrap_or_else(|| unscripted("fetch_balance"))
        })
    }

    fn fetch_order_book<'a>(
        &'a self,
        pair: &'a str,
    ) -> BoxFuture<'a, ExchangeResult<OrderBookResponse>> {
        Box::pin(async move {
            self.record(MockCall::FetchOrderBook {
                pair: pair.to_string(),
            });
            self.fetch_order_book
                .lock()
                .pop_front()
                .unwrap_or_else(|| unscripted("fetch_order_book"))
        })
    }
}
