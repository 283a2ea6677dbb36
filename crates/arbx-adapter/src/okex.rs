//! OKEx order lifecycle adapter.

use arbx_core::{
    e_round, Broker, BrokerOrderId, CashMarginType, Execution, Order, OrderStatus, OrderType,
    Price, Quote, QuoteSide, Size, DEFAULT_ROUND_DP,
};
use arbx_exchange::{
    BoxFuture, DynExchangeClient, OrderRequest, OrderResponse, RemoteOrderStatus, TradeRecord,
    TradesQuery,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapter::{coerce_decimal, ensure_broker, OrderLifecycleAdapter};
use crate::error::{AdapterError, AdapterResult};

/// Broker identity served by [`OkexAdapter`].
pub const OKEX_BROKER: &str = "Okex";

/// Upper bound on quotes kept per side of a snapshot.
pub const MAX_QUOTES_PER_SIDE: usize = 100;

/// OKEx adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkexAdapterConfig {
    /// Pair whose order book `fetch_quotes` reads.
    #[serde(default = "default_pair")]
    pub pair: String,
    /// Asset reported by `get_position`.
    #[serde(default = "default_position_asset")]
    pub position_asset: String,
    /// Decimal places kept for exchange-reported sizes.
    #[serde(default = "default_fill_precision")]
    pub fill_precision: u32,
    /// Max trades requested when reconciling executions.
    #[serde(default = "default_trade_history_limit")]
    pub trade_history_limit: u32,
    /// Levels kept per side of a quote snapshot, at most [`MAX_QUOTES_PER_SIDE`].
    #[serde(default = "default_quote_depth")]
    pub quote_depth: usize,
}

fn default_pair() -> String {
    "BTC/USDT".to_string()
}

fn default_position_asset() -> String {
    "BTC".to_string()
}

fn default_fill_precision() -> u32 {
    DEFAULT_ROUND_DP
}

fn default_trade_history_limit() -> u32 {
    100
}

fn default_quote_depth() -> usize {
    MAX_QUOTES_PER_SIDE
}

impl Default for OkexAdapterConfig {
    fn default() -> Self {
        Self {
            pair: default_pair(),
            position_asset: default_position_asset(),
            fill_precision: default_fill_precision(),
            trade_history_limit: default_trade_history_limit(),
            quote_depth: default_quote_depth(),
        }
    }
}

/// Order lifecycle adapter for OKEx.
pub struct OkexAdapter {
    broker: Broker,
    client: DynExchangeClient,
    config: OkexAdapterConfig,
}

impl OkexAdapter {
    pub fn new(client: DynExchangeClient, config: OkexAdapterConfig) -> Self {
        Self {
            broker: Broker::new(OKEX_BROKER),
            client,
            config,
        }
    }

    pub fn config(&self) -> &OkexAdapterConfig {
        &self.config
    }

    fn round(&self, value: Decimal) -> Decimal {
        e_round(value, self.config.fill_precision)
    }

    fn order_request(&self, order: &Order) -> AdapterResult<OrderRequest> {
        if order.cash_margin_type() != CashMarginType::Cash {
            return Err(AdapterError::NotImplemented(format!(
                "cash margin type {}",
                order.cash_margin_type()
            )));
        }

        let price = match order.order_type() {
            OrderType::Limit => order.price().inner(),
            OrderType::Market => Decimal::ZERO,
            other => {
                return Err(AdapterError::NotImplemented(format!("order type {other}")));
            }
        };

        Ok(OrderRequest {
            symbol: order.symbol().to_string(),
            order_type: order.order_type().to_string().to_lowercase(),
            side: order.side().to_string(),
            price,
            amount: order.size().inner(),
        })
    }

    /// Status implied by the exchange reply, in precedence order.
    fn derive_status(reply: &OrderResponse, filled: Size, size: Size) -> Option<OrderStatus> {
        match reply.status {
            RemoteOrderStatus::Canceled => Some(OrderStatus::Canceled),
            RemoteOrderStatus::Expired => Some(OrderStatus::Expired),
            _ if filled == size => Some(OrderStatus::Filled),
            _ if filled.is_positive() => Some(OrderStatus::PartiallyFilled),
            _ => None,
        }
    }

    fn to_executions(
        &self,
        order: &Order,
        broker_order_id: &BrokerOrderId,
        trades: Vec<TradeRecord>,
    ) -> AdapterResult<Vec<Execution>> {
        trades
            .into_iter()
            .filter(|t| t.order_id.as_deref() == Some(broker_order_id.as_str()))
            .map(|t| {
                let exec_time = DateTime::<Utc>::from_timestamp_millis(t.timestamp)
                    .ok_or_else(|| {
                        AdapterError::MalformedResponse(format!("invalid trade time {}", t.timestamp))
                    })?;
                Ok(Execution::for_order(
                    order,
                    Size::new(self.round(t.amount)),
                    Price::new(t.price),
                    exec_time,
                ))
            })
            .collect()
    }

    fn to_quotes(
        &self,
        levels: &[Vec<serde_json::Value>],
        side: QuoteSide,
    ) -> AdapterResult<Vec<Quote>> {
        levels
            .iter()
            .take(self.config.quote_depth.min(MAX_QUOTES_PER_SIDE))
            .map(|level| {
                let (price, volume) = match level.as_slice() {
                    [price, volume, ..] => (coerce_decimal(price)?, coerce_decimal(volume)?),
                    _ => {
                        return Err(AdapterError::MalformedResponse(format!(
                            "order book level needs price and volume, got {} fields",
                            level.len()
                        )))
                    }
                };
                Ok(Quote::new(
                    self.broker.clone(),
                    side,
                    Price::new(price),
                    Size::new(volume),
                ))
            })
            .collect()
    }
}

impl OrderLifecycleAdapter for OkexAdapter {
    fn broker(&self) -> &Broker {
        &self.broker
    }

    fn send<'a>(&'a self, order: &'a mut Order) -> BoxFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            ensure_broker(&self.broker, order)?;
            if order.broker_order_id().is_some() || order.status() != OrderStatus::Pending {
                return Err(AdapterError::AlreadySent(order.id().clone()));
            }
            let request = self.order_request(order)?;

            let reply = self.client.create_order(request).await?;
            order.mark_sent(BrokerOrderId::new(reply.id), Utc::now())?;

            info!(
                order_id = %order.id(),
                broker_order_id = ?order.broker_order_id(),
                symbol = %order.symbol(),
                side = %order.side(),
                order_type = %order.order_type(),
                price = %order.price(),
                size = %order.size(),
                "Order sent"
            );
            Ok(())
        })
    }

    fn refresh<'a>(&'a self, order: &'a mut Order) -> BoxFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            ensure_broker(&self.broker, order)?;
            let broker_order_id = order
                .broker_order_id()
                .cloned()
                .ok_or_else(|| AdapterError::OrderNotSent(order.id().clone()))?;

            let reply = self
                .client
                .fetch_order(broker_order_id.as_str(), order.symbol())
                .await?;
            let trades = self
                .client
                .fetch_trades(TradesQuery {
                    symbol: order.symbol().to_string(),
                    // sent_time is stamped after the create call returns, so
                    // a lower bound would drop fills made during that call.
                    since: None,
                    limit: Some(self.config.trade_history_limit),
                    order_id: Some(broker_order_id.to_string()),
                })
                .await?;
            let executions = self.to_executions(order, &broker_order_id, trades)?;

            let reported = Size::new(self.round(reply.filled));
            let filled = order.record_filled(reported);
            if filled != reported {
                warn!(
                    order_id = %order.id(),
                    %reported,
                    stored = %filled,
                    size = %order.size(),
                    "Exchange-reported filled size out of range, clamped"
                );
            }

            if let Some(next) = Self::derive_status(&reply, filled, order.size()) {
                let previous = order.status();
                if order.apply_status(next) {
                    debug!(order_id = %order.id(), from = %previous, to = %next, "Order status changed");
                }
            }

            let adjusted = order.replace_executions(executions);
            if adjusted > 0 {
                warn!(
                    order_id = %order.id(),
                    adjusted,
                    size = %order.size(),
                    "Executions exceed order size, trimmed"
                );
            }

            order.touch(Utc::now());
            debug!(
                order_id = %order.id(),
                status = %order.status(),
                filled = %order.filled_size(),
                executions = order.executions().len(),
                "Order refreshed"
            );
            Ok(())
        })
    }

    fn cancel<'a>(&'a self, order: &'a mut Order) -> BoxFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            ensure_broker(&self.broker, order)?;
            let broker_order_id = order
                .broker_order_id()
                .cloned()
                .ok_or_else(|| AdapterError::OrderNotSent(order.id().clone()))?;
            if order.status().is_terminal() {
                return Err(AdapterError::OrderTerminal {
                    order_id: order.id().clone(),
                    status: order.status(),
                });
            }

            self.client
                .cancel_order(broker_order_id.as_str(), order.symbol())
                .await?;
            order.apply_status(OrderStatus::Canceled);
            order.touch(Utc::now());

            info!(order_id = %order.id(), %broker_order_id, "Order cancelled");
            Ok(())
        })
    }

    fn fetch_quotes(&self) -> BoxFuture<'_, AdapterResult<Vec<Quote>>> {
        Box::pin(async move {
            let book = self.client.fetch_order_book(&self.config.pair).await?;
            let mut quotes = self.to_quotes(&book.asks, QuoteSide::Ask)?;
            let asks = quotes.len();
            quotes.extend(self.to_quotes(&book.bids, QuoteSide::Bid)?);

            debug!(
                broker = %self.broker,
                pair = %self.config.pair,
                asks,
                bids = quotes.len() - asks,
                "Quotes fetched"
            );
            Ok(quotes)
        })
    }

    fn get_position(&self) -> BoxFuture<'_, AdapterResult<Size>> {
        Box::pin(async move {
            let balances = self.client.fetch_balance().await?;
            balances
                .get(&self.config.position_asset)
                .map(|b| Size::new(b.free))
                .ok_or_else(|| AdapterError::AssetNotFound(self.config.position_asset.clone()))
        })
    }
}
