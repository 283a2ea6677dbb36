//! Broker-agnostic order and its fills.
//!
//! `Order` is owned by the routing layer and mutated in place by exchange
//! adapters. Identity and intent are fixed at construction; only lifecycle
//! state (status, fills, timestamps) changes afterwards, through methods
//! that keep the state machine consistent:
//! - the exchange order id is assigned exactly once, by `mark_sent`
//! - terminal statuses are sticky
//! - `filled_size` never decreases and never exceeds `size`
//! - executions never sum above `size`

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::broker::Broker;
use crate::error::{CoreError, Result};
use crate::order::{BrokerOrderId, CashMarginType, OrderId, OrderSide, OrderStatus, OrderType};
use crate::{Price, Size};

/// One fill event belonging to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Owning order.
    pub order_id: OrderId,
    pub broker: Broker,
    pub symbol: String,
    pub side: OrderSide,
    pub size: Size,
    pub price: Price,
    pub exec_time: DateTime<Utc>,
}

impl Execution {
    /// Create an execution tied to `order`.
    #[must_use]
    pub fn for_order(order: &Order, size: Size, price: Price, exec_time: DateTime<Utc>) -> Self {
        Self {
            order_id: order.id.clone(),
            broker: order.broker.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            size,
            price,
            exec_time,
        }
    }
}

/// Order intent plus its observed lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    id: OrderId,
    broker: Broker,
    symbol: String,
    side: OrderSide,
    order_type: OrderType,
    cash_margin_type: CashMarginType,
    price: Price,
    size: Size,
    broker_order_id: Option<BrokerOrderId>,
    status: OrderStatus,
    filled_size: Size,
    executions: Vec<Execution>,
    sent_time: Option<DateTime<Utc>>,
    last_updated: Option<DateTime<Utc>>,
}

impl Order {
    /// Create a new pending order with a fresh engine id.
    ///
    /// `size` must be positive. Limit orders need a positive price; the
    /// price of other order types is carried as given.
    pub fn new(
        broker: Broker,
        symbol: impl Into<String>,
        side: OrderSide,
        order_type: OrderType,
        cash_margin_type: CashMarginType,
        price: Price,
        size: Size,
    ) -> Result<Self> {
        if !size.is_positive() {
            return Err(CoreError::InvalidSize(format!(
                "order size must be positive, got {size}"
            )));
        }
        if order_type == OrderType::Limit && !price.is_positive() {
            return Err(CoreError::InvalidPrice(format!(
                "limit price must be positive, got {price}"
            )));
        }

        Ok(Self {
            id: OrderId::new(),
            broker,
            symbol: symbol.into(),
            side,
            order_type,
            cash_margin_type,
            price,
            size,
            broker_order_id: None,
            status: OrderStatus::Pending,
            filled_size: Size::ZERO,
            executions: Vec::new(),
            sent_time: None,
            last_updated: None,
        })
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn cash_margin_type(&self) -> CashMarginType {
        self.cash_margin_type
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn broker_order_id(&self) -> Option<&BrokerOrderId> {
        self.broker_order_id.as_ref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn filled_size(&self) -> Size {
        self.filled_size
    }

    pub fn executions(&self) -> &[Execution] {
        &self.executions
    }

    pub fn sent_time(&self) -> Option<DateTime<Utc>> {
        self.sent_time
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Size not yet filled.
    pub fn remaining_size(&self) -> Size {
        self.size - self.filled_size
    }

    /// Volume-weighted average price over the reconciled executions.
    ///
    /// Returns None if there are no executions.
    pub fn average_fill_price(&self) -> Option<Price> {
        let total: Size = self.executions.iter().map(|e| e.size).sum();
        if total.is_zero() {
            return None;
        }
        let notional: Decimal = self.executions.iter().map(|e| e.size.notional(e.price)).sum();
        Some(Price::new(notional / total.inner()))
    }

    /// Record acceptance by the exchange.
    ///
    /// The only transition into `New`. Fails if the order was already sent.
    pub fn mark_sent(&mut self, broker_order_id: BrokerOrderId, now: DateTime<Utc>) -> Result<()> {
        if let Some(existing) = &self.broker_order_id {
            return Err(CoreError::BrokerOrderIdAssigned(existing.to_string()));
        }
        if self.status != OrderStatus::Pending {
            return Err(CoreError::InvalidOrderState(format!(
                "cannot send order {} in status {}",
                self.id, self.status
            )));
        }
        self.broker_order_id = Some(broker_order_id);
        self.status = OrderStatus::New;
        self.sent_time = Some(now);
        self.last_updated = Some(now);
        Ok(())
    }

    /// Apply a status derived from exchange data.
    ///
    /// Terminal statuses are sticky and `Pending` cannot be re-entered.
    /// Returns true if the status changed.
    pub fn apply_status(&mut self, next: OrderStatus) -> bool {
        if self.status.is_terminal() || next == OrderStatus::Pending || next == self.status {
            return false;
        }
        self.status = next;
        true
    }

    /// Record the exchange-reported cumulative filled amount.
    ///
    /// The stored value is clamped to `[current filled, size]`. Returns the
    /// value actually stored.
    pub fn record_filled(&mut self, reported: Size) -> Size {
        self.filled_size = reported.max(self.filled_size).min(self.size);
        self.filled_size
    }

    /// Replace the reconciled executions.
    ///
    /// Executions are kept in the given order until their cumulative size
    /// reaches the order size; the one crossing it is trimmed and the rest
    /// dropped. Returns the number of executions that were trimmed or dropped.
    pub fn replace_executions(&mut self, executions: Vec<Execution>) -> usize {
        let mut kept = Vec::with_capacity(executions.len());
        let mut remaining = self.size;
        let mut adjusted = 0;

        for mut execution in executions {
            if !remaining.is_positive() {
                adjusted += 1;
                continue;
            }
            if execution.size > remaining {
                execution.size = remaining;
                adjusted += 1;
            }
            remaining = remaining - execution.size;
            kept.push(execution);
        }

        self.executions = kept;
        adjusted
    }

    /// Stamp `last_updated`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(now);
    }
}
