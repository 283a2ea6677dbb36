//! Stability-gated order routing.
//!
//! The router owns one adapter per broker and the shared stability tracker.
//! New orders only go to brokers the tracker considers stable; refresh and
//! cancel of orders already on an exchange always go through. Every adapter
//! outcome is fed back to the tracker:
//! - success: increment
//! - remote failure: decrement
//! - validation failure: nothing (the request never left the process)

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arbx_adapter::{AdapterResult, DynAdapter};
use arbx_core::{Broker, Order, Quote, QuoteSide, Size};
use arbx_risk::BrokerStabilityTracker;
use arbx_telemetry::Metrics;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// Dispatches orders to per-broker adapters.
pub struct BrokerRouter {
    adapters: HashMap<Broker, DynAdapter>,
    tracker: Arc<BrokerStabilityTracker>,
}

impl BrokerRouter {
    pub fn new(tracker: Arc<BrokerStabilityTracker>) -> Self {
        Self {
            adapters: HashMap::new(),
            tracker,
        }
    }

    /// Register the adapter for its broker.
    ///
    /// The broker must be configured in the tracker and not registered yet.
    pub fn register(&mut self, adapter: DynAdapter) -> AppResult<()> {
        let broker = adapter.broker().clone();
        if self.tracker.stability(&broker).is_err() {
            return Err(AppError::Config(format!(
                "broker {broker} is not configured in the stability tracker"
            )));
        }
        if self.adapters.contains_key(&broker) {
            return Err(AppError::Config(format!(
                "adapter for broker {broker} registered twice"
            )));
        }
        self.adapters.insert(broker, adapter);
        Ok(())
    }

    pub fn tracker(&self) -> &Arc<BrokerStabilityTracker> {
        &self.tracker
    }

    /// Registered brokers, sorted by name.
    pub fn brokers(&self) -> Vec<Broker> {
        let mut brokers: Vec<Broker> = self.adapters.keys().cloned().collect();
        brokers.sort();
        brokers
    }

    fn adapter(&self, broker: &Broker) -> AppResult<&DynAdapter> {
        self.adapters
            .get(broker)
            .ok_or_else(|| AppError::UnknownBroker(broker.clone()))
    }

    /// Send a new order if its broker is stable.
    pub async fn send(&self, order: &mut Order) -> AppResult<()> {
        let broker = order.broker().clone();
        let adapter = self.adapter(&broker)?;

        if !self.tracker.is_stable(&broker) {
            Metrics::routing_blocked(broker.as_str());
            let score = self.tracker.stability(&broker)?;
            warn!(%broker, score, order_id = %order.id(), "Broker unstable, order not sent");
            return Err(AppError::BrokerUnstable { broker, score });
        }

        let result = adapter.send(order).await;
        self.feedback(&broker, "send", &result);
        result.map_err(Into::into)
    }

    /// Refresh an order from its exchange.
    pub async fn refresh(&self, order: &mut Order) -> AppResult<()> {
        let broker = order.broker().clone();
        let result = self.adapter(&broker)?.refresh(order).await;
        self.feedback(&broker, "refresh", &result);
        result.map_err(Into::into)
    }

    /// Cancel an order on its exchange.
    pub async fn cancel(&self, order: &mut Order) -> AppResult<()> {
        let broker = order.broker().clone();
        let result = self.adapter(&broker)?.cancel(order).await;
        self.feedback(&broker, "cancel", &result);
        result.map_err(Into::into)
    }

    /// Quotes from every stable broker.
    ///
    /// A broker whose fetch fails contributes nothing to this round.
    pub async fn fetch_all_quotes(&self) -> Vec<Quote> {
        let mut quotes = Vec::new();
        for broker in self.brokers() {
            if !self.tracker.is_stable(&broker) {
                debug!(%broker, "Skipping quotes from unstable broker");
                continue;
            }
            let Some(adapter) = self.adapters.get(&broker) else {
                continue;
            };

            let result = adapter.fetch_quotes().await;
            self.feedback(&broker, "fetch_quotes", &result);
            match result {
                Ok(snapshot) => {
                    let asks = snapshot.iter().filter(|q| q.side == QuoteSide::Ask).count();
                    Metrics::quotes_fetched(broker.as_str(), "ask", asks);
                    Metrics::quotes_fetched(broker.as_str(), "bid", snapshot.len() - asks);
                    quotes.extend(snapshot);
                }
                Err(e) => warn!(%broker, error = %e, "Failed to fetch quotes"),
            }
        }
        quotes
    }

    /// Position per broker. Brokers whose lookup fails are left out.
    pub async fn positions(&self) -> BTreeMap<Broker, Size> {
        let mut positions = BTreeMap::new();
        for broker in self.brokers() {
            let Some(adapter) = self.adapters.get(&broker) else {
                continue;
            };

            let result = adapter.get_position().await;
            self.feedback(&broker, "get_position", &result);
            match result {
                Ok(size) => {
                    positions.insert(broker, size);
                }
                Err(e) => warn!(%broker, error = %e, "Failed to fetch position"),
            }
        }
        positions
    }

    fn feedback<T>(&self, broker: &Broker, op: &str, result: &AdapterResult<T>) {
        match result {
            Ok(_) => {
                Metrics::adapter_call(broker.as_str(), op, "ok");
                if let Err(e) = self.tracker.increment(broker) {
                    warn!(%broker, error = %e, "Stability increment failed");
                }
            }
            Err(e) if e.is_remote() => {
                Metrics::adapter_call(broker.as_str(), op, "remote_error");
                self.tracker.decrement(broker);
                warn!(%broker, op, error = %e, "Adapter call failed");
            }
            Err(e) => {
                Metrics::adapter_call(broker.as_str(), op, "rejected");
                debug!(%broker, op, error = %e, "Adapter call rejected");
            }
        }
    }
}
