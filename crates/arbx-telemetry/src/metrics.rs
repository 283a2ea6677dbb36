//! Prometheus metrics for arbx.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a build defect and surfaces on first use.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_gauge_vec, CounterVec, GaugeVec};

/// Current stability score per broker (1-10).
pub static BROKER_STABILITY: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "arbx_broker_stability",
        "Broker stability score (1=least stable, 10=most stable)",
        &["broker"]
    )
    .unwrap()
});

/// Adapter calls by operation and outcome.
/// Labels: op (send/refresh/cancel/fetch_quotes/get_position), outcome (ok/remote_error/rejected)
pub static ADAPTER_CALLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "arbx_adapter_calls_total",
        "Total order lifecycle adapter calls",
        &["broker", "op", "outcome"]
    )
    .unwrap()
});

/// Orders not dispatched because the broker was below the stability threshold.
pub static ROUTING_BLOCKED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "arbx_routing_blocked_total",
        "Total orders blocked by broker stability gating",
        &["broker"]
    )
    .unwrap()
});

/// Number of quotes in the latest snapshot per broker and side.
pub static QUOTES_FETCHED: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "arbx_quotes_fetched",
        "Quotes in the latest order book snapshot",
        &["broker", "side"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a broker stability score.
    pub fn broker_stability(broker: &str, score: u8) {
        BROKER_STABILITY
            .with_label_values(&[broker])
            .set(f64::from(score));
    }

    /// Record one adapter call outcome.
    pub fn adapter_call(broker: &str, op: &str, outcome: &str) {
        ADAPTER_CALLS_TOTAL
            .with_label_values(&[broker, op, outcome])
            .inc();
    }

    /// Record an order blocked by stability gating.
    pub fn routing_blocked(broker: &str) {
        ROUTING_BLOCKED_TOTAL.with_label_values(&[broker]).inc();
    }

    /// Record snapshot depth.
    pub fn quotes_fetched(broker: &str, side: &str, count: usize) {
        QUOTES_FETCHED
            .with_label_values(&[broker, side])
            .set(count as f64);
    }
}
