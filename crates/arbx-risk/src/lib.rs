//! Broker health gating for arbx.
//!
//! Provides `BrokerStabilityTracker`: a bounded, self-healing reliability
//! score per configured broker. The routing layer consults `is_stable`
//! before dispatching orders and reports call outcomes back through
//! `increment` / `decrement`. A recovery timer drifts every broker back
//! toward the maximum score, so no broker is excluded permanently.

pub mod error;
pub mod stability;

pub use error::{RiskError, RiskResult};
pub use stability::{
    BrokerStabilityTracker, StabilityTrackerConfig, MAX_STABILITY, MIN_STABILITY,
};
