//! Broker Stability Tracker.
//!
//! Keeps one bounded integer score per configured broker and decides
//! whether the routing layer may keep sending it orders.
//!
//! Design:
//! - Every configured broker starts at `MAX_STABILITY`
//! - Failed calls decrement, successful calls increment, clamped to `[MIN, MAX]`
//! - A recovery timer increments every broker once per `recovery_interval_ms`
//! - `is_stable` = `score >= threshold`; unknown brokers are never stable
//!
//! Because scores never drop below `MIN_STABILITY` and the timer keeps
//! pushing them up, a failing broker always regains eligibility with time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arbx_core::Broker;
use arbx_telemetry::Metrics;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{RiskError, RiskResult};

/// Lowest possible stability score.
pub const MIN_STABILITY: u8 = 1;
/// Highest possible stability score; also the initial score.
pub const MAX_STABILITY: u8 = 10;

/// Configuration for the Broker Stability Tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilityTrackerConfig {
    /// Passive recovery period (ms). Default: 60,000.
    #[serde(default = "default_recovery_interval_ms")]
    pub recovery_interval_ms: u64,

    /// Minimum score for a broker to be routable. Default: 0 (always routable).
    #[serde(default)]
    pub threshold: u8,
}

fn default_recovery_interval_ms() -> u64 {
    60_000
}

impl Default for StabilityTrackerConfig {
    fn default() -> Self {
        Self {
            recovery_interval_ms: default_recovery_interval_ms(),
            threshold: 0,
        }
    }
}

impl StabilityTrackerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> RiskResult<()> {
        if self.recovery_interval_ms == 0 {
            return Err(RiskError::ConfigError(
                "stability_tracker.recovery_interval_ms must be positive".to_string(),
            ));
        }
        if self.threshold > MAX_STABILITY {
            return Err(RiskError::ConfigError(format!(
                "stability_tracker.threshold {} exceeds maximum score {MAX_STABILITY}",
                self.threshold
            )));
        }
        Ok(())
    }

    pub fn recovery_interval(&self) -> Duration {
        Duration::from_millis(self.recovery_interval_ms)
    }
}

/// Running recovery timer.
struct RecoveryTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Broker Stability Tracker.
///
/// Thread-safe: scores live behind a mutex so each `clamp(score ± 1)` is a
/// single critical section, whether it comes from the routing layer or the
/// recovery timer. Share it with `Arc`.
///
/// The recovery timer is stopped on `stop()` and when the tracker is dropped.
pub struct BrokerStabilityTracker {
    config: StabilityTrackerConfig,
    brokers: Arc<Vec<Broker>>,
    scores: Arc<Mutex<HashMap<Broker, u8>>>,
    recovery: Mutex<Option<RecoveryTask>>,
}

impl BrokerStabilityTracker {
    /// Create a tracker for the configured brokers, all at `MAX_STABILITY`.
    ///
    /// Duplicate broker names are collapsed.
    pub fn new(brokers: impl IntoIterator<Item = Broker>, config: StabilityTrackerConfig) -> Self {
        let mut unique: Vec<Broker> = Vec::new();
        for broker in brokers {
            if !unique.contains(&broker) {
                unique.push(broker);
            }
        }

        let scores: HashMap<Broker, u8> = unique
            .iter()
            .map(|b| {
                Metrics::broker_stability(b.as_str(), MAX_STABILITY);
                (b.clone(), MAX_STABILITY)
            })
            .collect();

        Self {
            config,
            brokers: Arc::new(unique),
            scores: Arc::new(Mutex::new(scores)),
            recovery: Mutex::new(None),
        }
    }

    /// Brokers known to this tracker, in configuration order.
    pub fn brokers(&self) -> &[Broker] {
        &self.brokers
    }

    pub fn config(&self) -> &StabilityTrackerConfig {
        &self.config
    }

    /// Arm the recovery timer.
    ///
    /// The first recovery tick fires one full interval after this call.
    /// Calling `start` while already armed is a no-op. Must be called from
    /// within a Tokio runtime. An invalid config is rejected before anything
    /// is spawned.
    pub fn start(&self) -> RiskResult<()> {
        self.config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RiskError::RuntimeUnavailable(e.to_string()))?;

        let mut recovery = self.recovery.lock();
        if recovery.is_some() {
            warn!("Stability recovery timer already running");
            return Ok(());
        }

        let period = self.config.recovery_interval();
        let token = CancellationToken::new();
        let task_token = token.clone();
        let scores = Arc::clone(&self.scores);
        let brokers = Arc::clone(&self.brokers);

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => Self::recover(&scores, &brokers),
                }
            }
        });

        info!(
            recovery_interval_ms = self.config.recovery_interval_ms,
            threshold = self.config.threshold,
            brokers = self.brokers.len(),
            "Stability recovery timer started"
        );

        *recovery = Some(RecoveryTask { token, handle });
        Ok(())
    }

    /// Disarm the recovery timer. Safe to call at any time, any number of times.
    pub fn stop(&self) {
        if let Some(task) = self.recovery.lock().take() {
            task.token.cancel();
            task.handle.abort();
            info!("Stability recovery timer stopped");
        }
    }

    /// Whether the recovery timer is armed.
    pub fn is_running(&self) -> bool {
        self.recovery.lock().is_some()
    }

    /// Lower a broker's score by one. Unknown brokers are ignored.
    pub fn decrement(&self, broker: &Broker) {
        let mut scores = self.scores.lock();
        match scores.get_mut(broker) {
            Some(score) => {
                *score = Self::clamp(i16::from(*score) - 1);
                debug!(%broker, score = *score, "Stability decremented");
                Metrics::broker_stability(broker.as_str(), *score);
            }
            None => {
                debug!(%broker, "Ignoring decrement for unconfigured broker");
            }
        }
    }

    /// Raise a broker's score by one.
    ///
    /// Fails with `BrokerNotConfigured` for unknown brokers; no entry is created.
    pub fn increment(&self, broker: &Broker) -> RiskResult<u8> {
        let mut scores = self.scores.lock();
        Self::increment_locked(&mut scores, broker)
            .ok_or_else(|| RiskError::BrokerNotConfigured(broker.to_string()))
    }

    /// Current score of a configured broker.
    pub fn stability(&self, broker: &Broker) -> RiskResult<u8> {
        self.scores
            .lock()
            .get(broker)
            .copied()
            .ok_or_else(|| RiskError::BrokerNotConfigured(broker.to_string()))
    }

    /// Whether the routing layer may send orders to `broker`.
    ///
    /// Always false for unconfigured brokers.
    pub fn is_stable(&self, broker: &Broker) -> bool {
        let Some(score) = self.scores.lock().get(broker).copied() else {
            return false;
        };
        let stable = score >= self.config.threshold;
        debug!(%broker, score, threshold = self.config.threshold, stable, "Stability check");
        stable
    }

    /// Snapshot of all scores, in configuration order.
    pub fn snapshot(&self) -> Vec<(Broker, u8)> {
        let scores = self.scores.lock();
        self.brokers
            .iter()
            .filter_map(|b| scores.get(b).map(|s| (b.clone(), *s)))
            .collect()
    }

    fn recover(scores: &Mutex<HashMap<Broker, u8>>, brokers: &[Broker]) {
        let mut scores = scores.lock();
        for broker in brokers {
            Self::increment_locked(&mut scores, broker);
        }
    }

    fn increment_locked(scores: &mut HashMap<Broker, u8>, broker: &Broker) -> Option<u8> {
        let score = scores.get_mut(broker)?;
        *score = Self::clamp(i16::from(*score) + 1);
        debug!(%broker, score = *score, "Stability incremented");
        Metrics::broker_stability(broker.as_str(), *score);
        Some(*score)
    }

    fn clamp(value: i16) -> u8 {
        value.clamp(i16::from(MIN_STABILITY), i16::from(MAX_STABILITY)) as u8
    }
}

impl Drop for BrokerStabilityTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
