//! Application wiring and main loop.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use arbx_adapter::{DynAdapter, OkexAdapter, OKEX_BROKER};
use arbx_core::{Broker, Price, Quote, QuoteSide};
use arbx_exchange::{OkexCredentials, OkexRestClient};
use arbx_risk::BrokerStabilityTracker;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::config::{AppConfig, BrokerConfig};
use crate::error::{AppError, AppResult};
use crate::router::BrokerRouter;

/// Best ask and best bid of one broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TopOfBook {
    pub best_ask: Option<Price>,
    pub best_bid: Option<Price>,
}

/// Lowest ask and highest bid per broker.
pub fn top_of_book(quotes: &[Quote]) -> BTreeMap<Broker, TopOfBook> {
    let mut books: BTreeMap<Broker, TopOfBook> = BTreeMap::new();
    for quote in quotes {
        let book = books.entry(quote.broker.clone()).or_default();
        match quote.side {
            QuoteSide::Ask => {
                book.best_ask = Some(book.best_ask.map_or(quote.price, |p| p.min(quote.price)));
            }
            QuoteSide::Bid => {
                book.best_bid = Some(book.best_bid.map_or(quote.price, |p| p.max(quote.price)));
            }
        }
    }
    books
}

/// Build the adapter for one configured broker.
fn build_adapter(broker: &BrokerConfig, config: &AppConfig) -> AppResult<DynAdapter> {
    match broker.broker.as_str() {
        OKEX_BROKER => {
            let credentials = broker.has_credentials().then(|| OkexCredentials {
                api_key: broker.key.clone(),
                secret: broker.secret.clone(),
                passphrase: broker.passphrase.clone(),
            });
            if credentials.is_none() {
                warn!(broker = %broker.broker, "No credentials, only public endpoints available");
            }
            let client = OkexRestClient::new(config.okex.rest_url.clone(), credentials)?;
            Ok(Arc::new(OkexAdapter::new(
                Arc::new(client),
                config.okex.adapter.clone(),
            )))
        }
        other => Err(AppError::Config(format!(
            "no adapter available for broker {other}"
        ))),
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    tracker: Arc<BrokerStabilityTracker>,
    router: BrokerRouter,
}

impl Application {
    /// Create a new application with one adapter per configured broker.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let tracker = Arc::new(BrokerStabilityTracker::new(
            config.broker_names(),
            config.stability_tracker.clone(),
        ));

        let mut router = BrokerRouter::new(tracker.clone());
        for broker in &config.brokers {
            router.register(build_adapter(broker, &config)?)?;
        }

        info!(
            brokers = ?router.brokers(),
            recovery_interval_ms = config.stability_tracker.recovery_interval_ms,
            threshold = config.stability_tracker.threshold,
            "Application initialized"
        );

        Ok(Self {
            config,
            tracker,
            router,
        })
    }

    pub fn router(&self) -> &BrokerRouter {
        &self.router
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        self.tracker.start()?;

        let positions = self.router.positions().await;
        for (broker, size) in &positions {
            info!(%broker, position = %size, "Initial position");
        }

        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.config.quote_poll_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_quotes().await;
                }
                signal = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break signal.map_err(AppError::from);
                }
            }
        };

        self.tracker.stop();
        info!(stability = ?self.tracker.snapshot(), "Shutting down");
        result
    }

    async fn poll_quotes(&self) {
        let quotes = self.router.fetch_all_quotes().await;
        for (broker, book) in top_of_book(&quotes) {
            info!(
                %broker,
                best_ask = ?book.best_ask.map(|p| p.to_string()),
                best_bid = ?book.best_bid.map(|p| p.to_string()),
                "Top of book"
            );
        }
    }
}
