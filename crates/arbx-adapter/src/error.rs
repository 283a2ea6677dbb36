//! Adapter error types.

use arbx_core::{Broker, CoreError, OrderId, OrderStatus};
use arbx_exchange::ExchangeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Order for broker {actual} sent to {expected} adapter")]
    BrokerMismatch { expected: Broker, actual: Broker },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Order {0} has not been sent")]
    OrderNotSent(OrderId),

    #[error("Order {0} has already been sent")]
    AlreadySent(OrderId),

    #[error("Order {order_id} is {status}")]
    OrderTerminal {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("Invalid order: {0}")]
    Order(#[from] CoreError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("{0} balance is not found")]
    AssetNotFound(String),

    #[error("Malformed exchange response: {0}")]
    MalformedResponse(String),
}

impl AdapterError {
    /// Caller bug: the request never reached the exchange and must not be retried.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::BrokerMismatch { .. }
                | Self::NotImplemented(_)
                | Self::OrderNotSent(_)
                | Self::AlreadySent(_)
                | Self::OrderTerminal { .. }
                | Self::Order(_)
        )
    }

    /// The exchange failed or answered with something unusable.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Exchange(_) | Self::MalformedResponse(_))
    }

    /// Check if the error is transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Exchange(e) => e.is_retryable(),
            _ => false,
        }
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;
