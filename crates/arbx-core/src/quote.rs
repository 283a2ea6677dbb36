//! Order book quotes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::broker::Broker;
use crate::{Price, Size};

/// Side of a quote in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteSide {
    Ask,
    Bid,
}

impl fmt::Display for QuoteSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ask => write!(f, "ask"),
            Self::Bid => write!(f, "bid"),
        }
    }
}

/// One price level at one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub broker: Broker,
    pub side: QuoteSide,
    pub price: Price,
    pub volume: Size,
}

impl Quote {
    #[must_use]
    pub fn new(broker: Broker, side: QuoteSide, price: Price, volume: Size) -> Self {
        Self {
            broker,
            side,
            price,
            volume,
        }
    }
}
