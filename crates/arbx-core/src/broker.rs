//! Broker identity.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identity of one configured exchange / trading venue (e.g. "Okex").
///
/// The set of brokers is defined by configuration, so this is an open
/// string newtype rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Broker(String);

impl Broker {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Broker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Broker {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Broker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Broker {
    fn borrow(&self) -> &str {
        &self.0
    }
}
