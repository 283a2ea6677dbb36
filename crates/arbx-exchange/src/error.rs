//! Exchange error types.

use thiserror::Error;

/// OKX error codes worth retrying (service unavailable, timeout, rate limit, busy).
const RETRYABLE_API_CODES: &[&str] = &["50001", "50004", "50011", "50013"];

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Exchange rejected request: code={code} msg={msg}")]
    Api { code: String, msg: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExchangeError {
    /// Check if the error is transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { code, .. } => RETRYABLE_API_CODES.contains(&code.as_str()),
            Self::Parse(_) | Self::Auth(_) | Self::Json(_) => false,
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ExchangeError::Http("timeout".to_string()).is_retryable());
        assert!(ExchangeError::Api {
            code: "50011".to_string(),
            msg: "Too Many Requests".to_string()
        }
        .is_retryable());
        assert!(!ExchangeError::Api {
            code: "51008".to_string(),
            msg: "Insufficient balance".to_string()
        }
        .is_retryable());
        assert!(!ExchangeError::Auth("bad key".to_string()).is_retryable());
    }
}
