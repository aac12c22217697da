//! Exchange error taxonomy.

use thiserror::Error;

/// Errors surfaced by exchange clients.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("exchange rejected request ({code}): {message}")]
    Api { code: i64, message: String },

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("market data unavailable for {0}")]
    NoMarketData(String),
}

/// Coarse category used for operator alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientFunds,
    InvalidOrder,
    ExchangeError,
}

impl ExchangeError {
    /// Map a Binance error code to a typed error.
    pub fn from_binance(code: i64, message: String) -> Self {
        match code {
            -2019 | -2018 => ExchangeError::InsufficientFunds(message),
            -1013 | -1111 | -1102 | -4003 | -4014 | -4016 | -4024 | -5022 => {
                ExchangeError::InvalidOrder(message)
            }
            _ => ExchangeError::Api { code, message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            ExchangeError::InvalidOrder(_) => ErrorKind::InvalidOrder,
            _ => ErrorKind::ExchangeError,
        }
    }

    /// Operator-facing hint for the alert panel.
    pub fn suggestion(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InsufficientFunds => {
                "Check your account balance and margin. Consider reducing order quantity or closing existing positions."
            }
            ErrorKind::InvalidOrder => {
                "Order parameters may be invalid. Check price, quantity, and symbol settings."
            }
            ErrorKind::ExchangeError => {
                "Exchange API error occurred. This may be temporary - the system will retry in the next cycle."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binance_code_classification() {
        let err = ExchangeError::from_binance(-2019, "Margin is insufficient.".into());
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

        let err = ExchangeError::from_binance(-4014, "Price not increased by tick size.".into());
        assert_eq!(err.kind(), ErrorKind::InvalidOrder);

        let err = ExchangeError::from_binance(-1003, "Too many requests.".into());
        assert_eq!(err.kind(), ErrorKind::ExchangeError);
        assert!(err.to_string().contains("-1003"));
    }
}
