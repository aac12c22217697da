//! Venue-agnostic trading interface.
//!
//! Strategy instances talk to their venue only through [`ExchangeClient`], so
//! the engine runs identically against Binance, the paper-trading simulator,
//! or a test double.

use super::error::ExchangeError;
use super::types::{AccountData, MarketData, Order, OrderRequest, PlaceOutcome};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt;

/// Venue identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Venue {
    Binance,
    Hyperliquid,
    Paper,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Binance => write!(f, "Binance"),
            Venue::Hyperliquid => write!(f, "Hyperliquid"),
            Venue::Paper => write!(f, "Paper"),
        }
    }
}

impl Venue {
    /// Short code for display (2-3 chars).
    pub fn short_code(&self) -> &'static str {
        match self {
            Venue::Binance => "BN",
            Venue::Hyperliquid => "HL",
            Venue::Paper => "PPR",
        }
    }
}

/// Single-symbol trading client for one strategy instance.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Returns the venue identifier.
    fn venue(&self) -> Venue;

    /// Symbol this client trades (venue-native format).
    fn symbol(&self) -> String;

    /// Best bid/ask and mid price.
    async fn fetch_market_data(&self) -> Result<MarketData, ExchangeError>;

    /// Current funding rate for the symbol.
    async fn fetch_funding_rate(&self) -> Result<Decimal, ExchangeError>;

    /// Position, balance and liquidation price.
    async fn fetch_account_data(&self) -> Result<AccountData, ExchangeError>;

    /// All open orders on the symbol, including ones placed by other strategies.
    async fn fetch_open_orders(&self) -> Result<Vec<Order>, ExchangeError>;

    /// Place limit orders. Individual rejections do not fail the batch.
    async fn place_orders(&self, orders: &[OrderRequest]) -> Result<PlaceOutcome, ExchangeError>;

    /// Cancel orders by id.
    async fn cancel_orders(&self, order_ids: &[String]) -> Result<(), ExchangeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_display() {
        assert_eq!(Venue::Binance.to_string(), "Binance");
        assert_eq!(Venue::Hyperliquid.short_code(), "HL");
        assert_eq!(Venue::Paper.short_code(), "PPR");
    }
}
