//! Quoting strategies and the per-instance runtime around them.
//!
//! - Fixed spread and funding-rate skew quoting
//! - Realized PnL and fill tracking
//! - Strategy instances bound to one exchange client each

mod fixed_spread;
mod funding_rate;
mod instance;
mod performance;
mod quoting;

pub use fixed_spread::FixedSpreadStrategy;
pub use funding_rate::{default_tick_for_price, FundingRateStrategy};
pub use instance::{Alert, AlertLevel, InstanceStatus, StrategyInstance, MAX_ALERTS};
pub use performance::{PerformanceStats, PerformanceTracker, MAX_TRADE_HISTORY};
pub use quoting::{QuoteParams, ASK_CROSS_GUARD, BID_CROSS_GUARD};

use crate::config::TradingConfig;
use crate::exchange::{MarketData, OrderRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Produces the desired resting quotes for a market snapshot.
pub trait QuoteStrategy: Send + Sync + fmt::Debug {
    fn kind(&self) -> StrategyKind;

    /// Human-readable name.
    fn name(&self) -> &'static str {
        self.kind().display_name()
    }

    /// Total spread as a fraction of mid.
    fn spread(&self) -> Decimal;

    fn set_spread(&mut self, spread: Decimal);

    fn quantity(&self) -> Decimal;

    fn set_quantity(&mut self, quantity: Decimal);

    /// At most one buy and one sell. Empty when no safe quote exists.
    fn target_orders(&self, market: &MarketData, funding_rate: Decimal) -> Vec<OrderRequest>;

    /// Restore the parameters the strategy was built with and return them.
    fn reset_to_safe_defaults(&mut self) -> QuoteParams;
}

/// Selectable strategy types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    FixedSpread,
    FundingRate,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::FixedSpread, StrategyKind::FundingRate];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::FixedSpread => "fixed_spread",
            StrategyKind::FundingRate => "funding_rate",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StrategyKind::FixedSpread => "Fixed Spread",
            StrategyKind::FundingRate => "Funding Rate Skew",
        }
    }

    /// Instantiate the strategy with parameters from config.
    pub fn build(&self, config: &TradingConfig) -> Box<dyn QuoteStrategy> {
        match self {
            StrategyKind::FixedSpread => Box::new(FixedSpreadStrategy::new(config)),
            StrategyKind::FundingRate => Box::new(FundingRateStrategy::new(config)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed_spread" | "fixed" => Ok(StrategyKind::FixedSpread),
            "funding_rate" | "funding" => Ok(StrategyKind::FundingRate),
            other => anyhow::bail!("unknown strategy type: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("fixed_spread".parse::<StrategyKind>().unwrap(), StrategyKind::FixedSpread);
        assert_eq!(" Funding_Rate ".parse::<StrategyKind>().unwrap(), StrategyKind::FundingRate);
        assert!("grid".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_build_uses_config_params() {
        let config = TradingConfig {
            spread: dec!(0.02),
            quantity: dec!(0.5),
            ..Default::default()
        };
        for kind in StrategyKind::ALL {
            let strategy = kind.build(&config);
            assert_eq!(strategy.kind(), kind);
            assert_eq!(strategy.spread(), dec!(0.02));
            assert_eq!(strategy.quantity(), dec!(0.5));
        }
        assert_eq!(StrategyKind::FundingRate.build(&config).name(), "Funding Rate Skew");
    }
}
