//! Position and quoting limits.

use crate::config::RiskConfig;
use crate::exchange::{OrderRequest, OrderSide};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Hard limits applied before quotes reach the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionLimits {
    pub max_position: Decimal,
    pub min_spread: Decimal,
    pub max_spread: Decimal,
}

impl PositionLimits {
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            max_position: config.max_position,
            min_spread: config.min_spread,
            max_spread: config.max_spread,
        }
    }

    /// Sides that may still be quoted given the current position.
    ///
    /// At or beyond `+max_position` no more buying; at or beyond
    /// `-max_position` no more selling.
    pub fn allowed_sides(&self, position_amt: Decimal) -> Vec<OrderSide> {
        if position_amt >= self.max_position {
            vec![OrderSide::Sell]
        } else if position_amt <= -self.max_position {
            vec![OrderSide::Buy]
        } else {
            vec![OrderSide::Buy, OrderSide::Sell]
        }
    }

    /// Drop target quotes on sides the position limit forbids.
    pub fn filter_targets(&self, position_amt: Decimal, targets: Vec<OrderRequest>) -> Vec<OrderRequest> {
        let allowed = self.allowed_sides(position_amt);
        let before = targets.len();
        let kept: Vec<OrderRequest> = targets
            .into_iter()
            .filter(|t| allowed.contains(&t.side))
            .collect();

        if kept.len() < before {
            debug!(
                position = %position_amt,
                max_position = %self.max_position,
                dropped = before - kept.len(),
                "Position limit reached, suppressing quotes"
            );
        }
        kept
    }

    /// Whether a spread lies inside the configured bounds.
    pub fn validate_spread(&self, spread: Decimal) -> bool {
        let ok = spread >= self.min_spread && spread <= self.max_spread;
        if !ok {
            warn!(
                %spread,
                min = %self.min_spread,
                max = %self.max_spread,
                "Spread outside allowed range"
            );
        }
        ok
    }
}

impl Default for PositionLimits {
    fn default() -> Self {
        Self::new(&RiskConfig::default())
    }
}
