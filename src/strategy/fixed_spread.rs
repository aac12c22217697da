//! Symmetric quotes at a fixed spread around mid.

use super::quoting::{spread_around, two_sided, uncross, QuoteParams};
use super::{QuoteStrategy, StrategyKind};
use crate::config::TradingConfig;
use crate::exchange::{MarketData, OrderRequest};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct FixedSpreadStrategy {
    params: QuoteParams,
    safe_defaults: QuoteParams,
    /// Fallback precision when the venue does not report one
    tick_size: Decimal,
    step_size: Decimal,
}

impl FixedSpreadStrategy {
    pub fn new(config: &TradingConfig) -> Self {
        let params = QuoteParams::from_config(config);
        Self {
            safe_defaults: params.clone(),
            params,
            tick_size: config.tick_size,
            step_size: config.step_size,
        }
    }

    pub fn params(&self) -> &QuoteParams {
        &self.params
    }
}

impl Default for FixedSpreadStrategy {
    fn default() -> Self {
        Self::new(&TradingConfig::default())
    }
}

impl QuoteStrategy for FixedSpreadStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FixedSpread
    }

    fn spread(&self) -> Decimal {
        self.params.spread
    }

    fn set_spread(&mut self, spread: Decimal) {
        self.params.spread = spread;
    }

    fn quantity(&self) -> Decimal {
        self.params.quantity
    }

    fn set_quantity(&mut self, quantity: Decimal) {
        self.params.quantity = quantity;
    }

    fn target_orders(&self, market: &MarketData, _funding_rate: Decimal) -> Vec<OrderRequest> {
        if market.mid_price <= Decimal::ZERO {
            return Vec::new();
        }

        let (bid, ask) = spread_around(market.mid_price, self.params.spread, Decimal::ZERO);
        let (bid, ask) = uncross(bid, ask, market);

        two_sided(
            bid,
            ask,
            self.params.quantity,
            market.tick_size.unwrap_or(self.tick_size),
            market.step_size.unwrap_or(self.step_size),
        )
    }

    fn reset_to_safe_defaults(&mut self) -> QuoteParams {
        self.params = self.safe_defaults.clone();
        self.safe_defaults.clone()
    }
}
