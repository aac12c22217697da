//! Quotes skewed by the funding rate.
//!
//! A positive rate means longs pay shorts, so both quotes move down by
//! `funding_rate * skew_factor * mid`: the ask gets closer to the market and
//! the bid moves away, leaning the inventory short.

use super::quoting::{spread_around, two_sided, uncross, QuoteParams};
use super::{QuoteStrategy, StrategyKind};
use crate::config::TradingConfig;
use crate::exchange::{MarketData, OrderRequest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Tick size guess for venues that do not report one, by price band.
pub fn default_tick_for_price(mid: Decimal) -> Decimal {
    if mid < dec!(0.0001) {
        dec!(0.00000001)
    } else if mid < dec!(0.01) {
        dec!(0.0000001)
    } else if mid < Decimal::ONE {
        dec!(0.000001)
    } else if mid < dec!(100) {
        dec!(0.0001)
    } else {
        dec!(0.01)
    }
}

#[derive(Debug, Clone)]
pub struct FundingRateStrategy {
    params: QuoteParams,
    safe_defaults: QuoteParams,
    step_size: Decimal,
}

impl FundingRateStrategy {
    pub fn new(config: &TradingConfig) -> Self {
        let params = QuoteParams::from_config(config);
        Self {
            safe_defaults: params.clone(),
            params,
            step_size: config.step_size,
        }
    }

    pub fn skew_factor(&self) -> Decimal {
        self.params.skew_factor
    }

    pub fn set_skew_factor(&mut self, skew_factor: Decimal) {
        self.params.skew_factor = skew_factor;
    }

    /// Price offset applied to both quotes.
    pub fn skew_offset(&self, mid: Decimal, funding_rate: Decimal) -> Decimal {
        funding_rate * self.params.skew_factor * mid
    }
}

impl Default for FundingRateStrategy {
    fn default() -> Self {
        Self::new(&TradingConfig::default())
    }
}

impl QuoteStrategy for FundingRateStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FundingRate
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

    fn target_orders(&self, market: &MarketData, funding_rate: Decimal) -> Vec<OrderRequest> {
        let mid = market.mid_price;
        if mid <= Decimal::ZERO {
            return Vec::new();
        }

        let offset = self.skew_offset(mid, funding_rate);
        let (bid, ask) = spread_around(mid, self.params.spread, offset);
        let (bid, ask) = uncross(bid, ask, market);

        let tick = market
            .tick_size
            .unwrap_or_else(|| default_tick_for_price(mid));

        two_sided(
            bid,
            ask,
            self.params.quantity,
            tick,
            market.step_size.unwrap_or(self.step_size),
        )
    }

    fn reset_to_safe_defaults(&mut self) -> QuoteParams {
        self.params = self.safe_defaults.clone();
        self.safe_defaults.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> FundingRateStrategy {
        FundingRateStrategy::new(&TradingConfig {
            spread: dec!(0.01),
            skew_factor: dec!(100),
            ..Default::default()
        })
    }

    #[test]
    fn test_zero_funding_matches_symmetric_quotes() {
        let market = MarketData::from_top_of_book(dec!(1999.9), dec!(2000.1));
        let orders = strategy().target_orders(&market, Decimal::ZERO);
        assert_eq!(orders[0].price, dec!(1990.00));
        assert_eq!(orders[1].price, dec!(2010.00));
    }

    #[test]
    fn test_positive_funding_skews_down() {
        let market = MarketData::from_top_of_book(dec!(1999.9), dec!(2000.1));
        // offset = 0.00001 * 100 * 2000 = 2
        let orders = strategy().target_orders(&market, dec!(0.00001));
        assert_eq!(orders[0].price, dec!(1988.00));
        assert_eq!(orders[1].price, dec!(2008.00));
    }

    #[test]
    fn test_skewed_ask_kept_above_best_bid() {
        let market = MarketData::from_top_of_book(dec!(1999.9), dec!(2000.1));
        // offset 200 pushes the raw ask to 1810, well through the bid
        let orders = strategy().target_orders(&market, dec!(0.001));
        assert_eq!(orders[1].price, dec!(2000.90));
        assert!(orders[0].price < orders[1].price);
    }

    #[test]
    fn test_negative_funding_skews_up() {
        let market = MarketData::from_top_of_book(dec!(1999.9), dec!(2000.1));
        let orders = strategy().target_orders(&market, dec!(-0.00001));
        assert_eq!(orders[0].price, dec!(1992.00));
        assert_eq!(orders[1].price, dec!(2012.00));
    }

    #[test]
    fn test_default_tick_bands() {
        assert_eq!(default_tick_for_price(dec!(0.00005)), dec!(0.00000001));
        assert_eq!(default_tick_for_price(dec!(0.005)), dec!(0.0000001));
        assert_eq!(default_tick_for_price(dec!(0.5)), dec!(0.000001));
        assert_eq!(default_tick_for_price(dec!(50)), dec!(0.0001));
        assert_eq!(default_tick_for_price(dec!(100)), dec!(0.01));
    }

    #[test]
    fn test_low_price_uses_fine_tick() {
        let market = MarketData::from_top_of_book(dec!(0.49995), dec!(0.50005));
        let orders = strategy().target_orders(&market, Decimal::ZERO);
        assert_eq!(orders[0].price, dec!(0.4975));
        assert_eq!(orders[1].price, dec!(0.5025));
    }

    #[test]
    fn test_non_positive_prices_produce_no_quotes() {
        let market = MarketData {
            best_bid: Decimal::ZERO,
            best_ask: Decimal::ZERO,
            mid_price: dec!(10),
            tick_size: None,
            step_size: None,
        };
        // offset = 0.02 * 100 * 10 = 20, both quotes below zero
        assert!(strategy().target_orders(&market, dec!(0.02)).is_empty());
    }
}
