//! Shared quote construction.

use crate::config::TradingConfig;
use crate::exchange::{MarketData, OrderRequest, OrderSide};
use crate::utils::decimal::{round_down_to_lot, round_to_tick};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Bid is pulled to this fraction of the best ask when it would cross.
pub const BID_CROSS_GUARD: Decimal = dec!(0.9995);
/// Ask is pushed to this multiple of the best bid when it would cross.
pub const ASK_CROSS_GUARD: Decimal = dec!(1.0005);

/// Tunable quoting parameters.
///
/// Each strategy keeps a copy of its starting parameters and restores them
/// when risk validation fails.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteParams {
    pub spread: Decimal,
    pub quantity: Decimal,
    pub leverage: u8,
    pub skew_factor: Decimal,
}

impl QuoteParams {
    pub fn from_config(config: &TradingConfig) -> Self {
        Self {
            spread: config.spread,
            quantity: config.quantity,
            leverage: config.leverage,
            skew_factor: config.skew_factor,
        }
    }
}

impl Default for QuoteParams {
    fn default() -> Self {
        Self::from_config(&TradingConfig::default())
    }
}

/// Raw bid/ask around mid, both shifted down by `offset`.
pub fn spread_around(mid: Decimal, spread: Decimal, offset: Decimal) -> (Decimal, Decimal) {
    let half = spread / dec!(2);
    (
        mid * (Decimal::ONE - half) - offset,
        mid * (Decimal::ONE + half) - offset,
    )
}

/// Keep quotes passive: never bid at or above the best ask, never offer at or
/// below the best bid. Missing (zero) book sides are ignored.
pub fn uncross(bid: Decimal, ask: Decimal, market: &MarketData) -> (Decimal, Decimal) {
    let bid = if market.best_ask > Decimal::ZERO && bid >= market.best_ask {
        market.best_ask * BID_CROSS_GUARD
    } else {
        bid
    };
    let ask = if market.best_bid > Decimal::ZERO && ask <= market.best_bid {
        market.best_bid * ASK_CROSS_GUARD
    } else {
        ask
    };
    (bid, ask)
}

/// Round to venue precision and emit one buy and one sell.
///
/// Returns nothing when either price or the quantity rounds to zero or below.
pub fn two_sided(
    bid: Decimal,
    ask: Decimal,
    quantity: Decimal,
    tick_size: Decimal,
    step_size: Decimal,
) -> Vec<OrderRequest> {
    let bid = round_to_tick(bid, tick_size);
    let ask = round_to_tick(ask, tick_size);
    let qty = round_down_to_lot(quantity, step_size);

    if bid <= Decimal::ZERO || ask <= Decimal::ZERO || qty <= Decimal::ZERO {
        return Vec::new();
    }

    vec![
        OrderRequest::new(OrderSide::Buy, bid, qty),
        OrderRequest::new(OrderSide::Sell, ask, qty),
    ]
}
