//! Decimal arithmetic utilities for quoting and scoring.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Round a price to the nearest tick (e.g., 0.01 for ETHUSDT).
pub fn round_to_tick(value: Decimal, tick_size: Decimal) -> Decimal {
    if tick_size <= Decimal::ZERO {
        return value;
    }
    (value / tick_size).round() * tick_size
}

/// Round a quantity down to the lot step.
pub fn round_down_to_lot(value: Decimal, lot_size: Decimal) -> Decimal {
    if lot_size <= Decimal::ZERO {
        return value;
    }
    (value / lot_size).floor() * lot_size
}

/// Safe division that returns zero if divisor is zero.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator == Decimal::ZERO {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Clamp into `[lower, upper]`.
///
/// Unlike `Ord::clamp` this never panics when `lower > upper`; the lower bound wins.
pub fn clamp(value: Decimal, lower: Decimal, upper: Decimal) -> Decimal {
    value.min(upper).max(lower)
}

/// Lossy conversion used by the statistics helpers.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Convert a finite float back into a decimal, `None` for NaN/inf.
pub fn from_f64(value: f64) -> Option<Decimal> {
    if value.is_finite() {
        Decimal::from_f64(value)
    } else {
        None
    }
}
