//! Realized PnL, win rate and fill statistics for one strategy instance.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;

/// Realized PnL points kept for charting.
pub const MAX_TRADE_HISTORY: usize = 100;

#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    realized_pnl: Decimal,
    total_trades: u64,
    winning_trades: u64,
    pnl_history: VecDeque<(DateTime<Utc>, Decimal)>,
    last_position: Decimal,
    avg_entry_price: Decimal,
    orders_placed: u64,
    orders_filled: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStats {
    #[serde(with = "rust_decimal::serde::float")]
    pub realized_pnl: Decimal,
    pub total_trades: u64,
    pub winning_trades: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub win_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub fill_rate: Option<Decimal>,
    /// `(unix millis, cumulative realized pnl)`
    pub pnl_history: Vec<(i64, f64)>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self {
            realized_pnl: Decimal::ZERO,
            total_trades: 0,
            winning_trades: 0,
            pnl_history: VecDeque::with_capacity(MAX_TRADE_HISTORY),
            last_position: Decimal::ZERO,
            avg_entry_price: Decimal::ZERO,
            orders_placed: 0,
            orders_filled: 0,
        }
    }

    /// Feed the latest signed position. Reductions realize PnL at `price`
    /// against the average entry; additions re-average the entry.
    pub fn update_position(&mut self, new_position: Decimal, price: Decimal) {
        let last = self.last_position;
        if new_position == last {
            return;
        }

        let flipped = !last.is_zero()
            && !new_position.is_zero()
            && last.is_sign_positive() != new_position.is_sign_positive();

        if flipped {
            // Close everything, then open the remainder at the current price.
            self.realize(last, price);
            self.avg_entry_price = price;
        } else if new_position.abs() < last.abs() {
            self.realize(last - new_position, price);
            if new_position.is_zero() {
                self.avg_entry_price = Decimal::ZERO;
            }
        } else if last.is_zero() {
            self.avg_entry_price = price;
        } else {
            let old_value = last.abs() * self.avg_entry_price;
            let added_value = (new_position - last).abs() * price;
            self.avg_entry_price = (old_value + added_value) / new_position.abs();
        }

        self.last_position = new_position;
    }

    /// `closed` is signed like the position being reduced.
    fn realize(&mut self, closed: Decimal, price: Decimal) {
        if self.avg_entry_price <= Decimal::ZERO {
            return;
        }
        let pnl = (price - self.avg_entry_price) * closed;
        self.realized_pnl += pnl;
        self.total_trades += 1;
        if pnl > Decimal::ZERO {
            self.winning_trades += 1;
        }

        if self.pnl_history.len() == MAX_TRADE_HISTORY {
            self.pnl_history.pop_front();
        }
        self.pnl_history
            .push_back((Utc::now(), self.realized_pnl.round_dp(4)));
    }

    pub fn record_placed(&mut self, count: usize) {
        self.orders_placed += count as u64;
    }

    pub fn record_filled(&mut self, count: usize) {
        self.orders_filled += count as u64;
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    pub fn total_trades(&self) -> u64 {
        self.total_trades
    }

    pub fn avg_entry_price(&self) -> Decimal {
        self.avg_entry_price
    }

    /// Percentage of closing trades with positive PnL, 2 dp.
    pub fn win_rate(&self) -> Decimal {
        if self.total_trades == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.winning_trades) / Decimal::from(self.total_trades)
            * Decimal::ONE_HUNDRED)
            .round_dp(2)
    }

    /// Filled / placed, `None` before the first placement.
    pub fn fill_rate(&self) -> Option<Decimal> {
        if self.orders_placed == 0 {
            return None;
        }
        let rate = Decimal::from(self.orders_filled) / Decimal::from(self.orders_placed);
        Some(rate.min(Decimal::ONE))
    }

    pub fn stats(&self) -> PerformanceStats {
        PerformanceStats {
            realized_pnl: self.realized_pnl.round_dp(4),
            total_trades: self.total_trades,
            winning_trades: self.winning_trades,
            win_rate: self.win_rate(),
            fill_rate: self.fill_rate().map(|r| r.round_dp(4)),
            pnl_history: self
                .pnl_history
                .iter()
                .map(|(ts, pnl)| (ts.timestamp_millis(), crate::utils::decimal::to_f64(*pnl)))
                .collect(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}
