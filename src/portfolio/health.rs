//! Strategy health score.
//!
//! A 0-100 composite of four factors:
//! - Profitability (40%): `50 + pnl / 100`
//! - Risk-adjusted return (30%): `sharpe * 40`
//! - Execution quality (20%): `fill_rate * 100 - slippage_bps * 10`
//! - Stability (10%): `100 - max_drawdown * 1000`
//!
//! Each factor is clamped to `[0, 100]` before weighting.

use crate::utils::decimal::clamp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthFactor {
    Profitability,
    RiskAdjusted,
    Execution,
    Stability,
}

/// Factor weights; they sum to 1.
pub const HEALTH_WEIGHTS: [(HealthFactor, Decimal); 4] = [
    (HealthFactor::Profitability, dec!(0.4)),
    (HealthFactor::RiskAdjusted, dec!(0.3)),
    (HealthFactor::Execution, dec!(0.2)),
    (HealthFactor::Stability, dec!(0.1)),
];

const DEFAULT_FILL_RATE: Decimal = dec!(0.8);

/// Inputs to the health score. Absent fields take neutral defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthMetrics {
    pub pnl: Option<Decimal>,
    pub sharpe: Option<Decimal>,
    /// Fraction 0-1, defaults to 0.8
    pub fill_rate: Option<Decimal>,
    /// Basis points
    pub slippage: Option<Decimal>,
    /// Fraction 0-1
    pub max_drawdown: Option<Decimal>,
}

fn score_clamp(value: Decimal) -> Decimal {
    clamp(value, Decimal::ZERO, Decimal::ONE_HUNDRED)
}

/// Health score in `[0, 100]`, rounded to one decimal.
pub fn calculate_strategy_health(metrics: &HealthMetrics) -> Decimal {
    let pnl = metrics.pnl.unwrap_or_default();
    let sharpe = metrics.sharpe.unwrap_or_default();
    let fill_rate = metrics.fill_rate.unwrap_or(DEFAULT_FILL_RATE);
    let slippage = metrics.slippage.unwrap_or_default();
    let max_drawdown = metrics.max_drawdown.unwrap_or_default();

    let score = |factor: HealthFactor| match factor {
        HealthFactor::Profitability => score_clamp(dec!(50).saturating_add(pnl / dec!(100))),
        HealthFactor::RiskAdjusted => score_clamp(sharpe.saturating_mul(dec!(40))),
        HealthFactor::Execution => score_clamp(
            fill_rate
                .saturating_mul(dec!(100))
                .saturating_sub(slippage.saturating_mul(dec!(10))),
        ),
        HealthFactor::Stability => {
            score_clamp(dec!(100).saturating_sub(max_drawdown.saturating_mul(dec!(1000))))
        }
    };

    HEALTH_WEIGHTS
        .iter()
        .map(|(factor, weight)| score(*factor) * *weight)
        .sum::<Decimal>()
        .round_dp(1)
}

/// Qualitative band for a health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthStatus {
    pub fn from_score(score: Decimal) -> Self {
        if score >= dec!(80) {
            HealthStatus::Excellent
        } else if score >= dec!(60) {
            HealthStatus::Good
        } else if score >= dec!(40) {
            HealthStatus::Fair
        } else {
            HealthStatus::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::Fair => "fair",
            HealthStatus::Poor => "poor",
        }
    }

    /// Display color (hex).
    pub fn color(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "#10b981",
            HealthStatus::Good => "#f59e0b",
            HealthStatus::Fair => "#f97316",
            HealthStatus::Poor => "#ef4444",
        }
    }
}

pub fn health_color(score: Decimal) -> &'static str {
    HealthStatus::from_score(score).color()
}
