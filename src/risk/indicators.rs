//! Real-time risk indicators for a market-making position.
//!
//! Four independent measures, each with a status band:
//! - Liquidation buffer: distance from the current price to liquidation
//! - Inventory drift: position relative to the configured maximum
//! - Max drawdown: worst peak-to-trough decline of cumulative PnL
//! - Overall level: the most severe of the above
//!
//! All percentages are plain numbers (`20` means 20%).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;

/// Aggregate risk level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Infer from a signed position amount; flat positions have no side.
    pub fn from_position(position_amt: Decimal) -> Option<Self> {
        if position_amt > Decimal::ZERO {
            Some(PositionSide::Long)
        } else if position_amt < Decimal::ZERO {
            Some(PositionSide::Short)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidationStatus {
    Safe,
    Warning,
    Danger,
    Critical,
}

impl LiquidationStatus {
    /// Bands: safe from 20 up, warning > 10, danger > 5, critical otherwise.
    ///
    /// The safe bound is inclusive so an exact 20% buffer reads as safe.
    pub fn from_buffer(buffer: Decimal) -> Self {
        if buffer >= dec!(20) {
            LiquidationStatus::Safe
        } else if buffer > dec!(10) {
            LiquidationStatus::Warning
        } else if buffer > dec!(5) {
            LiquidationStatus::Danger
        } else {
            LiquidationStatus::Critical
        }
    }

    pub fn severity(&self) -> RiskLevel {
        match self {
            LiquidationStatus::Safe => RiskLevel::Low,
            LiquidationStatus::Warning => RiskLevel::Medium,
            LiquidationStatus::Danger => RiskLevel::High,
            LiquidationStatus::Critical => RiskLevel::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftStatus {
    Balanced,
    Offset,
    Severe,
    Extreme,
}

impl DriftStatus {
    /// Bands on |drift|: balanced < 20, offset < 50, severe < 80, extreme otherwise.
    pub fn from_drift(drift: Decimal) -> Self {
        let magnitude = drift.abs();
        if magnitude < dec!(20) {
            DriftStatus::Balanced
        } else if magnitude < dec!(50) {
            DriftStatus::Offset
        } else if magnitude < dec!(80) {
            DriftStatus::Severe
        } else {
            DriftStatus::Extreme
        }
    }

    pub fn severity(&self) -> RiskLevel {
        match self {
            DriftStatus::Balanced => RiskLevel::Low,
            DriftStatus::Offset => RiskLevel::Medium,
            DriftStatus::Severe | DriftStatus::Extreme => RiskLevel::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryDirection {
    Long,
    Short,
    Neutral,
}

impl InventoryDirection {
    pub fn from_drift(drift: Decimal) -> Self {
        if drift > dec!(5) {
            InventoryDirection::Long
        } else if drift < dec!(-5) {
            InventoryDirection::Short
        } else {
            InventoryDirection::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawdownStatus {
    Excellent,
    Normal,
    Warning,
    Danger,
}

impl DrawdownStatus {
    /// Bands on |drawdown|: excellent < 5, normal < 10, warning < 20, danger otherwise.
    pub fn from_drawdown(drawdown: Decimal) -> Self {
        let magnitude = drawdown.abs();
        if magnitude < dec!(5) {
            DrawdownStatus::Excellent
        } else if magnitude < dec!(10) {
            DrawdownStatus::Normal
        } else if magnitude < dec!(20) {
            DrawdownStatus::Warning
        } else {
            DrawdownStatus::Danger
        }
    }

    pub fn severity(&self) -> RiskLevel {
        match self {
            DrawdownStatus::Excellent | DrawdownStatus::Normal => RiskLevel::Low,
            DrawdownStatus::Warning => RiskLevel::Medium,
            DrawdownStatus::Danger => RiskLevel::High,
        }
    }
}

/// Raw exchange fields feeding a risk snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskInputs {
    pub current_price: Decimal,
    pub position_amt: Decimal,
    pub liquidation_price: Decimal,
    pub max_position: Decimal,
    /// Inferred from the sign of `position_amt` when absent
    pub position_side: Option<PositionSide>,
}

/// Every indicator with its status, numbers rounded to 2 dp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSnapshot {
    #[serde(with = "rust_decimal::serde::float_option")]
    pub liquidation_buffer: Option<Decimal>,
    pub liquidation_buffer_status: Option<LiquidationStatus>,
    #[serde(with = "rust_decimal::serde::float")]
    pub inventory_drift: Decimal,
    pub inventory_drift_status: DriftStatus,
    pub inventory_direction: InventoryDirection,
    #[serde(with = "rust_decimal::serde::float")]
    pub max_drawdown: Decimal,
    pub max_drawdown_status: DrawdownStatus,
    pub overall_risk_level: RiskLevel,
}

/// Stateless indicator calculations.
pub struct RiskIndicators;

impl RiskIndicators {
    /// Percentage distance to liquidation, floored at zero.
    ///
    /// `None` when there is no position or either price is non-positive.
    pub fn calculate_liquidation_buffer(
        current_price: Decimal,
        liquidation_price: Decimal,
        position_side: Option<PositionSide>,
    ) -> Option<Decimal> {
        let side = position_side?;
        if liquidation_price <= Decimal::ZERO || current_price <= Decimal::ZERO {
            return None;
        }

        let distance = match side {
            PositionSide::Long => current_price - liquidation_price,
            PositionSide::Short => liquidation_price - current_price,
        };
        if distance <= Decimal::ZERO {
            return Some(Decimal::ZERO);
        }
        // Saturates when the ratio exceeds Decimal's range
        let buffer = distance
            .checked_div(current_price)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::MAX);

        Some(buffer)
    }

    pub fn get_liquidation_buffer_status(buffer: Option<Decimal>) -> Option<LiquidationStatus> {
        buffer.map(LiquidationStatus::from_buffer)
    }

    /// Position as a signed percentage of `max_position`, clamped to ±100.
    pub fn calculate_inventory_drift(position_amt: Decimal, max_position: Decimal) -> Decimal {
        if max_position <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let limit = Decimal::ONE_HUNDRED;
        match position_amt
            .checked_div(max_position)
            .and_then(|ratio| ratio.checked_mul(limit))
        {
            Some(drift) => drift.clamp(-limit, limit),
            None if position_amt.is_sign_negative() => -limit,
            None => limit,
        }
    }

    pub fn get_inventory_drift_status(drift: Decimal) -> DriftStatus {
        DriftStatus::from_drift(drift)
    }

    pub fn get_inventory_direction(drift: Decimal) -> InventoryDirection {
        InventoryDirection::from_drift(drift)
    }

    /// Largest running-peak drawdown as a negative percentage.
    ///
    /// Drawdowns are only measured while the running peak is positive.
    pub fn calculate_max_drawdown(pnl_history: &[Decimal]) -> Decimal {
        if pnl_history.len() < 2 {
            return Decimal::ZERO;
        }

        let mut peak = pnl_history[0];
        let mut max_drawdown = Decimal::ZERO;

        for &pnl in pnl_history {
            if pnl > peak {
                peak = pnl;
            } else if peak > Decimal::ZERO {
                let drawdown = peak
                    .saturating_sub(pnl)
                    .checked_div(peak)
                    .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                    .unwrap_or(Decimal::MAX);
                max_drawdown = max_drawdown.max(drawdown);
            }
        }

        -max_drawdown
    }

    pub fn get_max_drawdown_status(drawdown: Decimal) -> DrawdownStatus {
        DrawdownStatus::from_drawdown(drawdown)
    }

    /// Most severe level among the present statuses.
    pub fn calculate_overall_risk_level(
        liquidation: Option<LiquidationStatus>,
        drift: DriftStatus,
        drawdown: DrawdownStatus,
    ) -> RiskLevel {
        [
            liquidation.map(|s| s.severity()),
            Some(drift.severity()),
            Some(drawdown.severity()),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(RiskLevel::Low)
    }

    /// Compute every indicator from raw exchange data.
    pub fn from_exchange_data(inputs: &RiskInputs, pnl_history: &[Decimal]) -> RiskSnapshot {
        let side = inputs
            .position_side
            .or_else(|| PositionSide::from_position(inputs.position_amt));

        let buffer =
            Self::calculate_liquidation_buffer(inputs.current_price, inputs.liquidation_price, side);
        let buffer_status = Self::get_liquidation_buffer_status(buffer);

        let drift = Self::calculate_inventory_drift(inputs.position_amt, inputs.max_position);
        let drift_status = Self::get_inventory_drift_status(drift);

        let max_dd = Self::calculate_max_drawdown(pnl_history);
        let dd_status = Self::get_max_drawdown_status(max_dd);

        RiskSnapshot {
            liquidation_buffer: buffer.map(|b| b.round_dp(2)),
            liquidation_buffer_status: buffer_status,
            inventory_drift: drift.round_dp(2),
            inventory_drift_status: drift_status,
            inventory_direction: Self::get_inventory_direction(drift),
            max_drawdown: max_dd.round_dp(2),
            max_drawdown_status: dd_status,
            overall_risk_level: Self::calculate_overall_risk_level(buffer_status, drift_status, dd_status),
        }
    }
}
