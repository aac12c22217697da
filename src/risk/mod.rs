//! Risk monitoring for market-making strategies.
//!
//! Provides:
//! - Liquidation buffer, inventory drift and drawdown indicators
//! - Aggregate risk level
//! - Position limits that gate which sides may be quoted

mod indicators;
mod limits;

pub use indicators::{
    DrawdownStatus, DriftStatus, InventoryDirection, LiquidationStatus, PositionSide,
    RiskIndicators, RiskInputs, RiskLevel, RiskSnapshot,
};
pub use limits::PositionLimits;
