//! Portfolio management across strategy instances.
//!
//! - Strategy registry with status tracking
//! - Health scoring
//! - Portfolio PnL, Sharpe and risk grading
//! - Capital rebalancing (equal, sharpe, health, roi, composite, risk-adjusted)

mod allocation;
mod health;
mod manager;

pub use allocation::{AllocationMethod, CompositeWeights};
pub use health::{
    calculate_strategy_health, health_color, HealthFactor, HealthMetrics, HealthStatus,
    HEALTH_WEIGHTS,
};
pub use manager::{
    annualized_sharpe, AllocationInfo, MetricsUpdate, PortfolioData, PortfolioManager,
    StrategyAllocation, StrategyInfo, StrategyStatus, StrategySummary, DEFAULT_ALLOCATION,
    MAX_PNL_HISTORY, MINUTE_PERIODS_PER_YEAR,
};
