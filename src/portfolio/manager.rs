//! Multi-strategy portfolio manager.
//!
//! Owns the strategy registry, aggregates portfolio-level PnL and Sharpe,
//! grades overall risk, and redistributes capital across strategies.

use super::allocation::{apply_bounds, raw_weights, AllocationMethod, CompositeWeights, ScoreInputs};
use super::health::{calculate_strategy_health, HealthMetrics};
use crate::config::PortfolioConfig;
use crate::risk::RiskLevel;
use crate::utils::decimal::{from_f64, to_f64};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use tracing::{debug, info, warn};

/// Snapshots kept for the portfolio Sharpe.
pub const MAX_PNL_HISTORY: usize = 1000;

/// Annualization factor for one PnL sample per minute.
pub const MINUTE_PERIODS_PER_YEAR: u64 = 365 * 24 * 60;

/// Minimum snapshots before a Sharpe ratio is reported.
pub const MIN_SHARPE_SAMPLES: usize = 10;

/// Allocation given to a strategy registered without one.
pub const DEFAULT_ALLOCATION: Decimal = dec!(0.5);

const HIGH_RISK_DRAWDOWN: Decimal = dec!(0.1);
const MEDIUM_RISK_HEALTH: u8 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyStatus {
    Live,
    Paper,
    Paused,
    Stopped,
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyStatus::Live => "live",
            StrategyStatus::Paper => "paper",
            StrategyStatus::Paused => "paused",
            StrategyStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Registry entry for one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyInfo {
    pub id: String,
    pub name: String,
    pub status: StrategyStatus,
    pub pnl: Decimal,
    pub sharpe: Option<Decimal>,
    /// 0-100, truncated from the health score
    pub health: u8,
    /// Fraction of total capital
    pub allocation: Decimal,
    /// Requested weight that registration-time normalization works from
    pub weight: Decimal,
    pub roi: Decimal,
    pub fill_rate: Decimal,
    /// Basis points
    pub slippage: Decimal,
    /// Fraction 0-1
    pub max_drawdown: Decimal,
    pub total_trades: u64,
}

impl StrategyInfo {
    pub fn new(id: &str, name: &str, allocation: Decimal, status: StrategyStatus) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status,
            pnl: Decimal::ZERO,
            sharpe: None,
            health: 0,
            allocation,
            weight: allocation,
            roi: Decimal::ZERO,
            fill_rate: dec!(0.85),
            slippage: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            total_trades: 0,
        }
    }

    /// API view with display rounding.
    pub fn summary(&self) -> StrategySummary {
        StrategySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
            pnl: self.pnl.round_dp(4),
            sharpe: self.sharpe.map(|s| s.round_dp(2)),
            health: self.health,
            allocation: self.allocation.round_dp(4),
            roi: self.roi.round_dp(4),
        }
    }

    fn score_inputs(&self) -> ScoreInputs {
        ScoreInputs {
            sharpe: self.sharpe,
            roi: self.roi,
            health: Decimal::from(self.health),
            max_drawdown: self.max_drawdown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySummary {
    pub id: String,
    pub name: String,
    pub status: StrategyStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub pnl: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub sharpe: Option<Decimal>,
    pub health: u8,
    #[serde(with = "rust_decimal::serde::float")]
    pub allocation: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub roi: Decimal,
}

/// Portfolio overview served to the API layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioData {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_pnl: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub portfolio_sharpe: Option<Decimal>,
    pub active_count: usize,
    pub total_count: usize,
    pub risk_level: RiskLevel,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_capital: Decimal,
    /// Sorted by PnL, best first
    pub strategies: Vec<StrategySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyAllocation {
    pub id: String,
    pub name: String,
    pub status: StrategyStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub allocation: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub capital: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationInfo {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_capital: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_allocation: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub max_allocation: Decimal,
    pub auto_rebalance: bool,
    pub strategies: Vec<StrategyAllocation>,
}

/// Partial metrics update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsUpdate {
    pub pnl: Option<Decimal>,
    pub sharpe: Option<Decimal>,
    pub fill_rate: Option<Decimal>,
    pub slippage: Option<Decimal>,
    pub max_drawdown: Option<Decimal>,
    pub total_trades: Option<u64>,
}

/// Annualized Sharpe of the first differences of a cumulative series.
///
/// `None` with fewer than [`MIN_SHARPE_SAMPLES`] points or a flat series.
pub fn annualized_sharpe<'a, I>(series: I, periods_per_year: u64) -> Option<Decimal>
where
    I: IntoIterator<Item = &'a Decimal>,
{
    let values: Vec<f64> = series.into_iter().map(|v| to_f64(*v)).collect();
    if values.len() < MIN_SHARPE_SAMPLES {
        return None;
    }

    let returns: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev <= f64::EPSILON {
        return None;
    }

    let sharpe = mean / std_dev * (periods_per_year as f64).sqrt();
    from_f64(sharpe).map(|s| s.round_dp(2))
}

/// Strategy registry and capital allocator.
///
/// Single-owner: callers serialize access (the engine holds it by value).
#[derive(Debug, Clone)]
pub struct PortfolioManager {
    total_capital: Decimal,
    strategies: BTreeMap<String, StrategyInfo>,
    pnl_history: VecDeque<Decimal>,
    min_allocation: Decimal,
    max_allocation: Decimal,
    auto_rebalance: bool,
    periods_per_year: u64,
}

impl Default for PortfolioManager {
    fn default() -> Self {
        Self::new(dec!(10000))
    }
}

impl PortfolioManager {
    pub fn new(total_capital: Decimal) -> Self {
        Self {
            total_capital,
            strategies: BTreeMap::new(),
            pnl_history: VecDeque::with_capacity(MAX_PNL_HISTORY),
            min_allocation: dec!(0.1),
            max_allocation: dec!(0.7),
            auto_rebalance: false,
            periods_per_year: MINUTE_PERIODS_PER_YEAR,
        }
    }

    pub fn from_config(config: &PortfolioConfig) -> Self {
        let seconds_per_year = 365 * 24 * 3600;
        let interval = config.pnl_snapshot_interval_secs.max(1);

        Self {
            min_allocation: config.min_allocation,
            max_allocation: config.max_allocation,
            auto_rebalance: config.auto_rebalance,
            periods_per_year: (seconds_per_year / interval).max(1),
            ..Self::new(config.total_capital)
        }
    }

    // ==================== Registry ====================

    /// Register a strategy and renormalize every allocation to sum to 1.
    ///
    /// An existing id is replaced.
    pub fn register_strategy(
        &mut self,
        id: &str,
        name: &str,
        allocation: Decimal,
        status: StrategyStatus,
    ) {
        if self.strategies.contains_key(id) {
            warn!(strategy_id = %id, "Strategy already registered, replacing");
        }
        self.strategies
            .insert(id.to_string(), StrategyInfo::new(id, name, allocation, status));
        self.normalize_allocations();

        info!(strategy_id = %id, %name, %status, count = self.strategies.len(), "Strategy registered");
    }

    /// Register with the default allocation, stopped.
    pub fn register(&mut self, id: &str, name: &str) {
        self.register_strategy(id, name, DEFAULT_ALLOCATION, StrategyStatus::Stopped);
    }

    /// Drop a strategy and renormalize the rest.
    pub fn remove_strategy(&mut self, id: &str) -> bool {
        if self.strategies.remove(id).is_none() {
            return false;
        }
        self.normalize_allocations();
        info!(strategy_id = %id, count = self.strategies.len(), "Strategy removed");
        true
    }

    /// Recompute every allocation from the requested weights so they sum to 1.
    fn normalize_allocations(&mut self) {
        let total: Decimal = self.strategies.values().map(|s| s.weight).sum();
        if total > Decimal::ZERO {
            for strategy in self.strategies.values_mut() {
                strategy.allocation = strategy.weight / total;
            }
        }
    }

    pub fn get_strategy(&self, id: &str) -> Option<&StrategyInfo> {
        self.strategies.get(id)
    }

    pub fn strategies(&self) -> impl Iterator<Item = &StrategyInfo> {
        self.strategies.values()
    }

    // ==================== Metrics ====================

    /// Apply a partial metrics update, then recompute health and ROI.
    ///
    /// Unknown ids are ignored. Triggers a composite rebalance when
    /// auto-rebalance is on.
    pub fn update_strategy_metrics(&mut self, id: &str, update: MetricsUpdate) {
        let total_capital = self.total_capital;
        let Some(strategy) = self.strategies.get_mut(id) else {
            debug!(strategy_id = %id, "Metrics update for unknown strategy");
            return;
        };

        if let Some(pnl) = update.pnl {
            strategy.pnl = pnl;
        }
        if let Some(sharpe) = update.sharpe {
            strategy.sharpe = Some(sharpe);
        }
        if let Some(fill_rate) = update.fill_rate {
            strategy.fill_rate = fill_rate;
        }
        if let Some(slippage) = update.slippage {
            strategy.slippage = slippage;
        }
        if let Some(max_drawdown) = update.max_drawdown {
            strategy.max_drawdown = max_drawdown;
        }
        if let Some(total_trades) = update.total_trades {
            strategy.total_trades = total_trades;
        }

        let score = calculate_strategy_health(&HealthMetrics {
            pnl: Some(strategy.pnl),
            sharpe: Some(strategy.sharpe.unwrap_or_default()),
            fill_rate: Some(strategy.fill_rate),
            slippage: Some(strategy.slippage),
            max_drawdown: Some(strategy.max_drawdown),
        });
        strategy.health = score.trunc().to_u8().unwrap_or(0);

        let allocated_capital = total_capital
            .checked_mul(strategy.allocation)
            .unwrap_or(Decimal::ZERO);
        strategy.roi = if allocated_capital > Decimal::ZERO {
            strategy
                .pnl
                .checked_div(allocated_capital)
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        if self.auto_rebalance {
            self.rebalance_allocations(AllocationMethod::Composite, None);
        }
    }

    pub fn set_strategy_status(&mut self, id: &str, status: StrategyStatus) -> bool {
        match self.strategies.get_mut(id) {
            Some(strategy) => {
                if strategy.status != status {
                    info!(strategy_id = %id, from = %strategy.status, to = %status, "Strategy status changed");
                }
                strategy.status = status;
                true
            }
            None => false,
        }
    }

    pub fn pause_strategy(&mut self, id: &str) -> bool {
        self.set_strategy_status(id, StrategyStatus::Paused)
    }

    pub fn resume_strategy(&mut self, id: &str) -> bool {
        self.set_strategy_status(id, StrategyStatus::Live)
    }

    // ==================== Aggregates ====================

    pub fn get_total_pnl(&self) -> Decimal {
        self.strategies.values().map(|s| s.pnl).sum()
    }

    /// Number of LIVE strategies.
    pub fn get_active_count(&self) -> usize {
        self.strategies
            .values()
            .filter(|s| s.status == StrategyStatus::Live)
            .count()
    }

    pub fn get_portfolio_sharpe(&self) -> Option<Decimal> {
        annualized_sharpe(&self.pnl_history, self.periods_per_year)
    }

    /// Any drawdown above 10% is HIGH; otherwise any health below 40 is MEDIUM.
    pub fn get_risk_level(&self) -> RiskLevel {
        if self
            .strategies
            .values()
            .any(|s| s.max_drawdown > HIGH_RISK_DRAWDOWN)
        {
            return RiskLevel::High;
        }
        if self
            .strategies
            .values()
            .any(|s| s.health < MEDIUM_RISK_HEALTH)
        {
            return RiskLevel::Medium;
        }
        RiskLevel::Low
    }

    pub fn record_pnl_snapshot(&mut self) {
        let total = self.get_total_pnl();
        self.pnl_history.push_back(total);
        while self.pnl_history.len() > MAX_PNL_HISTORY {
            self.pnl_history.pop_front();
        }
    }

    pub fn pnl_history(&self) -> Vec<Decimal> {
        self.pnl_history.iter().copied().collect()
    }

    pub fn periods_per_year(&self) -> u64 {
        self.periods_per_year
    }

    pub fn get_portfolio_data(&self) -> PortfolioData {
        let mut strategies: Vec<&StrategyInfo> = self.strategies.values().collect();
        strategies.sort_by(|a, b| b.pnl.cmp(&a.pnl));

        PortfolioData {
            total_pnl: self.get_total_pnl().round_dp(4),
            portfolio_sharpe: self.get_portfolio_sharpe(),
            active_count: self.get_active_count(),
            total_count: self.strategies.len(),
            risk_level: self.get_risk_level(),
            total_capital: self.total_capital,
            strategies: strategies.into_iter().map(StrategyInfo::summary).collect(),
        }
    }

    // ==================== Capital ====================

    pub fn total_capital(&self) -> Decimal {
        self.total_capital
    }

    pub fn set_total_capital(&mut self, total_capital: Decimal) {
        info!(%total_capital, "Total capital updated");
        self.total_capital = total_capital;
    }

    /// Capital assigned to a strategy, zero when unknown.
    pub fn get_allocation_for_strategy(&self, id: &str) -> Decimal {
        self.strategies
            .get(id)
            .and_then(|s| self.total_capital.checked_mul(s.allocation))
            .unwrap_or(Decimal::ZERO)
    }

    /// Bounds used by rebalancing. `min <= max` is not checked.
    pub fn set_allocation_limits(&mut self, min_allocation: Decimal, max_allocation: Decimal) {
        self.min_allocation = min_allocation;
        self.max_allocation = max_allocation;
        info!(%min_allocation, %max_allocation, "Allocation limits updated");
    }

    pub fn allocation_limits(&self) -> (Decimal, Decimal) {
        (self.min_allocation, self.max_allocation)
    }

    /// Set one strategy's fraction, then renormalize all of them.
    pub fn set_strategy_allocation(&mut self, id: &str, allocation: Decimal) -> bool {
        match self.strategies.get_mut(id) {
            Some(strategy) => {
                strategy.weight = allocation;
                self.normalize_allocations();
                true
            }
            None => false,
        }
    }

    pub fn set_auto_rebalance(&mut self, enabled: bool) {
        self.auto_rebalance = enabled;
    }

    pub fn auto_rebalance(&self) -> bool {
        self.auto_rebalance
    }

    pub fn get_allocation_info(&self) -> AllocationInfo {
        AllocationInfo {
            total_capital: self.total_capital,
            min_allocation: self.min_allocation,
            max_allocation: self.max_allocation,
            auto_rebalance: self.auto_rebalance,
            strategies: self
                .strategies
                .values()
                .map(|s| StrategyAllocation {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    status: s.status,
                    allocation: s.allocation.round_dp(4),
                    capital: (self.total_capital * s.allocation).round_dp(2),
                })
                .collect(),
        }
    }

    /// Redistribute capital across the working set.
    ///
    /// The working set is every LIVE strategy, or every strategy when none
    /// is LIVE. Strategies outside it keep their current allocation. Returns
    /// the new fractions for the working set.
    pub fn rebalance_allocations(
        &mut self,
        method: AllocationMethod,
        weights: Option<&CompositeWeights>,
    ) -> BTreeMap<String, Decimal> {
        let live: Vec<String> = self
            .strategies
            .values()
            .filter(|s| s.status == StrategyStatus::Live)
            .map(|s| s.id.clone())
            .collect();
        let working: Vec<String> = if live.is_empty() {
            self.strategies.keys().cloned().collect()
        } else {
            live
        };

        if working.is_empty() {
            return BTreeMap::new();
        }

        let inputs: Vec<ScoreInputs> = working
            .iter()
            .filter_map(|id| self.strategies.get(id))
            .map(StrategyInfo::score_inputs)
            .collect();

        let default_weights = CompositeWeights::default();
        let fractions = raw_weights(method, &inputs, weights.unwrap_or(&default_weights));
        let fractions = apply_bounds(fractions, self.min_allocation, self.max_allocation);

        let allocations: BTreeMap<String, Decimal> = working.into_iter().zip(fractions).collect();
        for (id, fraction) in &allocations {
            if let Some(strategy) = self.strategies.get_mut(id) {
                strategy.allocation = *fraction;
                strategy.weight = *fraction;
            }
        }

        info!(
            %method,
            strategies = allocations.len(),
            "Allocations rebalanced"
        );
        allocations
    }

    /// Rebalance by method name; unknown names use equal weighting.
    pub fn rebalance_by_name(
        &mut self,
        method: &str,
        weights: Option<&HashMap<String, Decimal>>,
    ) -> BTreeMap<String, Decimal> {
        let method = AllocationMethod::parse_lossy(method);
        let weights = weights.map(CompositeWeights::from_map);
        self.rebalance_allocations(method, weights.as_ref())
    }
}
