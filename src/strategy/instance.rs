//! One running strategy bound to its own exchange client.

use super::performance::{PerformanceStats, PerformanceTracker};
use super::{QuoteStrategy, StrategyKind};
use crate::config::TradingConfig;
use crate::exchange::{
    AccountData, ErrorKind, ExchangeClient, ExchangeError, MarketData, Order, OrderRequest, Venue,
};
use crate::orders::{OrderManager, SyncPlan};
use crate::portfolio::{annualized_sharpe, MAX_PNL_HISTORY};
use crate::risk::RiskIndicators;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Alerts kept per instance.
pub const MAX_ALERTS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Error,
    Warning,
}

/// Operator-facing problem report.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub kind: ErrorKind,
    pub message: String,
    pub suggestion: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Alert for a rejected or failed order operation.
    pub fn from_error(error: &ExchangeError) -> Self {
        let kind = error.kind();
        Self {
            level: match kind {
                ErrorKind::InsufficientFunds => AlertLevel::Error,
                _ => AlertLevel::Warning,
            },
            kind,
            message: error.to_string(),
            suggestion: error.suggestion().to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Alert for a cycle that could not load exchange data.
    pub fn refresh_failed(venue: Venue, error: &ExchangeError) -> Self {
        Self {
            level: AlertLevel::Error,
            kind: error.kind(),
            message: format!("Failed to refresh exchange data: {}", error),
            suggestion: format!("Check {} connectivity / API credentials.", venue),
            timestamp: Utc::now(),
        }
    }
}

/// Snapshot of an instance for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceStatus {
    pub strategy_id: String,
    pub strategy_type: StrategyKind,
    pub strategy_name: &'static str,
    pub symbol: String,
    pub venue: &'static str,
    pub running: bool,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub mid_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float")]
    pub funding_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub position: Decimal,
    /// Mark-to-mid PnL of the open position
    #[serde(with = "rust_decimal::serde::float")]
    pub unrealized_pnl: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub spread: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    pub alert: Option<Alert>,
    pub active_orders: Vec<Order>,
    pub order_count: usize,
    pub performance: PerformanceStats,
}

pub struct StrategyInstance {
    id: String,
    strategy: Box<dyn QuoteStrategy>,
    order_manager: OrderManager,
    exchange: Arc<dyn ExchangeClient>,
    tracked_order_ids: HashSet<String>,
    running: bool,
    strategy_switched: bool,

    // Cached exchange data from the last successful refresh
    market: Option<MarketData>,
    funding_rate: Decimal,
    account: Option<AccountData>,
    active_orders: Vec<Order>,

    performance: PerformanceTracker,
    alert: Option<Alert>,
    alert_history: VecDeque<Alert>,
    pnl_samples: VecDeque<Decimal>,
}

impl std::fmt::Debug for StrategyInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyInstance")
            .field("id", &self.id)
            .field("strategy", &self.strategy)
            .field("venue", &self.exchange.venue())
            .field("running", &self.running)
            .field("tracked_orders", &self.tracked_order_ids.len())
            .finish()
    }
}

impl StrategyInstance {
    pub fn new(
        id: &str,
        kind: StrategyKind,
        config: &TradingConfig,
        exchange: Arc<dyn ExchangeClient>,
        price_tolerance: Decimal,
    ) -> Self {
        info!(
            strategy_id = %id,
            strategy = %kind,
            symbol = %exchange.symbol(),
            venue = %exchange.venue(),
            "Strategy instance created"
        );

        Self {
            id: id.to_string(),
            strategy: kind.build(config),
            order_manager: OrderManager::with_tolerance(price_tolerance),
            exchange,
            tracked_order_ids: HashSet::new(),
            running: false,
            strategy_switched: false,
            market: None,
            funding_rate: Decimal::ZERO,
            account: None,
            active_orders: Vec::new(),
            performance: PerformanceTracker::new(),
            alert: None,
            alert_history: VecDeque::new(),
            pnl_samples: VecDeque::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn strategy(&self) -> &dyn QuoteStrategy {
        self.strategy.as_ref()
    }

    pub fn strategy_mut(&mut self) -> &mut dyn QuoteStrategy {
        self.strategy.as_mut()
    }

    pub fn exchange(&self) -> Arc<dyn ExchangeClient> {
        Arc::clone(&self.exchange)
    }

    pub fn symbol(&self) -> String {
        self.exchange.symbol()
    }

    // ==================== Lifecycle ====================

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Replace the quoting strategy, carrying over spread and quantity.
    ///
    /// The next cycle treats every resting order as stale.
    pub fn switch_strategy(&mut self, kind: StrategyKind, config: &TradingConfig) {
        let spread = self.strategy.spread();
        let quantity = self.strategy.quantity();

        let mut strategy = kind.build(config);
        strategy.set_spread(spread);
        strategy.set_quantity(quantity);

        info!(
            strategy_id = %self.id,
            from = %self.strategy.kind(),
            to = %kind,
            running = self.running,
            "Strategy switched"
        );
        self.strategy = strategy;
        self.strategy_switched = true;
    }

    pub fn is_switched(&self) -> bool {
        self.strategy_switched
    }

    // ==================== Exchange data ====================

    /// Fetch market data, funding rate and account data into the cache.
    ///
    /// The cache is only replaced when all three calls succeed.
    pub async fn refresh_data(&mut self) -> Result<(), ExchangeError> {
        let market = self.exchange.fetch_market_data().await?;
        if market.mid_price <= Decimal::ZERO {
            return Err(ExchangeError::NoMarketData(self.exchange.symbol()));
        }
        let funding_rate = self.exchange.fetch_funding_rate().await?;
        let account = self.exchange.fetch_account_data().await?;

        self.performance
            .update_position(account.position_amt, market.mid_price);

        debug!(
            strategy_id = %self.id,
            mid = %market.mid_price,
            %funding_rate,
            position = %account.position_amt,
            "Exchange data refreshed"
        );

        self.market = Some(market);
        self.funding_rate = funding_rate;
        self.account = Some(account);
        Ok(())
    }

    pub fn market(&self) -> Option<&MarketData> {
        self.market.as_ref()
    }

    pub fn funding_rate(&self) -> Decimal {
        self.funding_rate
    }

    pub fn account(&self) -> Option<&AccountData> {
        self.account.as_ref()
    }

    pub fn position_amt(&self) -> Decimal {
        self.account
            .as_ref()
            .map(|a| a.position_amt)
            .unwrap_or_default()
    }

    /// Quotes for the cached market, empty before the first refresh.
    pub fn target_orders(&self) -> Vec<OrderRequest> {
        match &self.market {
            Some(market) => self.strategy.target_orders(market, self.funding_rate),
            None => Vec::new(),
        }
    }

    // ==================== Order tracking ====================

    /// Reconcile against the open orders that belong to this instance.
    pub fn sync_orders(&self, open_orders: &[Order], targets: &[OrderRequest]) -> SyncPlan {
        let own = self.filter_tracked(open_orders);
        self.order_manager.sync_orders(&own, targets)
    }

    pub fn filter_tracked(&self, orders: &[Order]) -> Vec<Order> {
        orders
            .iter()
            .filter(|o| self.tracked_order_ids.contains(&o.id))
            .cloned()
            .collect()
    }

    /// Tracked ids that no longer appear among `open_orders`.
    pub fn vanished_orders(&self, open_orders: &[Order]) -> Vec<String> {
        let open: HashSet<&str> = open_orders.iter().map(|o| o.id.as_str()).collect();
        self.tracked_order_ids
            .iter()
            .filter(|id| !open.contains(id.as_str()))
            .cloned()
            .collect()
    }

    pub fn tracked_order_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tracked_order_ids.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn add_tracked_order(&mut self, id: &str) {
        self.tracked_order_ids.insert(id.to_string());
    }

    pub fn remove_tracked_order(&mut self, id: &str) {
        self.tracked_order_ids.remove(id);
    }

    /// Forget all tracked orders and clear the switch flag.
    pub fn clear_tracked_orders(&mut self) -> Vec<String> {
        self.strategy_switched = false;
        self.tracked_order_ids.drain().collect()
    }

    pub fn set_active_orders(&mut self, orders: Vec<Order>) {
        self.active_orders = orders;
    }

    pub fn active_orders(&self) -> &[Order] {
        &self.active_orders
    }

    pub fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    pub fn performance_mut(&mut self) -> &mut PerformanceTracker {
        &mut self.performance
    }

    // ==================== Alerts ====================

    pub fn raise_alert(&mut self, alert: Alert) {
        warn!(
            strategy_id = %self.id,
            kind = ?alert.kind,
            message = %alert.message,
            "Strategy alert"
        );
        if self.alert_history.len() == MAX_ALERTS {
            self.alert_history.pop_front();
        }
        self.alert_history.push_back(alert.clone());
        self.alert = Some(alert);
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn clear_alert(&mut self) {
        self.alert = None;
    }

    pub fn alert_history(&self) -> impl Iterator<Item = &Alert> {
        self.alert_history.iter()
    }

    // ==================== PnL ====================

    /// Mark-to-mid PnL of the open position.
    pub fn unrealized_pnl(&self) -> Decimal {
        match (&self.market, &self.account) {
            (Some(market), Some(account))
                if !account.position_amt.is_zero() && !account.entry_price.is_zero() =>
            {
                (market.mid_price - account.entry_price) * account.position_amt
            }
            _ => Decimal::ZERO,
        }
    }

    /// Realized plus unrealized.
    pub fn total_pnl(&self) -> Decimal {
        self.performance.realized_pnl() + self.unrealized_pnl()
    }

    pub fn record_pnl_sample(&mut self) {
        let pnl = self.total_pnl();
        self.pnl_samples.push_back(pnl);
        while self.pnl_samples.len() > MAX_PNL_HISTORY {
            self.pnl_samples.pop_front();
        }
    }

    pub fn pnl_samples(&self) -> Vec<Decimal> {
        self.pnl_samples.iter().copied().collect()
    }

    pub fn sharpe(&self, periods_per_year: u64) -> Option<Decimal> {
        annualized_sharpe(&self.pnl_samples, periods_per_year)
    }

    /// Peak-to-trough drawdown of `capital + pnl` as a fraction.
    pub fn max_drawdown(&self, capital: Decimal) -> Decimal {
        let equity: Vec<Decimal> = self.pnl_samples.iter().map(|p| capital + p).collect();
        -RiskIndicators::calculate_max_drawdown(&equity) / Decimal::ONE_HUNDRED
    }

    pub fn status(&self) -> InstanceStatus {
        let kind = self.strategy.kind();
        InstanceStatus {
            strategy_id: self.id.clone(),
            strategy_type: kind,
            strategy_name: kind.display_name(),
            symbol: self.exchange.symbol(),
            venue: self.exchange.venue().short_code(),
            running: self.running,
            mid_price: self.market.as_ref().map(|m| m.mid_price),
            funding_rate: self.funding_rate,
            position: self.position_amt(),
            unrealized_pnl: self.unrealized_pnl(),
            spread: self.strategy.spread(),
            quantity: self.strategy.quantity(),
            alert: self.alert.clone(),
            active_orders: self.active_orders.clone(),
            order_count: self.active_orders.len(),
            performance: self.performance.stats(),
        }
    }
}
