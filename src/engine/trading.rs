//! Trading engine.

use crate::config::Config;
use crate::exchange::{ExchangeClient, Order};
use crate::portfolio::{MetricsUpdate, PortfolioData, PortfolioManager, StrategyStatus};
use crate::risk::{PositionLimits, RiskIndicators, RiskInputs, RiskSnapshot};
use crate::strategy::{Alert, InstanceStatus, StrategyInstance, StrategyKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Owns the strategy instances and the portfolio they report into.
///
/// Single owner: every method takes `&self`/`&mut self` and the run loop
/// drives cycles sequentially.
pub struct TradingEngine {
    config: Config,
    instances: BTreeMap<String, StrategyInstance>,
    portfolio: PortfolioManager,
    limits: PositionLimits,
    snapshot_interval: Duration,
    last_snapshot: Option<Instant>,
    cycle_count: u64,
}

#[derive(Debug, Serialize)]
pub struct EngineStatus {
    pub cycle_count: u64,
    pub instances: Vec<InstanceStatus>,
    pub portfolio: PortfolioData,
}

impl TradingEngine {
    pub fn new(config: Config) -> Self {
        Self {
            portfolio: PortfolioManager::from_config(&config.portfolio),
            limits: PositionLimits::new(&config.risk),
            snapshot_interval: Duration::from_secs(config.portfolio.pnl_snapshot_interval_secs),
            last_snapshot: None,
            cycle_count: 0,
            instances: BTreeMap::new(),
            config,
        }
    }

    // ==================== Instances ====================

    /// Create an instance and register it with the portfolio.
    ///
    /// Returns false if the id is taken.
    pub fn add_instance(
        &mut self,
        id: &str,
        kind: StrategyKind,
        exchange: Arc<dyn ExchangeClient>,
    ) -> bool {
        if self.instances.contains_key(id) {
            warn!(strategy_id = %id, "Strategy instance already exists");
            return false;
        }

        let instance = StrategyInstance::new(
            id,
            kind,
            &self.config.trading,
            exchange,
            self.config.engine.price_tolerance,
        );
        self.portfolio.register(id, kind.display_name());
        self.instances.insert(id.to_string(), instance);
        true
    }

    /// Cancel the instance's tracked orders and drop it.
    pub async fn remove_instance(&mut self, id: &str) -> bool {
        let Some(mut instance) = self.instances.remove(id) else {
            return false;
        };

        let ids = instance.clear_tracked_orders();
        if !ids.is_empty() {
            match instance.exchange().cancel_orders(&ids).await {
                Ok(()) => info!(strategy_id = %id, count = ids.len(), "Cancelled orders of removed strategy"),
                Err(e) => error!(strategy_id = %id, error = %e, "Failed to cancel orders of removed strategy"),
            }
        }

        self.portfolio.remove_strategy(id);
        info!(strategy_id = %id, "Strategy instance removed");
        true
    }

    pub fn start_instance(&mut self, id: &str) -> bool {
        match self.instances.get_mut(id) {
            Some(instance) => {
                instance.start();
                info!(strategy_id = %id, "Strategy started");
                true
            }
            None => false,
        }
    }

    pub fn stop_instance(&mut self, id: &str) -> bool {
        match self.instances.get_mut(id) {
            Some(instance) => {
                instance.stop();
                info!(strategy_id = %id, "Strategy stopped");
                true
            }
            None => false,
        }
    }

    pub fn start_all(&mut self) {
        for instance in self.instances.values_mut() {
            instance.start();
        }
    }

    /// Swap the quoting strategy; resting orders are replaced next cycle.
    pub fn switch_strategy(&mut self, id: &str, kind: StrategyKind) -> bool {
        match self.instances.get_mut(id) {
            Some(instance) => {
                instance.switch_strategy(kind, &self.config.trading);
                true
            }
            None => false,
        }
    }

    pub fn instance(&self, id: &str) -> Option<&StrategyInstance> {
        self.instances.get(id)
    }

    pub fn instance_mut(&mut self, id: &str) -> Option<&mut StrategyInstance> {
        self.instances.get_mut(id)
    }

    pub fn instances(&self) -> impl Iterator<Item = &StrategyInstance> {
        self.instances.values()
    }

    pub fn portfolio(&self) -> &PortfolioManager {
        &self.portfolio
    }

    pub fn portfolio_mut(&mut self) -> &mut PortfolioManager {
        &mut self.portfolio
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    // ==================== Cycle ====================

    /// One pass over every running instance, then a portfolio sync.
    pub async fn run_cycle(&mut self) {
        self.cycle_count += 1;
        let running = self.instances.values().filter(|i| i.is_running()).count();
        debug!(
            cycle = self.cycle_count,
            instances = self.instances.len(),
            running,
            "Starting cycle"
        );

        let limits = &self.limits;
        for instance in self.instances.values_mut().filter(|i| i.is_running()) {
            Self::run_instance_cycle(instance, limits).await;
        }

        self.sync_portfolio(Instant::now());
    }

    async fn run_instance_cycle(instance: &mut StrategyInstance, limits: &PositionLimits) {
        let exchange = instance.exchange();

        if let Err(e) = instance.refresh_data().await {
            instance.raise_alert(Alert::refresh_failed(exchange.venue(), &e));
            return;
        }

        if !limits.validate_spread(instance.strategy().spread()) {
            let params = instance.strategy_mut().reset_to_safe_defaults();
            warn!(
                strategy_id = %instance.id(),
                spread = %params.spread,
                quantity = %params.quantity,
                "Strategy reset to safe defaults"
            );
        }

        let targets = limits.filter_targets(instance.position_amt(), instance.target_orders());

        let open_orders = if instance.is_switched() {
            let stale = instance.tracked_order_ids();
            if !stale.is_empty() {
                if let Err(e) = exchange.cancel_orders(&stale).await {
                    instance.raise_alert(Alert::from_error(&e));
                    return;
                }
            }
            instance.clear_tracked_orders();
            info!(
                strategy_id = %instance.id(),
                cancelled = stale.len(),
                "Strategy switched, full order reset"
            );
            Vec::new()
        } else {
            match exchange.fetch_open_orders().await {
                Ok(all) => {
                    let filled = instance.vanished_orders(&all);
                    if !filled.is_empty() {
                        for id in &filled {
                            instance.remove_tracked_order(id);
                        }
                        instance.performance_mut().record_filled(filled.len());
                        info!(
                            strategy_id = %instance.id(),
                            filled = filled.len(),
                            "Tracked orders no longer open"
                        );
                    }
                    instance.filter_tracked(&all)
                }
                Err(e) => {
                    instance.raise_alert(Alert::from_error(&e));
                    return;
                }
            }
        };

        let plan = instance.sync_orders(&open_orders, &targets);
        if plan.is_empty() {
            instance.set_active_orders(open_orders);
            return;
        }

        let mut active: Vec<Order> = open_orders
            .into_iter()
            .filter(|o| !plan.cancel_ids.contains(&o.id))
            .collect();

        // Cancellations go out before placements.
        if !plan.cancel_ids.is_empty() {
            if let Err(e) = exchange.cancel_orders(&plan.cancel_ids).await {
                instance.raise_alert(Alert::from_error(&e));
                return;
            }
            for id in &plan.cancel_ids {
                instance.remove_tracked_order(id);
            }
        }

        if !plan.place.is_empty() {
            match exchange.place_orders(&plan.place).await {
                Ok(outcome) => {
                    instance.performance_mut().record_placed(outcome.placed.len());
                    for order in &outcome.placed {
                        instance.add_tracked_order(&order.id);
                    }
                    info!(
                        strategy_id = %instance.id(),
                        cancelled = plan.cancel_ids.len(),
                        placed = outcome.placed.len(),
                        rejected = outcome.rejected.len(),
                        "Orders synced"
                    );
                    active.extend(outcome.placed);
                    for (request, err) in &outcome.rejected {
                        debug!(side = %request.side, price = %request.price, error = %err, "Order rejected");
                        instance.raise_alert(Alert::from_error(err));
                    }
                }
                Err(e) => instance.raise_alert(Alert::from_error(&e)),
            }
        }

        instance.set_active_orders(active);
    }

    /// Push instance metrics into the portfolio manager.
    ///
    /// Running instances are LIVE, others PAUSED. PnL samples and the
    /// portfolio snapshot are taken at most once per snapshot interval.
    pub fn sync_portfolio(&mut self, now: Instant) {
        let snapshot_due = self
            .last_snapshot
            .map_or(true, |last| now.duration_since(last) >= self.snapshot_interval);
        let periods = self.portfolio.periods_per_year();

        // Statuses first so any auto-rebalance sees the whole set
        for instance in self.instances.values() {
            let status = if instance.is_running() {
                StrategyStatus::Live
            } else {
                StrategyStatus::Paused
            };
            self.portfolio.set_strategy_status(instance.id(), status);
        }

        // Capital is read before any update can move allocations
        let mut updates = Vec::with_capacity(self.instances.len());
        for instance in self.instances.values_mut() {
            if snapshot_due {
                instance.record_pnl_sample();
            }

            let capital = self.portfolio.get_allocation_for_strategy(instance.id());
            let performance = instance.performance();
            updates.push((
                instance.id().to_string(),
                MetricsUpdate {
                    pnl: Some(instance.total_pnl()),
                    sharpe: instance.sharpe(periods),
                    fill_rate: performance.fill_rate(),
                    slippage: None,
                    max_drawdown: Some(instance.max_drawdown(capital)),
                    total_trades: Some(performance.total_trades()),
                },
            ));
        }

        for (id, update) in updates {
            self.portfolio.update_strategy_metrics(&id, update);
        }

        if snapshot_due {
            self.portfolio.record_pnl_snapshot();
            self.last_snapshot = Some(now);
        }
    }

    // ==================== Reporting ====================

    /// Risk indicators for one instance from its cached exchange data.
    ///
    /// `None` for unknown ids or before the first successful refresh.
    pub fn risk_snapshot(&self, id: &str) -> Option<RiskSnapshot> {
        let instance = self.instances.get(id)?;
        let market = instance.market()?;
        let account = instance.account().cloned().unwrap_or_default();

        let inputs = RiskInputs {
            current_price: market.mid_price,
            position_amt: account.position_amt,
            liquidation_price: account.liquidation_price,
            max_position: self.limits.max_position,
            position_side: None,
        };
        Some(RiskIndicators::from_exchange_data(
            &inputs,
            &self.portfolio.pnl_history(),
        ))
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            cycle_count: self.cycle_count,
            instances: self.instances.values().map(StrategyInstance::status).collect(),
            portfolio: self.portfolio.get_portfolio_data(),
        }
    }

    // ==================== Run loop ====================

    /// Drive cycles every `refresh_interval_secs` until Ctrl-C or
    /// `max_cycles`, then cancel all tracked orders.
    pub async fn run(&mut self, max_cycles: Option<u64>) {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
            shutdown_clone.store(true, Ordering::SeqCst);
        });

        let period = Duration::from_secs(self.config.engine.refresh_interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            instances = self.instances.len(),
            interval_secs = period.as_secs(),
            ?max_cycles,
            "Starting trading loop"
        );

        let mut cycles = 0u64;
        while !shutdown.load(Ordering::SeqCst) {
            ticker.tick().await;
            if shutdown.load(Ordering::SeqCst) {
                break;
            }

            self.run_cycle().await;
            cycles += 1;

            if cycles % 30 == 0 {
                let data = self.portfolio.get_portfolio_data();
                info!(
                    cycle = self.cycle_count,
                    total_pnl = %data.total_pnl,
                    active = data.active_count,
                    risk = %data.risk_level,
                    "Portfolio status"
                );
            }

            if max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }
        }

        self.shutdown().await;
    }

    /// Stop every instance and cancel its tracked orders.
    pub async fn shutdown(&mut self) {
        for instance in self.instances.values_mut() {
            instance.stop();
            let ids = instance.clear_tracked_orders();
            if ids.is_empty() {
                continue;
            }
            match instance.exchange().cancel_orders(&ids).await {
                Ok(()) => info!(strategy_id = %instance.id(), count = ids.len(), "Cancelled orders on shutdown"),
                Err(e) => error!(strategy_id = %instance.id(), error = %e, "Failed to cancel orders on shutdown"),
            }
        }
        info!(cycles = self.cycle_count, "Trading engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{
        AccountData, ErrorKind, ExchangeError, MarketData, MockExchangeClient, OrderRequest,
        OrderSide, PaperExchange, PlaceOutcome, Venue,
    };
    use crate::strategy::AlertLevel;
    use mockall::Sequence;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn mock_client() -> MockExchangeClient {
        let mut mock = MockExchangeClient::new();
        mock.expect_symbol().return_const("ETHUSDT".to_string());
        mock.expect_venue().return_const(Venue::Binance);
        mock
    }

    fn expect_data(mock: &mut MockExchangeClient, position: Decimal) {
        mock.expect_fetch_market_data()
            .returning(|| Ok(MarketData::from_top_of_book(dec!(1999.9), dec!(2000.1))));
        mock.expect_fetch_funding_rate().returning(|| Ok(Decimal::ZERO));
        mock.expect_fetch_account_data().returning(move || {
            Ok(AccountData {
                position_amt: position,
                entry_price: if position.is_zero() { Decimal::ZERO } else { dec!(2000) },
                balance: dec!(1000),
                liquidation_price: if position.is_zero() { Decimal::ZERO } else { dec!(1600) },
                unrealized_pnl: Decimal::ZERO,
            })
        });
    }

    fn accept_all(requests: &[OrderRequest]) -> Result<PlaceOutcome, ExchangeError> {
        Ok(PlaceOutcome {
            placed: requests
                .iter()
                .enumerate()
                .map(|(i, r)| Order::new(format!("n{}", i), r.side, r.price, r.quantity))
                .collect(),
            rejected: Vec::new(),
        })
    }

    fn engine_with(mock: MockExchangeClient) -> TradingEngine {
        let mut engine = TradingEngine::new(Config::default());
        assert!(engine.add_instance("alpha", StrategyKind::FixedSpread, Arc::new(mock)));
        engine.start_instance("alpha");
        engine
    }

    async fn paper_exchange() -> Arc<PaperExchange> {
        let paper = Arc::new(PaperExchange::default());
        paper
            .update_market_data(MarketData::from_top_of_book(dec!(1999.9), dec!(2000.1)))
            .await;
        paper
    }

    #[tokio::test]
    async fn test_paper_cycle_places_keeps_and_requotes() {
        let paper = paper_exchange().await;
        let mut engine = TradingEngine::new(Config::default());
        engine.add_instance("alpha", StrategyKind::FixedSpread, paper.clone());
        engine.start_instance("alpha");

        engine.run_cycle().await;
        let state = paper.get_state().await;
        assert_eq!(state.open_orders.len(), 2);
        let first_ids: Vec<String> = state.open_orders.iter().map(|o| o.id.clone()).collect();
        let instance = engine.instance("alpha").unwrap();
        assert_eq!(instance.active_orders().len(), 2);
        assert_eq!(instance.tracked_order_ids().len(), 2);

        // Unchanged market: nothing to do
        engine.run_cycle().await;
        let state = paper.get_state().await;
        let ids: Vec<String> = state.open_orders.iter().map(|o| o.id.clone()).collect();
        assert_eq!(ids, first_ids);

        // Market drops through the bid at 1985
        paper
            .update_market_data(MarketData::from_top_of_book(dec!(1980), dec!(1981)))
            .await;
        engine.run_cycle().await;

        let state = paper.get_state().await;
        assert_eq!(state.position_amt, dec!(0.02));
        assert_eq!(state.open_orders.len(), 2);
        let sell = state
            .open_orders
            .iter()
            .find(|o| o.side == OrderSide::Sell)
            .unwrap();
        assert_eq!(sell.price, dec!(1995.35));

        let instance = engine.instance("alpha").unwrap();
        assert_eq!(instance.position_amt(), dec!(0.02));
        assert_eq!(instance.performance().fill_rate(), Some(dec!(0.25)));
        assert_eq!(
            engine.portfolio().get_strategy("alpha").unwrap().status,
            StrategyStatus::Live
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_raises_alert_and_skips() {
        let mut mock = mock_client();
        mock.expect_fetch_market_data()
            .returning(|| Err(ExchangeError::Decode("bad payload".into())));
        let mut engine = engine_with(mock);

        engine.run_cycle().await;

        let alert = engine.instance("alpha").unwrap().alert().unwrap();
        assert_eq!(alert.level, AlertLevel::Error);
        assert!(alert.suggestion.contains("Binance"));
    }

    #[tokio::test]
    async fn test_cancels_before_placing() {
        let mut mock = mock_client();
        expect_data(&mut mock, Decimal::ZERO);
        mock.expect_fetch_open_orders().returning(|| {
            Ok(vec![
                Order::new("stale-bid", OrderSide::Buy, dec!(1900), dec!(0.02)),
                Order::new("foreign", OrderSide::Sell, dec!(2100), dec!(1)),
            ])
        });

        let mut seq = Sequence::new();
        mock.expect_cancel_orders()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|ids| ids.len() == 1 && ids[0] == "stale-bid")
            .returning(|_| Ok(()));
        mock.expect_place_orders()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|requests| requests.len() == 2)
            .returning(accept_all);

        let mut engine = engine_with(mock);
        engine.instance_mut("alpha").unwrap().add_tracked_order("stale-bid");
        engine.run_cycle().await;

        let instance = engine.instance("alpha").unwrap();
        assert_eq!(instance.tracked_order_ids(), vec!["n0".to_string(), "n1".to_string()]);
        assert_eq!(instance.active_orders().len(), 2);
        assert!(instance.alert().is_none());
    }

    #[tokio::test]
    async fn test_rejection_becomes_alert() {
        let mut mock = mock_client();
        expect_data(&mut mock, Decimal::ZERO);
        mock.expect_fetch_open_orders().returning(|| Ok(Vec::new()));
        mock.expect_place_orders().returning(|requests| {
            Ok(PlaceOutcome {
                placed: Vec::new(),
                rejected: requests
                    .iter()
                    .map(|r| {
                        (
                            r.clone(),
                            ExchangeError::InsufficientFunds("Margin is insufficient.".into()),
                        )
                    })
                    .collect(),
            })
        });

        let mut engine = engine_with(mock);
        engine.run_cycle().await;

        let instance = engine.instance("alpha").unwrap();
        let alert = instance.alert().unwrap();
        assert_eq!(alert.kind, ErrorKind::InsufficientFunds);
        assert_eq!(alert.level, AlertLevel::Error);
        assert_eq!(instance.alert_history().count(), 2);
        assert!(instance.tracked_order_ids().is_empty());
    }

    #[tokio::test]
    async fn test_position_limit_suppresses_buy() {
        let mut mock = mock_client();
        expect_data(&mut mock, dec!(0.6));
        mock.expect_fetch_open_orders().returning(|| Ok(Vec::new()));
        mock.expect_place_orders()
            .times(1)
            .withf(|requests| requests.len() == 1 && requests[0].side == OrderSide::Sell)
            .returning(accept_all);

        let mut engine = engine_with(mock);
        engine.run_cycle().await;
        assert_eq!(engine.instance("alpha").unwrap().tracked_order_ids().len(), 1);
    }

    #[tokio::test]
    async fn test_switch_cancels_tracked_without_fetching_open_orders() {
        let mut mock = mock_client();
        expect_data(&mut mock, Decimal::ZERO);
        mock.expect_fetch_open_orders().never();
        mock.expect_cancel_orders()
            .times(1)
            .withf(|ids| ids.len() == 1 && ids[0] == "old")
            .returning(|_| Ok(()));
        mock.expect_place_orders().times(1).returning(accept_all);

        let mut engine = engine_with(mock);
        engine.instance_mut("alpha").unwrap().add_tracked_order("old");
        assert!(engine.switch_strategy("alpha", StrategyKind::FundingRate));
        assert!(!engine.switch_strategy("missing", StrategyKind::FundingRate));

        engine.run_cycle().await;

        let instance = engine.instance("alpha").unwrap();
        assert!(!instance.is_switched());
        assert_eq!(instance.kind(), StrategyKind::FundingRate);
        assert_eq!(instance.tracked_order_ids().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_instance_cancels_orders() {
        let mut mock = mock_client();
        mock.expect_cancel_orders()
            .times(1)
            .withf(|ids| ids.len() == 1 && ids[0] == "live-1")
            .returning(|_| Ok(()));

        let mut engine = engine_with(mock);
        engine.instance_mut("alpha").unwrap().add_tracked_order("live-1");

        assert!(engine.remove_instance("alpha").await);
        assert!(!engine.remove_instance("alpha").await);
        assert!(engine.portfolio().get_strategy("alpha").is_none());
        assert!(engine.instance("alpha").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_instance_rejected() {
        let paper = paper_exchange().await;
        let mut engine = TradingEngine::new(Config::default());
        assert!(engine.add_instance("alpha", StrategyKind::FixedSpread, paper.clone()));
        assert!(!engine.add_instance("alpha", StrategyKind::FundingRate, paper));
        assert_eq!(engine.instances().count(), 1);
    }

    #[tokio::test]
    async fn test_snapshots_follow_interval() {
        let paper = paper_exchange().await;
        let mut engine = TradingEngine::new(Config::default());
        engine.add_instance("alpha", StrategyKind::FixedSpread, paper);

        let t0 = Instant::now();
        engine.sync_portfolio(t0);
        assert_eq!(engine.portfolio().pnl_history().len(), 1);
        engine.sync_portfolio(t0 + Duration::from_secs(10));
        assert_eq!(engine.portfolio().pnl_history().len(), 1);
        engine.sync_portfolio(t0 + Duration::from_secs(61));
        assert_eq!(engine.portfolio().pnl_history().len(), 2);

        let instance = engine.instance("alpha").unwrap();
        assert_eq!(instance.pnl_samples().len(), 2);
        assert_eq!(
            engine.portfolio().get_strategy("alpha").unwrap().status,
            StrategyStatus::Paused
        );
    }

    #[tokio::test]
    async fn test_sync_marks_statuses_before_auto_rebalance() {
        let paper = paper_exchange().await;
        let mut config = Config::default();
        config.portfolio.auto_rebalance = true;
        let mut engine = TradingEngine::new(config);
        for id in ["a", "b", "c"] {
            engine.add_instance(id, StrategyKind::FixedSpread, paper.clone());
        }
        engine.start_instance("a");
        engine.start_instance("b");

        // "c" is stopped but the portfolio still lists it as live
        engine.portfolio_mut().set_strategy_status("c", StrategyStatus::Live);
        engine.portfolio_mut().set_strategy_allocation("c", dec!(0.6));
        let held = engine.portfolio().get_strategy("c").unwrap().allocation;
        assert_ne!(held, Decimal::ONE / dec!(3));

        engine.sync_portfolio(Instant::now());

        let portfolio = engine.portfolio();
        let c = portfolio.get_strategy("c").unwrap();
        assert_eq!(c.status, StrategyStatus::Paused);
        assert_eq!(c.allocation, held);
        assert_eq!(portfolio.get_strategy("a").unwrap().status, StrategyStatus::Live);
        assert_eq!(portfolio.get_strategy("b").unwrap().status, StrategyStatus::Live);
        assert_eq!(
            portfolio.get_strategy("a").unwrap().allocation,
            portfolio.get_strategy("b").unwrap().allocation
        );
    }

    #[tokio::test]
    async fn test_risk_snapshot_from_cached_data() {
        let mut mock = mock_client();
        expect_data(&mut mock, dec!(0.25));
        let mut engine = engine_with(mock);

        assert!(engine.risk_snapshot("alpha").is_none());
        engine.instance_mut("alpha").unwrap().refresh_data().await.unwrap();

        let snapshot = engine.risk_snapshot("alpha").unwrap();
        assert_eq!(snapshot.liquidation_buffer, Some(dec!(20)));
        assert_eq!(snapshot.inventory_drift, dec!(50));
        assert!(engine.risk_snapshot("missing").is_none());
    }

    #[tokio::test]
    async fn test_run_stops_after_max_cycles_and_cancels() {
        let paper = paper_exchange().await;
        let mut engine = TradingEngine::new(Config::default());
        engine.add_instance("alpha", StrategyKind::FundingRate, paper.clone());
        engine.start_all();

        engine.run(Some(1)).await;

        assert_eq!(engine.cycle_count(), 1);
        assert!(paper.get_state().await.open_orders.is_empty());
        assert!(!engine.instance("alpha").unwrap().is_running());

        let status = engine.status();
        assert_eq!(status.instances.len(), 1);
        assert_eq!(status.portfolio.total_count, 1);
    }
}
