//! End-to-end scenarios through the public API.

use alphaloop::config::Config;
use alphaloop::engine::TradingEngine;
use alphaloop::exchange::{MarketData, Order, OrderRequest, OrderSide, PaperExchange};
use alphaloop::orders::OrderManager;
use alphaloop::portfolio::{
    calculate_strategy_health, AllocationMethod, HealthMetrics, MetricsUpdate, PortfolioManager,
    StrategyStatus, DEFAULT_ALLOCATION, HEALTH_WEIGHTS,
};
use alphaloop::risk::{
    DrawdownStatus, DriftStatus, LiquidationStatus, PositionSide, RiskIndicators, RiskLevel,
};
use alphaloop::strategy::StrategyKind;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn allocation_sum(manager: &PortfolioManager) -> Decimal {
    manager.strategies().map(|s| s.allocation).sum()
}

fn assert_close(actual: Decimal, expected: Decimal) {
    assert!(
        (actual - expected).abs() < dec!(0.000001),
        "expected {} got {}",
        expected,
        actual
    );
}

#[test]
fn two_default_registrations_split_evenly() {
    let mut manager = PortfolioManager::new(dec!(10000));
    manager.register_strategy("mm-1", "Fixed Spread", DEFAULT_ALLOCATION, StrategyStatus::Live);
    manager.register_strategy("mm-2", "Funding Rate Skew", DEFAULT_ALLOCATION, StrategyStatus::Live);

    assert_eq!(manager.get_strategy("mm-1").unwrap().allocation, dec!(0.5));
    assert_eq!(manager.get_strategy("mm-2").unwrap().allocation, dec!(0.5));
    assert_eq!(manager.get_allocation_for_strategy("mm-1"), dec!(5000));
}

#[test]
fn health_worked_example_in_range() {
    let score = calculate_strategy_health(&HealthMetrics {
        pnl: Some(dec!(100)),
        sharpe: Some(dec!(2.0)),
        fill_rate: Some(dec!(0.85)),
        slippage: Some(dec!(2.0)),
        max_drawdown: Some(dec!(0.02)),
    });
    assert!(score >= Decimal::ZERO && score <= dec!(100));
    assert_eq!(score, dec!(65.4));

    let weights: Decimal = HEALTH_WEIGHTS.iter().map(|(_, w)| *w).sum();
    assert_eq!(weights, Decimal::ONE);
    assert!(calculate_strategy_health(&HealthMetrics::default()) <= dec!(100));
}

#[test]
fn drawdown_from_peak() {
    let dd = RiskIndicators::calculate_max_drawdown(&[
        dec!(0),
        dec!(100),
        dec!(150),
        dec!(120),
        dec!(180),
    ]);
    assert_eq!(dd, dec!(-20));
    assert_eq!(RiskIndicators::calculate_max_drawdown(&[dec!(5)]), Decimal::ZERO);
    assert_eq!(RiskIndicators::calculate_max_drawdown(&[]), Decimal::ZERO);
}

#[test]
fn deep_drawdown_makes_portfolio_high_risk() {
    let mut manager = PortfolioManager::new(dec!(10000));
    manager.register_strategy("steady", "Steady", DEFAULT_ALLOCATION, StrategyStatus::Live);
    manager.register_strategy("bleeding", "Bleeding", DEFAULT_ALLOCATION, StrategyStatus::Live);

    manager.update_strategy_metrics(
        "steady",
        MetricsUpdate {
            pnl: Some(dec!(5000)),
            sharpe: Some(dec!(3)),
            fill_rate: Some(dec!(1)),
            ..Default::default()
        },
    );
    manager.update_strategy_metrics(
        "bleeding",
        MetricsUpdate {
            max_drawdown: Some(dec!(0.15)),
            ..Default::default()
        },
    );

    assert_eq!(manager.get_risk_level(), RiskLevel::High);
}

#[test]
fn equal_and_unknown_rebalance_agree() {
    let build = || {
        let mut manager = PortfolioManager::new(dec!(10000));
        for id in ["a", "b", "c"] {
            manager.register_strategy(id, id, DEFAULT_ALLOCATION, StrategyStatus::Live);
        }
        manager.update_strategy_metrics(
            "a",
            MetricsUpdate {
                pnl: Some(dec!(900)),
                ..Default::default()
            },
        );
        manager
    };

    let mut equal = build();
    let result = equal.rebalance_allocations(AllocationMethod::Equal, None);
    assert_eq!(result.len(), 3);
    for fraction in result.values() {
        assert_close(*fraction, Decimal::ONE / dec!(3));
    }
    assert_close(allocation_sum(&equal), Decimal::ONE);

    let mut unknown = build();
    let fallback = unknown.rebalance_by_name("unknown_xyz", None);
    assert_eq!(fallback, result);
}

#[test]
fn reconciler_boundaries() {
    let manager = OrderManager::new();
    let target = OrderRequest::new(OrderSide::Buy, dec!(100), dec!(1));

    let plan = manager.sync_orders(&[], &[target.clone()]);
    assert!(plan.cancel_ids.is_empty());
    assert_eq!(plan.place, vec![target]);

    let resting = [Order::new("1", OrderSide::Buy, dec!(100), dec!(1))];
    let close = OrderRequest::new(OrderSide::Buy, dec!(100.005), dec!(1));
    assert!(manager.sync_orders(&resting, &[close]).is_empty());

    let moved = OrderRequest::new(OrderSide::Buy, dec!(101), dec!(1));
    let plan = manager.sync_orders(&resting, &[moved.clone()]);
    assert_eq!(plan.cancel_ids, vec!["1".to_string()]);
    assert_eq!(plan.place, vec![moved]);
}

#[test]
fn risk_indicator_properties() {
    for price in [dec!(0.5), dec!(100), dec!(64000)] {
        let buffer = RiskIndicators::calculate_liquidation_buffer(
            price,
            price * dec!(0.8),
            Some(PositionSide::Long),
        );
        assert_eq!(
            RiskIndicators::get_liquidation_buffer_status(buffer),
            Some(LiquidationStatus::Safe)
        );
    }

    for drift in [dec!(0), dec!(19.9), dec!(35), dec!(79), dec!(100)] {
        assert_eq!(
            RiskIndicators::get_inventory_drift_status(drift),
            RiskIndicators::get_inventory_drift_status(-drift)
        );
    }

    assert_eq!(
        RiskIndicators::calculate_overall_risk_level(
            Some(LiquidationStatus::Critical),
            DriftStatus::Balanced,
            DrawdownStatus::Excellent,
        ),
        RiskLevel::Critical
    );
}

#[tokio::test]
async fn paper_engine_quotes_and_reports() {
    let paper = Arc::new(PaperExchange::default());
    paper
        .update_market_data(MarketData::from_top_of_book(dec!(1999.9), dec!(2000.1)))
        .await;

    let mut engine = TradingEngine::new(Config::default());
    assert!(engine.add_instance("fixed", StrategyKind::FixedSpread, paper.clone()));
    assert!(engine.add_instance("skew", StrategyKind::FundingRate, paper.clone()));
    engine.start_instance("fixed");

    engine.run_cycle().await;

    // Only the running instance quotes
    let state = paper.get_state().await;
    assert_eq!(state.open_orders.len(), 2);

    let data = engine.portfolio().get_portfolio_data();
    assert_eq!(data.total_count, 2);
    assert_eq!(data.active_count, 1);
    assert_close(allocation_sum(engine.portfolio()), Decimal::ONE);

    let status = engine.status();
    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["instances"].as_array().unwrap().len(), 2);
    assert_eq!(json["portfolio"]["total_count"], 2);

    let risk = engine.risk_snapshot("fixed").unwrap();
    assert_eq!(risk.liquidation_buffer, None);
    assert_eq!(risk.overall_risk_level, RiskLevel::Low);
    assert!(engine.risk_snapshot("skew").is_none());
}
