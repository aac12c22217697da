//! # AlphaLoop
//!
//! A perpetual-futures market-making bot that runs several quoting strategies
//! side by side and allocates capital between them.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `exchange`: Binance REST client, paper-trading simulator and the shared client trait
//! - `orders`: Reconciliation of resting orders against target quotes
//! - `strategy`: Quoting strategies, performance tracking and strategy instances
//! - `risk`: Liquidation, inventory and drawdown indicators plus position limits
//! - `portfolio`: Strategy registry, health scoring and capital rebalancing
//! - `engine`: Polling loop tying the pieces together
//! - `utils`: Shared decimal helpers

pub mod config;
pub mod engine;
pub mod exchange;
pub mod orders;
pub mod portfolio;
pub mod risk;
pub mod strategy;
pub mod utils;

pub use config::Config;
pub use engine::TradingEngine;
