//! Configuration management for the market-making bot.
//!
//! Loads settings from `.env`, an optional `config.*` file, and environment
//! variables prefixed `ALPHALOOP` (nested keys separated by `__`, e.g.
//! `ALPHALOOP__TRADING__SPREAD=0.02`).

use crate::strategy::StrategyKind;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Exchange API credentials
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Symbol and quoting parameters
    #[serde(default)]
    pub trading: TradingConfig,
    /// Position and spread limits
    #[serde(default)]
    pub risk: RiskConfig,
    /// Capital and allocation settings
    #[serde(default)]
    pub portfolio: PortfolioConfig,
    /// Polling loop and paper-trading settings
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// API key for authentication
    #[serde(default)]
    pub api_key: String,
    /// Secret key for signing requests
    #[serde(default)]
    pub secret_key: String,
    /// Use testnet instead of production
    #[serde(default)]
    pub testnet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Strategy used by the first instance
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Order quantity in base asset
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
    /// Total quoted spread as a fraction of mid (0.015 = 1.5%)
    #[serde(default = "default_spread")]
    pub spread: Decimal,
    #[serde(default = "default_leverage")]
    pub leverage: u8,
    /// Funding-rate skew multiplier
    #[serde(default = "default_skew_factor")]
    pub skew_factor: Decimal,
    #[serde(default = "default_tick_size")]
    pub tick_size: Decimal,
    #[serde(default = "default_step_size")]
    pub step_size: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Absolute position size beyond which one side stops quoting
    #[serde(default = "default_max_position")]
    pub max_position: Decimal,
    #[serde(default = "default_min_spread")]
    pub min_spread: Decimal,
    #[serde(default = "default_max_spread")]
    pub max_spread: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Total capital in USDT
    #[serde(default = "default_total_capital")]
    pub total_capital: Decimal,
    #[serde(default = "default_min_allocation")]
    pub min_allocation: Decimal,
    #[serde(default = "default_max_allocation")]
    pub max_allocation: Decimal,
    /// Rebalance (composite) on every metrics update
    #[serde(default)]
    pub auto_rebalance: bool,
    /// Seconds between portfolio PnL snapshots; also sets Sharpe annualization
    #[serde(default = "default_pnl_snapshot_interval")]
    pub pnl_snapshot_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// Price difference below which a resting order is kept
    #[serde(default = "default_price_tolerance")]
    pub price_tolerance: Decimal,
    #[serde(default = "default_paper_fee_rate")]
    pub paper_fee_rate: Decimal,
    #[serde(default = "default_paper_balance")]
    pub paper_balance: Decimal,
}

// Default value functions
fn default_symbol() -> String {
    "ETHUSDT".to_string()
}

fn default_quantity() -> Decimal {
    Decimal::new(2, 2) // 0.02
}

fn default_spread() -> Decimal {
    Decimal::new(15, 3) // 0.015
}

fn default_leverage() -> u8 {
    5
}

fn default_skew_factor() -> Decimal {
    Decimal::new(100, 0)
}

fn default_tick_size() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_step_size() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

fn default_max_position() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

fn default_min_spread() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

fn default_max_spread() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_total_capital() -> Decimal {
    Decimal::new(10_000, 0)
}

fn default_min_allocation() -> Decimal {
    Decimal::new(1, 1) // 0.1
}

fn default_max_allocation() -> Decimal {
    Decimal::new(7, 1) // 0.7
}

fn default_pnl_snapshot_interval() -> u64 {
    60
}

fn default_refresh_interval() -> u64 {
    2
}

fn default_price_tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_paper_fee_rate() -> Decimal {
    Decimal::new(4, 4) // 0.0004
}

fn default_paper_balance() -> Decimal {
    Decimal::new(10_000, 0)
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .prefix("ALPHALOOP"),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.trading.symbol.is_empty(), "symbol must not be empty");

        anyhow::ensure!(
            self.trading.quantity > Decimal::ZERO,
            "quantity must be positive"
        );

        anyhow::ensure!(
            self.risk.min_spread > Decimal::ZERO && self.risk.min_spread <= self.risk.max_spread,
            "min_spread must be positive and <= max_spread"
        );

        anyhow::ensure!(
            self.trading.spread >= self.risk.min_spread
                && self.trading.spread <= self.risk.max_spread,
            "spread {} must be within [{}, {}]",
            self.trading.spread,
            self.risk.min_spread,
            self.risk.max_spread
        );

        anyhow::ensure!(self.trading.leverage >= 1, "leverage must be >= 1");

        anyhow::ensure!(
            self.risk.max_position > Decimal::ZERO,
            "max_position must be positive"
        );

        anyhow::ensure!(
            self.portfolio.min_allocation >= Decimal::ZERO
                && self.portfolio.min_allocation <= self.portfolio.max_allocation
                && self.portfolio.max_allocation <= Decimal::ONE,
            "allocations must satisfy 0 <= min_allocation <= max_allocation <= 1"
        );

        anyhow::ensure!(
            self.portfolio.pnl_snapshot_interval_secs > 0 && self.engine.refresh_interval_secs > 0,
            "intervals must be positive"
        );

        anyhow::ensure!(
            self.engine.price_tolerance >= Decimal::ZERO,
            "price_tolerance must not be negative"
        );

        Ok(())
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            strategy: StrategyKind::default(),
            quantity: default_quantity(),
            spread: default_spread(),
            leverage: default_leverage(),
            skew_factor: default_skew_factor(),
            tick_size: default_tick_size(),
            step_size: default_step_size(),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position: default_max_position(),
            min_spread: default_min_spread(),
            max_spread: default_max_spread(),
        }
    }
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            total_capital: default_total_capital(),
            min_allocation: default_min_allocation(),
            max_allocation: default_max_allocation(),
            auto_rebalance: false,
            pnl_snapshot_interval_secs: default_pnl_snapshot_interval(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            price_tolerance: default_price_tolerance(),
            paper_fee_rate: default_paper_fee_rate(),
            paper_balance: default_paper_balance(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trading.symbol, "ETHUSDT");
        assert_eq!(config.trading.strategy, StrategyKind::FixedSpread);
        assert_eq!(config.portfolio.pnl_snapshot_interval_secs, 60);
    }

    #[test]
    fn test_spread_outside_bounds_rejected() {
        let mut config = Config::default();
        config.trading.spread = dec!(0.2);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("spread"));
    }

    #[test]
    fn test_inverted_allocation_bounds_rejected() {
        let mut config = Config::default();
        config.portfolio.min_allocation = dec!(0.8);
        config.portfolio.max_allocation = dec!(0.2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let toml = r#"
            [trading]
            symbol = "BTCUSDT"
            strategy = "funding_rate"
            spread = "0.02"

            [portfolio]
            auto_rebalance = true
        "#;
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.trading.symbol, "BTCUSDT");
        assert_eq!(config.trading.strategy, StrategyKind::FundingRate);
        assert_eq!(config.trading.spread, dec!(0.02));
        assert_eq!(config.trading.quantity, dec!(0.02));
        assert!(config.portfolio.auto_rebalance);
        assert_eq!(config.risk.max_position, dec!(0.5));
        assert!(config.validate().is_ok());
    }
}
