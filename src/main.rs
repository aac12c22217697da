//! AlphaLoop - Main Entry Point
//!
//! Paper trading by default; pass `--live` (or set `LIVE_TRADING=true`) to
//! quote on Binance with real funds.

use alphaloop::config::Config;
use alphaloop::engine::TradingEngine;
use alphaloop::exchange::{BinanceClient, ExchangeClient, PaperExchange};
use alphaloop::portfolio::{calculate_strategy_health, HealthMetrics, HealthStatus};
use alphaloop::risk::{RiskIndicators, RiskInputs};
use alphaloop::strategy::StrategyKind;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// AlphaLoop CLI
#[derive(Parser)]
#[command(name = "alphaloop")]
#[command(version, about = "Perpetual futures market making with portfolio allocation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the market-making loop (default)
    Run {
        /// Trade with real funds instead of the paper simulator
        #[arg(long)]
        live: bool,

        /// Stop after this many cycles
        #[arg(short, long)]
        cycles: Option<u64>,

        /// Strategy for the default instance (fixed_spread, funding_rate)
        #[arg(short, long)]
        strategy: Option<String>,
    },

    /// Compute risk indicators for a position and print them as JSON
    Risk {
        /// Current mark/mid price
        #[arg(long)]
        price: Decimal,

        /// Liquidation price (0 for none)
        #[arg(long, default_value = "0")]
        liquidation: Decimal,

        /// Signed position size
        #[arg(long, default_value = "0")]
        position: Decimal,

        /// Position limit used for inventory drift
        #[arg(long)]
        max_position: Option<Decimal>,

        /// Comma-separated PnL history for drawdown
        #[arg(long, value_delimiter = ',')]
        pnl: Vec<Decimal>,
    },

    /// Score strategy health from its metrics
    Health {
        #[arg(long)]
        pnl: Option<Decimal>,

        #[arg(long)]
        sharpe: Option<Decimal>,

        /// Fraction 0-1
        #[arg(long)]
        fill_rate: Option<Decimal>,

        /// Basis points
        #[arg(long)]
        slippage: Option<Decimal>,

        /// Fraction 0-1
        #[arg(long)]
        max_drawdown: Option<Decimal>,
    },
}

/// Trading mode: Live (real money) or Paper.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TradingMode {
    Live,
    Paper,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Risk {
            price,
            liquidation,
            position,
            max_position,
            pnl,
        }) => show_risk(price, liquidation, position, max_position, &pnl),
        Some(Commands::Health {
            pnl,
            sharpe,
            fill_rate,
            slippage,
            max_drawdown,
        }) => {
            show_health(HealthMetrics {
                pnl,
                sharpe,
                fill_rate,
                slippage,
                max_drawdown,
            });
            Ok(())
        }
        Some(Commands::Run {
            live,
            cycles,
            strategy,
        }) => run_trading(live, cycles, strategy.as_deref()).await,
        None => run_trading(false, None, None).await,
    }
}

async fn run_trading(live: bool, cycles: Option<u64>, strategy: Option<&str>) -> Result<()> {
    init_logging()?;

    info!("AlphaLoop v{} starting", env!("CARGO_PKG_VERSION"));

    let trading_mode = if live || std::env::var("LIVE_TRADING").unwrap_or_default() == "true" {
        warn!("LIVE TRADING MODE - Real money at risk!");
        TradingMode::Live
    } else {
        info!("PAPER TRADING MODE - orders are simulated");
        TradingMode::Paper
    };

    let config = Config::load()?;
    config.validate().context("Invalid configuration")?;
    log_config(&config);

    let kind = match strategy {
        Some(name) => name.parse::<StrategyKind>()?,
        None => config.trading.strategy,
    };

    let binance = BinanceClient::new(&config.exchange, &config.trading.symbol)?;

    let exchange: Arc<dyn ExchangeClient> = match trading_mode {
        TradingMode::Live => {
            anyhow::ensure!(
                binance.has_credentials(),
                "Live trading requires exchange.api_key and exchange.secret_key"
            );
            if let Err(e) = binance.set_leverage(config.trading.leverage).await {
                warn!(error = %e, leverage = config.trading.leverage, "Failed to set leverage");
            }
            Arc::new(binance)
        }
        TradingMode::Paper => {
            let symbol = binance.symbol();
            Arc::new(
                PaperExchange::new(
                    &symbol,
                    config.engine.paper_balance,
                    config.engine.paper_fee_rate,
                    config.trading.leverage,
                )
                .with_feed(Arc::new(binance)),
            )
        }
    };

    let mut engine = TradingEngine::new(config);
    engine.add_instance("default", kind, exchange);
    engine.start_all();
    engine.run(cycles).await;

    let status = engine.status();
    info!(
        "Final status: {}",
        serde_json::to_string(&status).context("Failed to serialize status")?
    );
    Ok(())
}

fn show_risk(
    price: Decimal,
    liquidation: Decimal,
    position: Decimal,
    max_position: Option<Decimal>,
    pnl: &[Decimal],
) -> Result<()> {
    let max_position = match max_position {
        Some(value) => value,
        None => Config::load()?.risk.max_position,
    };

    let snapshot = RiskIndicators::from_exchange_data(
        &RiskInputs {
            current_price: price,
            position_amt: position,
            liquidation_price: liquidation,
            max_position,
            position_side: None,
        },
        pnl,
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn show_health(metrics: HealthMetrics) {
    let score = calculate_strategy_health(&metrics);
    let status = HealthStatus::from_score(score);
    println!("Health score: {}", score);
    println!("Status:       {}", status.as_str());
    println!("Color:        {}", status.color());
}

/// Initialize logging to stdout and an hourly rolling file.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "alphaloop.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer alive for the program duration
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("alphaloop=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    Ok(())
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    info!(
        symbol = %config.trading.symbol,
        strategy = %config.trading.strategy,
        spread = %config.trading.spread,
        quantity = %config.trading.quantity,
        leverage = config.trading.leverage,
        "Trading configuration"
    );
    info!(
        max_position = %config.risk.max_position,
        min_spread = %config.risk.min_spread,
        max_spread = %config.risk.max_spread,
        "Risk limits"
    );
    info!(
        total_capital = %config.portfolio.total_capital,
        min_allocation = %config.portfolio.min_allocation,
        max_allocation = %config.portfolio.max_allocation,
        auto_rebalance = config.portfolio.auto_rebalance,
        "Portfolio"
    );
    info!(
        refresh_secs = config.engine.refresh_interval_secs,
        price_tolerance = %config.engine.price_tolerance,
        testnet = config.exchange.testnet,
        "Engine"
    );
}
