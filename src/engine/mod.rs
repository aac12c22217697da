//! Polling loop that drives every strategy instance.
//!
//! Each cycle refreshes exchange data, reconciles quotes per instance, then
//! pushes the results into the portfolio manager.

mod trading;

pub use trading::{EngineStatus, TradingEngine};
