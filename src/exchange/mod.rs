//! Exchange integrations for market making.
//!
//! ## Binance
//! USDⓈ-M futures REST access for:
//! - Top-of-book and funding rate
//! - Position, balance and open orders
//! - Limit order placement and cancellation
//!
//! ## Paper
//! In-memory simulator that fills resting quotes when the book touches them,
//! optionally fed by live public market data.

mod client;
mod error;
mod paper;
mod traits;
mod types;

pub use client::{normalize_symbol, BinanceClient};
pub use error::{ErrorKind, ExchangeError};
pub use paper::{PaperExchange, PaperState};
#[cfg(test)]
pub use traits::MockExchangeClient;
pub use traits::{ExchangeClient, Venue};
pub use types::*;
