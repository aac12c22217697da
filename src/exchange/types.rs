//! Order, market and account records shared by every venue, plus the
//! Binance USDⓈ-M futures wire types they are decoded from.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Binance wire representation.
    pub fn as_binance(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// A resting order on the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub side: OrderSide,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
}

impl Order {
    pub fn new(id: impl Into<String>, side: OrderSide, price: Decimal, quantity: Decimal) -> Self {
        Self {
            id: id.into(),
            side,
            price,
            quantity,
        }
    }
}

/// A quote a strategy wants resting on the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub side: OrderSide,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
}

impl OrderRequest {
    pub fn new(side: OrderSide, price: Decimal, quantity: Decimal) -> Self {
        Self {
            side,
            price,
            quantity,
        }
    }
}

/// Top-of-book snapshot used for quoting.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarketData {
    pub best_bid: Decimal,
    pub best_ask: Decimal,
    pub mid_price: Decimal,
    /// Venue tick size when known
    pub tick_size: Option<Decimal>,
    /// Venue lot step when known
    pub step_size: Option<Decimal>,
}

impl MarketData {
    /// Build from best bid/ask, deriving the mid price.
    pub fn from_top_of_book(best_bid: Decimal, best_ask: Decimal) -> Self {
        Self {
            best_bid,
            best_ask,
            mid_price: (best_bid + best_ask) / Decimal::TWO,
            tick_size: None,
            step_size: None,
        }
    }
}

/// Position and balance state for the traded symbol.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccountData {
    /// Signed position (positive = long)
    pub position_amt: Decimal,
    pub entry_price: Decimal,
    pub balance: Decimal,
    /// Zero when there is no position
    pub liquidation_price: Decimal,
    pub unrealized_pnl: Decimal,
}

/// Result of a batch placement: venues accept some orders and reject others.
#[derive(Debug, Default)]
pub struct PlaceOutcome {
    pub placed: Vec<Order>,
    pub rejected: Vec<(OrderRequest, super::ExchangeError)>,
}

// ==================== Binance Wire Types ====================

/// Best bid/ask prices and quantities.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTicker {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub bid_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub bid_qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub ask_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub ask_qty: Decimal,
}

/// Mark price and funding information for a perpetual contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumIndex {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub mark_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub last_funding_rate: Decimal,
    pub next_funding_time: i64,
}

/// Account balance information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub asset: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub available_balance: Decimal,
}

/// Futures position information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRisk {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub position_amt: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub entry_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub mark_price: Decimal,
    #[serde(rename = "unRealizedProfit", with = "rust_decimal::serde::str")]
    pub unrealized_profit: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub liquidation_price: Decimal,
}

/// Binance order side on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WireSide {
    Buy,
    Sell,
}

impl From<WireSide> for OrderSide {
    fn from(side: WireSide) -> Self {
        match side {
            WireSide::Buy => OrderSide::Buy,
            WireSide::Sell => OrderSide::Sell,
        }
    }
}

/// Order as returned by openOrders and order placement.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: i64,
    pub symbol: String,
    pub status: String,
    pub side: WireSide,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub orig_qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub executed_qty: Decimal,
}

impl From<OrderResponse> for Order {
    fn from(resp: OrderResponse) -> Self {
        Order {
            id: resp.order_id.to_string(),
            side: resp.side.into(),
            price: resp.price,
            quantity: resp.orig_qty - resp.executed_qty,
        }
    }
}

/// Error payload returned by Binance on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}
