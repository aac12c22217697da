//! Paper-trading exchange.
//!
//! Keeps resting orders, position and balance in memory. Market data is pulled
//! from an optional feed client (public endpoints only) or injected directly.
//! Resting quotes fill when the top of book touches them.

use super::error::ExchangeError;
use super::traits::{ExchangeClient, Venue};
use super::types::*;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Simulated account state.
#[derive(Debug, Clone)]
pub struct PaperState {
    pub initial_balance: Decimal,
    pub balance: Decimal,
    /// Signed position (positive = long)
    pub position_amt: Decimal,
    pub entry_price: Decimal,
    pub realized_pnl: Decimal,
    pub total_fees: Decimal,
    pub fill_count: u64,
    pub open_orders: Vec<Order>,
    pub market: Option<MarketData>,
    pub funding_rate: Decimal,
}

impl PaperState {
    fn new(initial_balance: Decimal) -> Self {
        Self {
            initial_balance,
            balance: initial_balance,
            position_amt: Decimal::ZERO,
            entry_price: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            total_fees: Decimal::ZERO,
            fill_count: 0,
            open_orders: Vec::new(),
            market: None,
            funding_rate: Decimal::ZERO,
        }
    }

    /// Margin locked by resting orders.
    fn reserved_margin(&self, leverage: Decimal) -> Decimal {
        self.open_orders
            .iter()
            .map(|o| o.price * o.quantity / leverage)
            .sum()
    }

    fn apply_fill(&mut self, side: OrderSide, price: Decimal, quantity: Decimal, fee_rate: Decimal) {
        let signed_qty = match side {
            OrderSide::Buy => quantity,
            OrderSide::Sell => -quantity,
        };
        let same_direction = self.position_amt.is_zero()
            || self.position_amt.is_sign_positive() == signed_qty.is_sign_positive();

        if same_direction {
            let held = self.position_amt.abs();
            self.entry_price = (held * self.entry_price + quantity * price) / (held + quantity);
            self.position_amt += signed_qty;
        } else {
            let closed = quantity.min(self.position_amt.abs());
            let direction = if self.position_amt.is_sign_positive() {
                Decimal::ONE
            } else {
                Decimal::NEGATIVE_ONE
            };
            let pnl = closed * (price - self.entry_price) * direction;
            self.realized_pnl += pnl;
            self.balance += pnl;
            self.position_amt += signed_qty;

            if self.position_amt.is_zero() {
                self.entry_price = Decimal::ZERO;
            } else if quantity > closed {
                // Flipped through zero; remainder opens at the fill price.
                self.entry_price = price;
            }
        }

        let fee = price * quantity * fee_rate;
        self.balance -= fee;
        self.total_fees += fee;
        self.fill_count += 1;
    }
}

/// In-memory exchange used when live trading is disabled.
pub struct PaperExchange {
    symbol: String,
    state: Arc<RwLock<PaperState>>,
    order_id_counter: AtomicU64,
    fee_rate: Decimal,
    leverage: Decimal,
    feed: Option<Arc<dyn ExchangeClient>>,
}

impl PaperExchange {
    /// Create a paper exchange with the given starting balance.
    pub fn new(symbol: &str, initial_balance: Decimal, fee_rate: Decimal, leverage: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            state: Arc::new(RwLock::new(PaperState::new(initial_balance))),
            order_id_counter: AtomicU64::new(1),
            fee_rate,
            leverage: Decimal::from(leverage.max(1)),
            feed: None,
        }
    }

    /// Pull market data and funding from another client.
    pub fn with_feed(mut self, feed: Arc<dyn ExchangeClient>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Inject a top-of-book update and fill any touched orders.
    pub async fn update_market_data(&self, market: MarketData) {
        let mut state = self.state.write().await;
        self.match_orders(&mut state, &market);
        state.market = Some(market);
    }

    pub async fn set_funding_rate(&self, rate: Decimal) {
        self.state.write().await.funding_rate = rate;
    }

    /// Copy of the current simulated state.
    pub async fn get_state(&self) -> PaperState {
        self.state.read().await.clone()
    }

    fn next_order_id(&self) -> u64 {
        self.order_id_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Approximate isolated-margin liquidation price.
    fn liquidation_price(&self, position_amt: Decimal, entry_price: Decimal) -> Decimal {
        if position_amt.is_zero() || entry_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let move_to_liq = Decimal::ONE / self.leverage;
        if position_amt > Decimal::ZERO {
            entry_price * (Decimal::ONE - move_to_liq)
        } else {
            entry_price * (Decimal::ONE + move_to_liq)
        }
    }

    fn match_orders(&self, state: &mut PaperState, market: &MarketData) {
        let (filled, resting): (Vec<Order>, Vec<Order>) =
            std::mem::take(&mut state.open_orders)
                .into_iter()
                .partition(|o| match o.side {
                    OrderSide::Buy => o.price >= market.best_bid,
                    OrderSide::Sell => o.price <= market.best_ask,
                });
        state.open_orders = resting;

        for order in filled {
            state.apply_fill(order.side, order.price, order.quantity, self.fee_rate);
            info!(
                order_id = %order.id,
                side = %order.side,
                price = %order.price,
                quantity = %order.quantity,
                position = %state.position_amt,
                balance = %state.balance,
                "Paper order filled"
            );
        }
    }
}

#[async_trait]
impl ExchangeClient for PaperExchange {
    fn venue(&self) -> Venue {
        Venue::Paper
    }

    fn symbol(&self) -> String {
        self.symbol.clone()
    }

    async fn fetch_market_data(&self) -> Result<MarketData, ExchangeError> {
        if let Some(feed) = &self.feed {
            let market = feed.fetch_market_data().await?;
            self.update_market_data(market.clone()).await;
            return Ok(market);
        }

        self.state
            .read()
            .await
            .market
            .clone()
            .ok_or_else(|| ExchangeError::NoMarketData(self.symbol.clone()))
    }

    async fn fetch_funding_rate(&self) -> Result<Decimal, ExchangeError> {
        if let Some(feed) = &self.feed {
            let rate = feed.fetch_funding_rate().await?;
            self.set_funding_rate(rate).await;
            return Ok(rate);
        }
        Ok(self.state.read().await.funding_rate)
    }

    async fn fetch_account_data(&self) -> Result<AccountData, ExchangeError> {
        let state = self.state.read().await;
        let mark = state.market.as_ref().map(|m| m.mid_price);
        let unrealized_pnl = match mark {
            Some(mid) if !state.position_amt.is_zero() => {
                state.position_amt * (mid - state.entry_price)
            }
            _ => Decimal::ZERO,
        };

        Ok(AccountData {
            position_amt: state.position_amt,
            entry_price: state.entry_price,
            balance: state.balance,
            liquidation_price: self.liquidation_price(state.position_amt, state.entry_price),
            unrealized_pnl,
        })
    }

    async fn fetch_open_orders(&self) -> Result<Vec<Order>, ExchangeError> {
        Ok(self.state.read().await.open_orders.clone())
    }

    async fn place_orders(&self, orders: &[OrderRequest]) -> Result<PlaceOutcome, ExchangeError> {
        let mut state = self.state.write().await;
        let mut outcome = PlaceOutcome::default();

        for request in orders {
            if request.price <= Decimal::ZERO || request.quantity <= Decimal::ZERO {
                outcome.rejected.push((
                    request.clone(),
                    ExchangeError::InvalidOrder(format!(
                        "price {} / quantity {} must be positive",
                        request.price, request.quantity
                    )),
                ));
                continue;
            }

            let required = request.price * request.quantity / self.leverage;
            let available = state.balance - state.reserved_margin(self.leverage);
            if required > available {
                outcome.rejected.push((
                    request.clone(),
                    ExchangeError::InsufficientFunds(format!(
                        "margin {} exceeds available {}",
                        required.round_dp(4),
                        available.round_dp(4)
                    )),
                ));
                continue;
            }

            let order = Order::new(
                format!("paper-{}", self.next_order_id()),
                request.side,
                request.price,
                request.quantity,
            );
            debug!(order_id = %order.id, side = %order.side, price = %order.price, "Paper order resting");
            state.open_orders.push(order.clone());
            outcome.placed.push(order);
        }

        Ok(outcome)
    }

    async fn cancel_orders(&self, order_ids: &[String]) -> Result<(), ExchangeError> {
        let mut state = self.state.write().await;
        let before = state.open_orders.len();
        state.open_orders.retain(|o| !order_ids.contains(&o.id));
        debug!(
            requested = order_ids.len(),
            cancelled = before - state.open_orders.len(),
            "Paper orders cancelled"
        );
        Ok(())
    }
}

impl Default for PaperExchange {
    fn default() -> Self {
        Self::new("ETHUSDT", dec!(10000), dec!(0.0004), 5)
    }
}
