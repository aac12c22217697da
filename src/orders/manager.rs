//! Quote reconciliation.
//!
//! Diffs the orders a strategy has resting on the book against the quotes it
//! wants, side by side, and emits the cancel/place actions that converge them.

use crate::exchange::{Order, OrderRequest, OrderSide};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

/// Absolute price difference below which a resting order is left alone.
pub const DEFAULT_PRICE_TOLERANCE: Decimal = dec!(0.01);

/// Actions needed to move the book toward the target quotes.
///
/// Callers must execute `cancel_ids` before `place`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub cancel_ids: Vec<String>,
    pub place: Vec<OrderRequest>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.cancel_ids.is_empty() && self.place.is_empty()
    }
}

/// Stateless order reconciler.
#[derive(Debug, Clone)]
pub struct OrderManager {
    price_tolerance: Decimal,
}

impl Default for OrderManager {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderManager {
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_PRICE_TOLERANCE)
    }

    pub fn with_tolerance(price_tolerance: Decimal) -> Self {
        Self {
            price_tolerance: price_tolerance.abs(),
        }
    }

    pub fn price_tolerance(&self) -> Decimal {
        self.price_tolerance
    }

    /// Compute the cancel/place diff between live orders and target quotes.
    ///
    /// Only the first order per side is considered on either input; extra
    /// same-side resting orders are not touched by this pass.
    pub fn sync_orders(&self, current: &[Order], targets: &[OrderRequest]) -> SyncPlan {
        let mut plan = SyncPlan::default();

        for side in [OrderSide::Buy, OrderSide::Sell] {
            let resting = first_on_side(current, side);
            let target = targets.iter().find(|t| t.side == side);

            let extra = current.iter().filter(|o| o.side == side).count();
            if extra > 1 {
                debug!(%side, count = extra, "Multiple resting orders on one side, reconciling the first");
            }

            match (resting, target) {
                (Some(order), Some(target)) => {
                    if (order.price - target.price).abs() > self.price_tolerance {
                        debug!(
                            %side,
                            order_id = %order.id,
                            from = %order.price,
                            to = %target.price,
                            "Requoting"
                        );
                        plan.cancel_ids.push(order.id.clone());
                        plan.place.push(target.clone());
                    }
                }
                (None, Some(target)) => plan.place.push(target.clone()),
                (Some(order), None) => plan.cancel_ids.push(order.id.clone()),
                (None, None) => {}
            }
        }

        plan
    }
}

fn first_on_side(orders: &[Order], side: OrderSide) -> Option<&Order> {
    orders.iter().find(|o| o.side == side)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resting(id: &str, side: OrderSide, price: Decimal) -> Order {
        Order::new(id, side, price, dec!(1))
    }

    fn target(side: OrderSide, price: Decimal) -> OrderRequest {
        OrderRequest::new(side, price, dec!(1))
    }

    #[test]
    fn test_places_target_when_book_empty() {
        let manager = OrderManager::new();
        let buy = target(OrderSide::Buy, dec!(100));
        let plan = manager.sync_orders(&[], &[buy.clone()]);

        assert!(plan.cancel_ids.is_empty());
        assert_eq!(plan.place, vec![buy]);
    }

    #[test]
    fn test_within_tolerance_keeps_order() {
        let manager = OrderManager::new();
        let plan = manager.sync_orders(
            &[resting("1", OrderSide::Buy, dec!(100))],
            &[target(OrderSide::Buy, dec!(100.005))],
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn test_exactly_at_tolerance_keeps_order() {
        let manager = OrderManager::new();
        let plan = manager.sync_orders(
            &[resting("1", OrderSide::Sell, dec!(100))],
            &[target(OrderSide::Sell, dec!(100.01))],
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn test_price_move_requotes() {
        let manager = OrderManager::new();
        let plan = manager.sync_orders(
            &[resting("1", OrderSide::Buy, dec!(100))],
            &[target(OrderSide::Buy, dec!(101))],
        );

        assert_eq!(plan.cancel_ids, vec!["1".to_string()]);
        assert_eq!(plan.place, vec![target(OrderSide::Buy, dec!(101))]);
    }

    #[test]
    fn test_missing_target_cancels() {
        let manager = OrderManager::new();
        let plan = manager.sync_orders(
            &[
                resting("b", OrderSide::Buy, dec!(99)),
                resting("s", OrderSide::Sell, dec!(101)),
            ],
            &[target(OrderSide::Sell, dec!(101))],
        );

        assert_eq!(plan.cancel_ids, vec!["b".to_string()]);
        assert!(plan.place.is_empty());
    }

    #[test]
    fn test_buy_side_actions_come_first() {
        let manager = OrderManager::new();
        let plan = manager.sync_orders(
            &[
                resting("s", OrderSide::Sell, dec!(105)),
                resting("b", OrderSide::Buy, dec!(95)),
            ],
            &[
                target(OrderSide::Sell, dec!(104)),
                target(OrderSide::Buy, dec!(96)),
            ],
        );

        assert_eq!(plan.cancel_ids, vec!["b".to_string(), "s".to_string()]);
        assert_eq!(plan.place[0].side, OrderSide::Buy);
        assert_eq!(plan.place[1].side, OrderSide::Sell);
    }

    #[test]
    fn test_only_first_order_per_side_is_reconciled() {
        let manager = OrderManager::new();
        let plan = manager.sync_orders(
            &[
                resting("b1", OrderSide::Buy, dec!(90)),
                resting("b2", OrderSide::Buy, dec!(91)),
            ],
            &[],
        );
        assert_eq!(plan.cancel_ids, vec!["b1".to_string()]);
    }

    #[test]
    fn test_custom_tolerance() {
        let manager = OrderManager::with_tolerance(dec!(0.5));
        let plan = manager.sync_orders(
            &[resting("1", OrderSide::Buy, dec!(100))],
            &[target(OrderSide::Buy, dec!(100.4))],
        );
        assert!(plan.is_empty());
        assert_eq!(manager.price_tolerance(), dec!(0.5));
    }

    #[test]
    fn test_nothing_to_do() {
        assert!(OrderManager::default().sync_orders(&[], &[]).is_empty());
    }
}
