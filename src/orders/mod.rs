//! Order reconciliation between target quotes and the live book.

mod manager;

pub use manager::{OrderManager, SyncPlan, DEFAULT_PRICE_TOLERANCE};
