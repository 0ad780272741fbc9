//! Thread-safe primitives for the live path: shared quote and order boards,
//! a cancellable price feed, and a minute-aligned tick clock.
//!
//! Feed threads write quotes into the [`PriceBoard`]; the strategy timer
//! thread reads them and keeps its positions on the [`OrderBoard`].

mod clock;
mod feed;

pub use clock::TickClock;
pub use feed::{subscribe, Feed, PriceTick, Subscription};

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::Order;

/// Latest quote and prior session close per symbol.
#[derive(Debug, Default)]
pub struct PriceBoard {
    inner: RwLock<PriceBoardState>,
}

#[derive(Debug, Default)]
struct PriceBoardState {
    last: HashMap<String, f64>,
    close: HashMap<String, f64>,
}

impl PriceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        let mut state = self.inner.write().expect("price board poisoned");
        state.last.insert(symbol.to_string(), price);
    }

    pub fn set_close(&self, symbol: &str, price: f64) {
        let mut state = self.inner.write().expect("price board poisoned");
        state.close.insert(symbol.to_string(), price);
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.inner
            .read()
            .expect("price board poisoned")
            .last
            .get(symbol)
            .copied()
    }

    /// Percentage change since the prior close, rounded to two decimals.
    pub fn change(&self, symbol: &str) -> Option<f64> {
        let state = self.inner.read().expect("price board poisoned");
        let last = state.last.get(symbol)?;
        let close = state.close.get(symbol)?;
        let raw = (last - close) * 100.0 / close;
        Some((raw * 100.0).round() / 100.0)
    }

    pub fn symbols(&self) -> Vec<String> {
        self.inner
            .read()
            .expect("price board poisoned")
            .last
            .keys()
            .cloned()
            .collect()
    }
}

/// Open orders shared between the strategy thread and order-status
/// callbacks, one per symbol.
#[derive(Debug, Default)]
pub struct OrderBoard {
    inner: RwLock<HashMap<String, Order>>,
}

impl OrderBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, order: Order) {
        let mut orders = self.inner.write().expect("order board poisoned");
        orders.insert(order.symbol.clone(), order);
    }

    pub fn get(&self, symbol: &str) -> Option<Order> {
        self.inner
            .read()
            .expect("order board poisoned")
            .get(symbol)
            .cloned()
    }

    pub fn remove(&self, symbol: &str) -> Option<Order> {
        self.inner
            .write()
            .expect("order board poisoned")
            .remove(symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().expect("order board poisoned").is_empty()
    }
}
