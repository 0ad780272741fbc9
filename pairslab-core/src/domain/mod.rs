//! Core trading domain: instruments, open orders, and closed orders.
//!
//! Amounts are signed throughout: positive is long, negative is short. A
//! filled order's profit and loss is always `(price − open_price) · amount`
//! scaled by the instrument's contract multiplier, regardless of direction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of an order, derived from the sign of its amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

/// Instrument class, recognized from the symbol's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instrument {
    /// Currency pair, e.g. `EUR/USD`.
    Fx,
    /// Futures contract, e.g. `ES=F`.
    Future,
    /// Anything else: stocks and ETFs.
    Equity,
}

impl Instrument {
    /// Classify a symbol by its shape.
    pub fn of(symbol: &str) -> Self {
        if symbol.contains('/') {
            Instrument::Fx
        } else if symbol.ends_with("=F") {
            Instrument::Future
        } else {
            Instrument::Equity
        }
    }
}

/// Dollar value of one point of price movement for one contract.
pub fn contract_multiplier(symbol: &str) -> f64 {
    match symbol {
        "ES=F" => 50.0,
        "YM=F" => 5.0,
        "TF=F" => 50.0,
        _ => 1.0,
    }
}

/// A filled position in a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub symbol: String,
    pub open_instant: DateTime<Utc>,
    pub open_price: f64,
    /// Signed quantity: positive long, negative short.
    pub amount: f64,
}

impl Order {
    pub fn new(
        id: u64,
        symbol: impl Into<String>,
        open_instant: DateTime<Utc>,
        open_price: f64,
        amount: f64,
    ) -> Self {
        assert!(open_price > 0.0, "open price must be positive");
        assert!(amount != 0.0, "amount must be non-zero");
        Self {
            id,
            symbol: symbol.into(),
            open_instant,
            open_price,
            amount,
        }
    }

    pub fn is_long(&self) -> bool {
        self.amount > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.amount < 0.0
    }

    pub fn side(&self) -> Side {
        if self.is_long() {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    pub fn instrument(&self) -> Instrument {
        Instrument::of(&self.symbol)
    }

    /// Mark-to-market P&L at `price`, before commissions.
    pub fn unrealized_pl(&self, price: f64) -> f64 {
        (price - self.open_price) * self.amount * contract_multiplier(&self.symbol)
    }
}

/// An order that has been closed out, with its realized P&L.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedOrder {
    pub order: Order,
    pub close_instant: DateTime<Utc>,
    pub close_price: f64,
    /// Realized P&L, before commissions.
    pub pl: f64,
}

impl ClosedOrder {
    pub fn new(order: Order, close_instant: DateTime<Utc>, close_price: f64) -> Self {
        let pl = order.unrealized_pl(close_price);
        Self {
            order,
            close_instant,
            close_price,
            pl,
        }
    }
}
