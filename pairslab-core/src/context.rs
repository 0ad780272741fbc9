//! The trading context: everything a strategy may observe or do, behind one
//! trait so the same strategy code drives both the simulator and a brokerage
//! connection.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::Order;
use crate::series::DoubleSeries;

/// Failures surfaced by context operations.
#[derive(Debug, Error)]
pub enum TradingError {
    /// No quote for the symbol at the current instant.
    #[error("no price available for {symbol}")]
    PriceNotAvailable { symbol: String },

    /// No open order exists for the symbol.
    #[error("no order available for {symbol}")]
    NoOrderAvailable { symbol: String },

    /// The symbol is not among the context's registered contracts.
    #[error("unknown contract {symbol}")]
    UnknownContract { symbol: String },

    /// The operation is not supported by this context implementation.
    #[error("operation not supported by this context")]
    Unsupported,
}

/// Market access and account state for a running strategy.
///
/// Read methods take `&self`; anything that changes positions or the
/// contract set takes `&mut self`. Implementations that cannot provide an
/// optional capability keep the defaulted `Unsupported` behavior.
pub trait TradingContext {
    /// The current instant: the tick timestamp in a simulation, wall clock
    /// when live.
    fn time(&self) -> DateTime<Utc>;

    /// Symbols the context is tracking.
    fn contracts(&self) -> Vec<String>;

    /// Funds not committed as margin.
    fn available_funds(&self) -> f64;

    /// Account liquidation value: funds plus open-position mark-to-market.
    fn net_value(&self) -> f64;

    /// Account leverage factor.
    fn leverage(&self) -> f64;

    /// Latest known price for the symbol.
    fn last_price(&self, symbol: &str) -> Result<f64, TradingError>;

    /// Full known price history for the symbol, newest first.
    fn history(&self, _symbol: &str) -> Result<DoubleSeries, TradingError> {
        Err(TradingError::Unsupported)
    }

    /// Daily close history for the symbol, newest first.
    fn history_in_days(&self, _symbol: &str, _days: u32) -> Result<DoubleSeries, TradingError> {
        Err(TradingError::Unsupported)
    }

    /// Minute-bar history for the symbol, newest first.
    fn history_in_minutes(
        &self,
        _symbol: &str,
        _minutes: u32,
    ) -> Result<DoubleSeries, TradingError> {
        Err(TradingError::Unsupported)
    }

    /// Percentage change of the symbol since the previous session close.
    fn change_by_symbol(&self, _symbol: &str) -> Result<f64, TradingError> {
        Err(TradingError::Unsupported)
    }

    /// Start tracking a symbol.
    fn add_contract(&mut self, symbol: &str) -> Result<(), TradingError>;

    /// Stop tracking a symbol.
    fn remove_contract(&mut self, symbol: &str) -> Result<(), TradingError>;

    /// Submit a market order and return it. `buy` sets the direction;
    /// `amount` is the unsigned quantity.
    fn place_order(&mut self, symbol: &str, buy: bool, amount: f64)
        -> Result<Order, TradingError>;

    /// Close out an open order at the current price.
    fn close_order(&mut self, order: &Order) -> Result<(), TradingError>;

    /// The most recent open order for the symbol.
    fn last_order(&self, symbol: &str) -> Result<Order, TradingError>;

    /// Whether the order has been filled. Simulated fills are immediate.
    fn is_order_filled(&self, _order: &Order) -> bool {
        true
    }
}
