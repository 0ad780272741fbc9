//! Position-shape criteria: gate entries and exits on which legs are open.

use crate::context::{TradingContext, TradingError};
use crate::criteria::{Criterion, CriterionError};

/// Met when none of the symbols has an open order. The usual entry gate.
pub struct NoOpenOrders {
    symbols: Vec<String>,
}

impl NoOpenOrders {
    pub fn new(symbols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

impl Criterion for NoOpenOrders {
    fn name(&self) -> &str {
        "no open orders"
    }

    fn is_met(&mut self, ctx: &dyn TradingContext) -> Result<bool, CriterionError> {
        for symbol in &self.symbols {
            match ctx.last_order(symbol) {
                Ok(_) => return Ok(false),
                Err(TradingError::NoOrderAvailable { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(true)
    }
}

/// Met when every symbol has an open, filled order. The usual exit gate for
/// a fully established pair.
pub struct AllOrdersOpen {
    symbols: Vec<String>,
}

impl AllOrdersOpen {
    pub fn new(symbols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

impl Criterion for AllOrdersOpen {
    fn name(&self) -> &str {
        "all orders open"
    }

    fn is_met(&mut self, ctx: &dyn TradingContext) -> Result<bool, CriterionError> {
        for symbol in &self.symbols {
            match ctx.last_order(symbol) {
                Ok(order) => {
                    if !ctx.is_order_filled(&order) {
                        return Ok(false);
                    }
                }
                Err(TradingError::NoOrderAvailable { .. }) => return Ok(false),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(true)
    }
}

/// Met when no symbol has an order awaiting a fill.
pub struct NoPendingOrders {
    symbols: Vec<String>,
}

impl NoPendingOrders {
    pub fn new(symbols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

impl Criterion for NoPendingOrders {
    fn name(&self) -> &str {
        "no pending orders"
    }

    fn is_met(&mut self, ctx: &dyn TradingContext) -> Result<bool, CriterionError> {
        for symbol in &self.symbols {
            match ctx.last_order(symbol) {
                Ok(order) => {
                    if !ctx.is_order_filled(&order) {
                        return Ok(false);
                    }
                }
                Err(TradingError::NoOrderAvailable { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(true)
    }
}
