//! Unrealized-loss stop across both legs of the pair.

use tracing::debug;

use crate::context::{TradingContext, TradingError};
use crate::criteria::{Criterion, CriterionError};

/// Met when the combined unrealized P&L across all symbols has fallen to or
/// below `threshold` (a negative number, e.g. `-2000.0`).
///
/// Fails closed: a missing order or missing price means the position cannot
/// be valued, so the stop does not trigger.
pub struct DefaultStopLoss {
    symbols: Vec<String>,
    threshold: f64,
}

impl DefaultStopLoss {
    pub fn new(symbols: impl IntoIterator<Item = impl Into<String>>, threshold: f64) -> Self {
        assert!(threshold < 0.0, "stop-loss threshold must be negative");
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            threshold,
        }
    }
}

impl Criterion for DefaultStopLoss {
    fn name(&self) -> &str {
        "default stop loss"
    }

    fn is_met(&mut self, ctx: &dyn TradingContext) -> Result<bool, CriterionError> {
        let mut total = 0.0;
        for symbol in &self.symbols {
            let order = match ctx.last_order(symbol) {
                Ok(order) => order,
                Err(TradingError::NoOrderAvailable { .. }) => return Ok(false),
                Err(err) => return Err(err.into()),
            };
            let price = match ctx.last_price(symbol) {
                Ok(price) => price,
                Err(TradingError::PriceNotAvailable { .. }) => return Ok(false),
                Err(err) => return Err(err.into()),
            };
            total += order.unrealized_pl(price);
        }
        if total <= self.threshold {
            debug!(total, threshold = self.threshold, "stop loss triggered");
            return Ok(true);
        }
        Ok(false)
    }
}
