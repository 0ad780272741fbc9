//! Entry and exit criteria over the shared rolling z-score signal.

use std::sync::Arc;

use tracing::debug;

use crate::context::{TradingContext, TradingError};
use crate::criteria::{Criterion, CriterionError};
use crate::strategy::SharedZScore;

/// Met when the standardized spread has left its band and the resulting
/// position would be of meaningful size.
pub struct ZScoreEntry {
    signal: Arc<SharedZScore>,
    entry_z: f64,
}

impl ZScoreEntry {
    pub fn new(signal: Arc<SharedZScore>, entry_z: f64) -> Self {
        assert!(entry_z > 0.0, "entry threshold must be positive");
        Self { signal, entry_z }
    }
}

impl Criterion for ZScoreEntry {
    fn name(&self) -> &str {
        "z-score entry"
    }

    fn init(&mut self, ctx: &dyn TradingContext) -> Result<(), TradingError> {
        self.signal.preload(ctx)
    }

    fn is_met(&mut self, ctx: &dyn TradingContext) -> Result<bool, CriterionError> {
        let z = match self.signal.observe(ctx) {
            Ok(z) => z,
            Err(TradingError::PriceNotAvailable { .. }) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        if z.abs() <= self.entry_z {
            return Ok(false);
        }
        let hedge = match self.signal.hedge_ratio() {
            Some(h) => h.abs(),
            None => return Ok(false),
        };

        // Band breach alone is not enough: the hedged leg must round to at
        // least one unit, otherwise the pair is not worth carrying.
        let (first, second) = self.signal.symbols();
        let x = match ctx.last_price(first) {
            Ok(p) => p,
            Err(TradingError::PriceNotAvailable { .. }) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let y = match ctx.last_price(second) {
            Ok(p) => p,
            Err(TradingError::PriceNotAvailable { .. }) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let leverage = ctx.leverage().min(4.0);
        let base = ctx.net_value() * 0.5 * leverage / (y + hedge * x);
        if base * hedge < 1.0 {
            debug!(base, hedge, "breach too small to trade");
            return Ok(false);
        }
        Ok(true)
    }
}

/// Met when the spread has reverted across the exit level against the open
/// position's direction.
pub struct ZScoreExit {
    signal: Arc<SharedZScore>,
    exit_z: f64,
}

impl ZScoreExit {
    pub fn new(signal: Arc<SharedZScore>, exit_z: f64) -> Self {
        Self { signal, exit_z }
    }
}

impl Criterion for ZScoreExit {
    fn name(&self) -> &str {
        "z-score exit"
    }

    fn is_met(&mut self, ctx: &dyn TradingContext) -> Result<bool, CriterionError> {
        let z = match self.signal.observe(ctx) {
            Ok(z) => z,
            Err(TradingError::PriceNotAvailable { .. }) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let (first, _) = self.signal.symbols();
        let order = match ctx.last_order(first) {
            Ok(order) => order,
            Err(TradingError::NoOrderAvailable { .. }) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        // The first leg was bought below the band and sold above it, so the
        // position unwinds once z re-crosses the exit level.
        if order.is_long() {
            Ok(z > self.exit_z)
        } else {
            Ok(z < self.exit_z)
        }
    }
}
