//! The strategy state machine and the concrete pair strategies.
//!
//! A strategy owns a [`CriteriaSet`] and reacts to ticks through a fixed
//! decision order: the common gate first, then entry (highest priority),
//! then stop-loss, then exit. At most one position action happens per tick.

mod bollinger;
mod cointegration;

pub use bollinger::{BollingerStrategy, SharedZScore};
pub use cointegration::{CointegrationStrategy, SpreadEntry, SpreadExit, SpreadSignal};

use tracing::error;

use crate::context::{TradingContext, TradingError};
use crate::criteria::CriteriaSet;

/// A trading strategy driven one tick at a time.
pub trait Strategy {
    fn name(&self) -> &str;

    fn criteria_mut(&mut self) -> &mut CriteriaSet;

    /// Open the position. Called when the common and entry groups are met.
    fn open_position(&mut self, ctx: &mut dyn TradingContext) -> Result<(), TradingError>;

    /// Close the position. Called on stop-loss or exit.
    fn close_position(&mut self, ctx: &mut dyn TradingContext) -> Result<(), TradingError>;

    /// Runs once before the first tick.
    fn on_start(&mut self, ctx: &mut dyn TradingContext) {
        self.criteria_mut().init_all(&*ctx);
    }

    /// One pass of the decision order. A failed action is logged and the
    /// tick is abandoned; the next tick re-evaluates from scratch.
    fn on_tick(&mut self, ctx: &mut dyn TradingContext) {
        if !self.criteria_mut().common_met(&*ctx) {
            return;
        }
        if self.criteria_mut().entry_met(&*ctx) {
            if let Err(err) = self.open_position(ctx) {
                error!(strategy = self.name(), %err, "failed to open position");
            }
            return;
        }
        if self.criteria_mut().stop_loss_met(&*ctx) {
            if let Err(err) = self.close_position(ctx) {
                error!(strategy = self.name(), %err, "failed to close position on stop loss");
            }
            return;
        }
        if self.criteria_mut().exit_met(&*ctx) {
            if let Err(err) = self.close_position(ctx) {
                error!(strategy = self.name(), %err, "failed to close position");
            }
        }
    }
}

/// Close the open order on each symbol, skipping symbols that have none.
pub(crate) fn close_all(
    ctx: &mut dyn TradingContext,
    symbols: &[&str],
) -> Result<(), TradingError> {
    for symbol in symbols {
        match ctx.last_order(symbol) {
            Ok(order) => ctx.close_order(&order)?,
            Err(TradingError::NoOrderAvailable { .. }) => {
                tracing::debug!(symbol, "no order to close");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{Criterion, CriterionError};

    struct Flag(bool);

    impl Criterion for Flag {
        fn name(&self) -> &str {
            "flag"
        }

        fn is_met(&mut self, _ctx: &dyn TradingContext) -> Result<bool, CriterionError> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct Recorder {
        criteria: CriteriaSet,
        opened: usize,
        closed: usize,
    }

    impl Strategy for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn criteria_mut(&mut self) -> &mut CriteriaSet {
            &mut self.criteria
        }

        fn open_position(&mut self, _ctx: &mut dyn TradingContext) -> Result<(), TradingError> {
            self.opened += 1;
            Ok(())
        }

        fn close_position(&mut self, _ctx: &mut dyn TradingContext) -> Result<(), TradingError> {
            self.closed += 1;
            Ok(())
        }
    }

    #[test]
    fn common_gate_blocks_everything() {
        let mut strategy = Recorder::default();
        strategy.criteria.add_common(Box::new(Flag(false)));
        strategy.criteria.add_entry(Box::new(Flag(true)));

        let mut ctx = crate::criteria::testing::StubContext::new();
        strategy.on_tick(&mut ctx);
        assert_eq!(strategy.opened, 0);
    }

    #[test]
    fn entry_takes_priority_over_exit() {
        let mut strategy = Recorder::default();
        strategy.criteria.add_entry(Box::new(Flag(true)));
        strategy.criteria.add_exit(Box::new(Flag(true)));

        let mut ctx = crate::criteria::testing::StubContext::new();
        strategy.on_tick(&mut ctx);
        assert_eq!(strategy.opened, 1);
        assert_eq!(strategy.closed, 0);
    }

    #[test]
    fn stop_loss_closes_before_exit_is_consulted() {
        let mut strategy = Recorder::default();
        strategy.criteria.add_entry(Box::new(Flag(false)));
        strategy.criteria.add_stop_loss(Box::new(Flag(true)));
        strategy.criteria.add_exit(Box::new(Flag(true)));

        let mut ctx = crate::criteria::testing::StubContext::new();
        strategy.on_tick(&mut ctx);
        assert_eq!(strategy.closed, 1);
    }

    #[test]
    fn exit_closes_when_nothing_else_fires() {
        let mut strategy = Recorder::default();
        strategy.criteria.add_entry(Box::new(Flag(false)));
        strategy.criteria.add_exit(Box::new(Flag(true)));

        let mut ctx = crate::criteria::testing::StubContext::new();
        strategy.on_tick(&mut ctx);
        assert_eq!(strategy.opened, 0);
        assert_eq!(strategy.closed, 1);
    }
}
