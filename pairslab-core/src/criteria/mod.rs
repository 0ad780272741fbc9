//! Composable trade criteria and their aggregation rules.
//!
//! Criteria are grouped into four roles with asymmetric empty-group
//! semantics: an empty common or entry group is satisfied (nothing blocks
//! opening), while an empty exit or stop-loss group is never satisfied
//! (nothing ever forces a close). Within a group the members are AND-ed,
//! and a member that fails with an error counts as not met.

mod orders;
mod stop_loss;
mod zscore;

pub use orders::{AllOrdersOpen, NoOpenOrders, NoPendingOrders};
pub use stop_loss::DefaultStopLoss;
pub use zscore::{ZScoreEntry, ZScoreExit};

use thiserror::Error;
use tracing::{debug, warn};

use crate::context::{TradingContext, TradingError};

/// Failure while evaluating a criterion.
#[derive(Debug, Error)]
pub enum CriterionError {
    /// The criterion's own precondition does not hold.
    #[error("criterion violation: {0}")]
    Violation(String),

    /// The context could not answer a query the criterion needs.
    #[error(transparent)]
    Trading(#[from] TradingError),
}

/// A single yes/no trade condition.
///
/// Criteria may carry state (rolling estimators, cached history) and are
/// re-evaluated once per tick, so `is_met` takes `&mut self`.
pub trait Criterion: Send {
    fn name(&self) -> &str;

    /// One-time setup before the first tick. The default needs none.
    fn init(&mut self, _ctx: &dyn TradingContext) -> Result<(), TradingError> {
        Ok(())
    }

    fn is_met(&mut self, ctx: &dyn TradingContext) -> Result<bool, CriterionError>;
}

/// The four criterion groups a strategy consults each tick.
#[derive(Default)]
pub struct CriteriaSet {
    common: Vec<Box<dyn Criterion>>,
    entry: Vec<Box<dyn Criterion>>,
    exit: Vec<Box<dyn Criterion>>,
    stop_loss: Vec<Box<dyn Criterion>>,
}

impl CriteriaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_common(&mut self, criterion: Box<dyn Criterion>) {
        self.common.push(criterion);
    }

    pub fn add_entry(&mut self, criterion: Box<dyn Criterion>) {
        self.entry.push(criterion);
    }

    pub fn add_exit(&mut self, criterion: Box<dyn Criterion>) {
        self.exit.push(criterion);
    }

    pub fn add_stop_loss(&mut self, criterion: Box<dyn Criterion>) {
        self.stop_loss.push(criterion);
    }

    /// Initialize every member. A failed init is logged and skipped; the
    /// criterion still participates in evaluation.
    pub fn init_all(&mut self, ctx: &dyn TradingContext) {
        for criterion in self
            .common
            .iter_mut()
            .chain(&mut self.entry)
            .chain(&mut self.exit)
            .chain(&mut self.stop_loss)
        {
            if let Err(err) = criterion.init(ctx) {
                warn!(criterion = criterion.name(), %err, "criterion init failed");
            }
        }
    }

    /// Empty group is satisfied.
    pub fn common_met(&mut self, ctx: &dyn TradingContext) -> bool {
        all_met("common", &mut self.common, ctx)
    }

    /// Empty group is satisfied.
    pub fn entry_met(&mut self, ctx: &dyn TradingContext) -> bool {
        all_met("entry", &mut self.entry, ctx)
    }

    /// Empty group is never satisfied.
    pub fn exit_met(&mut self, ctx: &dyn TradingContext) -> bool {
        !self.exit.is_empty() && all_met("exit", &mut self.exit, ctx)
    }

    /// Empty group is never satisfied.
    pub fn stop_loss_met(&mut self, ctx: &dyn TradingContext) -> bool {
        !self.stop_loss.is_empty() && all_met("stop_loss", &mut self.stop_loss, ctx)
    }
}

fn all_met(group: &str, members: &mut [Box<dyn Criterion>], ctx: &dyn TradingContext) -> bool {
    for criterion in members.iter_mut() {
        match criterion.is_met(ctx) {
            Ok(true) => {}
            Ok(false) => {
                debug!(group, criterion = criterion.name(), "criterion not met");
                return false;
            }
            Err(err) => {
                warn!(group, criterion = criterion.name(), %err, "criterion errored");
                return false;
            }
        }
    }
    true
}


#[cfg(test)]
mod tests {
    use super::testing::StubContext;
    use super::*;

    struct Fixed {
        name: &'static str,
        result: Result<bool, ()>,
    }

    impl Criterion for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn is_met(&mut self, _ctx: &dyn TradingContext) -> Result<bool, CriterionError> {
            self.result
                .map_err(|_| CriterionError::Violation("boom".into()))
        }
    }

    fn met() -> Box<dyn Criterion> {
        Box::new(Fixed { name: "met", result: Ok(true) })
    }

    fn unmet() -> Box<dyn Criterion> {
        Box::new(Fixed { name: "unmet", result: Ok(false) })
    }

    fn failing() -> Box<dyn Criterion> {
        Box::new(Fixed { name: "failing", result: Err(()) })
    }

    #[test]
    fn empty_common_and_entry_are_satisfied() {
        let mut set = CriteriaSet::new();
        let ctx = StubContext::new();
        assert!(set.common_met(&ctx));
        assert!(set.entry_met(&ctx));
    }

    #[test]
    fn empty_exit_and_stop_loss_are_not_satisfied() {
        let mut set = CriteriaSet::new();
        let ctx = StubContext::new();
        assert!(!set.exit_met(&ctx));
        assert!(!set.stop_loss_met(&ctx));
    }

    #[test]
    fn groups_are_and_folded() {
        let ctx = StubContext::new();

        let mut set = CriteriaSet::new();
        set.add_entry(met());
        set.add_entry(met());
        assert!(set.entry_met(&ctx));

        set.add_entry(unmet());
        assert!(!set.entry_met(&ctx));
    }

    #[test]
    fn erroring_member_counts_as_not_met() {
        let ctx = StubContext::new();

        let mut set = CriteriaSet::new();
        set.add_exit(met());
        set.add_exit(failing());
        assert!(!set.exit_met(&ctx));
    }
}
