//! Bollinger-style pair strategy around the rolling-regression z-score.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::context::{TradingContext, TradingError};
use crate::criteria::{CriteriaSet, ZScoreEntry, ZScoreExit};
use crate::estimator::RollingZScore;
use crate::strategy::{close_all, Strategy};

/// One z-score estimator shared between the entry and exit criteria.
///
/// The estimator consumes exactly one price pair per tick, but both
/// criteria may ask for the current value on the same tick. Updates are
/// therefore keyed on the context's instant: the first caller of a tick
/// advances the estimator, later callers get the cached value.
pub struct SharedZScore {
    first: String,
    second: String,
    state: Mutex<ZState>,
}

struct ZState {
    estimator: RollingZScore,
    last_tick: Option<DateTime<Utc>>,
    last_z: f64,
}

impl SharedZScore {
    pub fn new(first: impl Into<String>, second: impl Into<String>, lookback: usize) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            state: Mutex::new(ZState {
                estimator: RollingZScore::new(lookback),
                last_tick: None,
                last_z: 0.0,
            }),
        }
    }

    pub fn symbols(&self) -> (&str, &str) {
        (&self.first, &self.second)
    }

    /// Replace the warm-up phase with daily history, if the context has it.
    pub fn preload(&self, ctx: &dyn TradingContext) -> Result<(), TradingError> {
        let mut state = self.state.lock().expect("z-score state poisoned");
        let lookback = state.estimator.lookback();
        let size = 2 * lookback - 1;

        let first = match ctx.history_in_days(&self.first, size as u32) {
            Ok(series) => series,
            Err(TradingError::Unsupported) => {
                debug!(symbol = %self.first, "no history support; warming up from ticks");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        let second = ctx.history_in_days(&self.second, size as u32)?;

        let first = first.to_ascending();
        let second = second.to_ascending();
        let aligned = crate::series::merge(first.inner(), second.inner(), |a, b| (*a, *b));
        if aligned.len() < size {
            debug!(
                aligned = aligned.len(),
                needed = size,
                "insufficient history; warming up from ticks"
            );
            return Ok(());
        }
        let tail: Vec<(f64, f64)> = aligned
            .iter()
            .skip(aligned.len() - size)
            .map(|e| e.value)
            .collect();
        let xs: Vec<f64> = tail.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = tail.iter().map(|p| p.1).collect();
        state.estimator = RollingZScore::with_history(&xs, &ys, lookback);
        Ok(())
    }

    /// Current z-score for this tick, updating the estimator at most once
    /// per distinct context instant.
    pub fn observe(&self, ctx: &dyn TradingContext) -> Result<f64, TradingError> {
        let mut state = self.state.lock().expect("z-score state poisoned");
        let now = ctx.time();
        if state.last_tick == Some(now) {
            return Ok(state.last_z);
        }
        let x = ctx.last_price(&self.first)?;
        let y = ctx.last_price(&self.second)?;
        let z = state.estimator.update(x, y);
        state.last_tick = Some(now);
        state.last_z = z;
        Ok(z)
    }

    /// Latest hedge ratio, `None` during warm-up.
    pub fn hedge_ratio(&self) -> Option<f64> {
        self.state
            .lock()
            .expect("z-score state poisoned")
            .estimator
            .hedge_ratio()
    }

    /// Latest z-score, `None` until the first real statistic.
    pub fn last_z_score(&self) -> Option<f64> {
        self.state
            .lock()
            .expect("z-score state poisoned")
            .estimator
            .last_z_score()
    }
}

/// Mean-reversion pair strategy: enter when the standardized spread leaves
/// its band, exit when it reverts.
pub struct BollingerStrategy {
    first: String,
    second: String,
    signal: std::sync::Arc<SharedZScore>,
    criteria: CriteriaSet,
}

impl BollingerStrategy {
    pub fn new(
        first: impl Into<String>,
        second: impl Into<String>,
        lookback: usize,
        entry_z: f64,
        exit_z: f64,
    ) -> Self {
        let first = first.into();
        let second = second.into();
        let signal = std::sync::Arc::new(SharedZScore::new(&first, &second, lookback));
        let mut criteria = CriteriaSet::new();
        criteria.add_entry(Box::new(ZScoreEntry::new(signal.clone(), entry_z)));
        criteria.add_exit(Box::new(ZScoreExit::new(signal.clone(), exit_z)));
        Self {
            first,
            second,
            signal,
            criteria,
        }
    }

    pub fn signal(&self) -> &std::sync::Arc<SharedZScore> {
        &self.signal
    }

    /// Unsigned base quantity of the second symbol so that the full hedged
    /// pair consumes half the account at up to 4x leverage.
    fn base_amount(&self, ctx: &dyn TradingContext, hedge: f64, x: f64, y: f64) -> f64 {
        let leverage = ctx.leverage().min(4.0);
        ctx.net_value() * 0.5 * leverage / (y + hedge * x)
    }
}

impl Strategy for BollingerStrategy {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn criteria_mut(&mut self) -> &mut CriteriaSet {
        &mut self.criteria
    }

    fn open_position(&mut self, ctx: &mut dyn TradingContext) -> Result<(), TradingError> {
        let (hedge, z) = match (self.signal.hedge_ratio(), self.signal.last_z_score()) {
            (Some(h), Some(z)) => (h.abs(), z),
            _ => {
                debug!("signal still warming up; not opening");
                return Ok(());
            }
        };
        let x = ctx.last_price(&self.first)?;
        let y = ctx.last_price(&self.second)?;
        let base = self.base_amount(&*ctx, hedge, x, y);

        ctx.place_order(&self.first, z < 0.0, (base * hedge).max(1.0))?;
        ctx.place_order(&self.second, z > 0.0, base.max(1.0))?;
        Ok(())
    }

    fn close_position(&mut self, ctx: &mut dyn TradingContext) -> Result<(), TradingError> {
        close_all(ctx, &[self.first.as_str(), self.second.as_str()])
    }

    fn on_start(&mut self, ctx: &mut dyn TradingContext) {
        if let Err(err) = self.signal.preload(ctx) {
            debug!(%err, "history preload failed; warming up from ticks");
        }
        self.criteria.init_all(&*ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::testing::StubContext;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn observe_is_idempotent_within_a_tick() {
        let signal = SharedZScore::new("GLD", "USO", 3);
        let mut ctx = StubContext::new().with_price("GLD", 100.0).with_price("USO", 40.0);

        let a = signal.observe(&ctx).unwrap();
        let b = signal.observe(&ctx).unwrap();
        assert_eq!(a, b);

        // A new instant advances the estimator again.
        ctx.time = ctx.time + Duration::minutes(1);
        ctx.prices.insert("GLD".into(), 101.0);
        signal.observe(&ctx).unwrap();
    }

    #[test]
    fn observe_surfaces_missing_prices() {
        let signal = SharedZScore::new("GLD", "USO", 3);
        let ctx = StubContext::new().with_price("GLD", 100.0);
        assert!(matches!(
            signal.observe(&ctx),
            Err(TradingError::PriceNotAvailable { .. })
        ));
    }

    #[test]
    fn warm_signal_reports_hedge_and_z() {
        let signal = SharedZScore::new("GLD", "USO", 2);
        let mut ctx = StubContext::new();
        let start = Utc.with_ymd_and_hms(2020, 3, 2, 10, 0, 0).unwrap();
        for (i, (x, y)) in [(100.0, 40.0), (101.0, 40.5), (102.0, 40.8), (101.5, 40.9)]
            .iter()
            .enumerate()
        {
            ctx.time = start + Duration::minutes(i as i64);
            ctx.prices.insert("GLD".into(), *x);
            ctx.prices.insert("USO".into(), *y);
            signal.observe(&ctx).unwrap();
        }
        assert!(signal.hedge_ratio().is_some());
        assert!(signal.last_z_score().is_some());
    }
}
