//! Cointegration pair strategy around the Kalman spread signal.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::context::{TradingContext, TradingError};
use crate::criteria::{CriteriaSet, Criterion, CriterionError};
use crate::domain::{contract_multiplier, Instrument};
use crate::estimator::Cointegration;
use crate::strategy::{close_all, Strategy};

/// Innovations retained for the volatility estimate.
const ERROR_WINDOW: usize = 30;

/// One Kalman spread estimator shared between the entry and exit criteria.
///
/// Like the z-score signal, updates are keyed on the context instant: the
/// filter advances once per tick no matter how many criteria observe it.
/// Futures prices are scaled by their contract multiplier before filtering
/// so the innovation is in dollars.
pub struct SpreadSignal {
    first: String,
    second: String,
    state: Mutex<SpreadState>,
}

struct SpreadState {
    coint: Cointegration,
    errors: VecDeque<f64>,
    last_tick: Option<DateTime<Utc>>,
    stepped: bool,
    base_amount: f64,
}

/// Snapshot of the signal after a tick.
#[derive(Debug, Clone, Copy)]
pub struct SpreadObservation {
    pub beta: f64,
    pub error: f64,
    /// Spread volatility, available once the error window has filled.
    pub sd: Option<f64>,
}

impl SpreadSignal {
    pub fn new(first: impl Into<String>, second: impl Into<String>, delta: f64, r: f64) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            state: Mutex::new(SpreadState {
                coint: Cointegration::new(delta, r),
                errors: VecDeque::with_capacity(ERROR_WINDOW),
                last_tick: None,
                stepped: false,
                base_amount: 0.0,
            }),
        }
    }

    pub fn symbols(&self) -> (&str, &str) {
        (&self.first, &self.second)
    }

    pub fn is_futures_pair(&self) -> bool {
        Instrument::of(&self.first) == Instrument::Future
            && Instrument::of(&self.second) == Instrument::Future
    }

    /// Warm the filter from daily history, if the context has it. Does
    /// nothing once the filter has stepped.
    pub fn preload(&self, ctx: &dyn TradingContext) -> Result<(), TradingError> {
        let mut state = self.state.lock().expect("spread state poisoned");
        if state.stepped {
            return Ok(());
        }
        let first = match ctx.history_in_days(&self.first, 2) {
            Ok(series) => series,
            Err(TradingError::Unsupported) => {
                debug!(symbol = %self.first, "no history support; warming up from ticks");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        let second = ctx.history_in_days(&self.second, 2)?;

        let first = first.to_ascending();
        let second = second.to_ascending();
        let aligned = crate::series::merge(first.inner(), second.inner(), |a, b| (*a, *b));
        let fm = contract_multiplier(&self.first);
        let sm = contract_multiplier(&self.second);
        for entry in aligned.iter() {
            let (x, y) = entry.value;
            state.step(x * fm, y * sm);
        }
        Ok(())
    }

    /// Current spread observation for this tick, advancing the filter at
    /// most once per distinct context instant.
    pub fn observe(&self, ctx: &dyn TradingContext) -> Result<SpreadObservation, TradingError> {
        let mut state = self.state.lock().expect("spread state poisoned");
        let now = ctx.time();
        if state.last_tick != Some(now) {
            let x = ctx.last_price(&self.first)? * contract_multiplier(&self.first);
            let y = ctx.last_price(&self.second)? * contract_multiplier(&self.second);
            state.step(x, y);
            state.last_tick = Some(now);
        }
        Ok(SpreadObservation {
            beta: state.coint.beta(),
            error: state.coint.error(),
            sd: state.error_sd(),
        })
    }

    /// Latest hedge ratio, `None` before the first step.
    pub fn beta(&self) -> Option<f64> {
        let state = self.state.lock().expect("spread state poisoned");
        state.stepped.then(|| state.coint.beta())
    }

    /// Latest innovation, `None` before the first step.
    pub fn last_error(&self) -> Option<f64> {
        let state = self.state.lock().expect("spread state poisoned");
        state.stepped.then(|| state.coint.error())
    }

    pub fn base_amount(&self) -> f64 {
        self.state.lock().expect("spread state poisoned").base_amount
    }

    pub fn set_base_amount(&self, base: f64) {
        self.state.lock().expect("spread state poisoned").base_amount = base;
    }
}

impl SpreadState {
    fn step(&mut self, x: f64, y: f64) {
        self.coint.step(x, y);
        self.stepped = true;
        if self.errors.len() == ERROR_WINDOW {
            self.errors.pop_front();
        }
        self.errors.push_back(self.coint.error());
    }

    /// Sample standard deviation over the newest half of a full error
    /// window. The older half still carries the filter's burn-in, so it is
    /// excluded.
    fn error_sd(&self) -> Option<f64> {
        if self.errors.len() < ERROR_WINDOW {
            return None;
        }
        let half = ERROR_WINDOW / 2;
        let newest: Vec<f64> = self.errors.iter().rev().take(half).copied().collect();
        let n = newest.len() as f64;
        let mean = newest.iter().sum::<f64>() / n;
        let var = newest.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.sqrt())
    }
}

/// Met when the spread innovation leaves its volatility band and the
/// resulting position is tradeable.
pub struct SpreadEntry {
    signal: Arc<SpreadSignal>,
    multiplier: f64,
}

impl SpreadEntry {
    pub fn new(signal: Arc<SpreadSignal>, multiplier: f64) -> Self {
        assert!(multiplier > 0.0, "entry multiplier must be positive");
        Self { signal, multiplier }
    }
}

impl Criterion for SpreadEntry {
    fn name(&self) -> &str {
        "spread entry"
    }

    fn is_met(&mut self, ctx: &dyn TradingContext) -> Result<bool, CriterionError> {
        let obs = match self.signal.observe(ctx) {
            Ok(obs) => obs,
            Err(TradingError::PriceNotAvailable { .. }) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let sd = match obs.sd {
            Some(sd) => sd,
            None => return Ok(false),
        };
        if obs.error.abs() <= self.multiplier * sd {
            return Ok(false);
        }

        // Futures pairs trade a fixed clip; everything else sizes the pair
        // to half the account at up to 4x leverage.
        let (base, beta) = if self.signal.is_futures_pair() {
            (4.0, 1.0)
        } else {
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
            let base = ctx.net_value() * 0.5 * leverage / (y + obs.beta * x);
            (base, obs.beta)
        };
        if beta <= 0.0 || base * beta < 1.0 {
            debug!(base, beta, "spread breach too small to trade");
            return Ok(false);
        }
        self.signal.set_base_amount(base);
        Ok(true)
    }
}

/// Met when the innovation has reverted across the exit band against the
/// open position's direction.
pub struct SpreadExit {
    signal: Arc<SpreadSignal>,
    multiplier: f64,
}

impl SpreadExit {
    pub fn new(signal: Arc<SpreadSignal>, multiplier: f64) -> Self {
        assert!(multiplier >= 0.0, "exit multiplier must not be negative");
        Self { signal, multiplier }
    }
}

impl Criterion for SpreadExit {
    fn name(&self) -> &str {
        "spread exit"
    }

    fn is_met(&mut self, ctx: &dyn TradingContext) -> Result<bool, CriterionError> {
        let obs = match self.signal.observe(ctx) {
            Ok(obs) => obs,
            Err(TradingError::PriceNotAvailable { .. }) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let (_, second) = self.signal.symbols();
        let order = match ctx.last_order(second) {
            Ok(order) => order,
            Err(TradingError::NoOrderAvailable { .. }) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let threshold = if self.multiplier == 0.0 {
            0.0
        } else {
            match obs.sd {
                Some(sd) => self.multiplier * sd,
                None => return Ok(false),
            }
        };
        // The second leg was bought on a negative innovation, so it unwinds
        // once the innovation re-crosses the band.
        if order.is_long() {
            Ok(obs.error > threshold)
        } else {
            Ok(obs.error < -threshold)
        }
    }
}

/// Pair strategy on the Kalman spread: enter on a volatility-band breach,
/// exit when the innovation reverts.
pub struct CointegrationStrategy {
    first: String,
    second: String,
    signal: Arc<SpreadSignal>,
    criteria: CriteriaSet,
}

impl CointegrationStrategy {
    pub fn new(
        first: impl Into<String>,
        second: impl Into<String>,
        delta: f64,
        r: f64,
        entry_multiplier: f64,
        exit_multiplier: f64,
    ) -> Self {
        let first = first.into();
        let second = second.into();
        let signal = Arc::new(SpreadSignal::new(&first, &second, delta, r));
        let mut criteria = CriteriaSet::new();
        criteria.add_entry(Box::new(SpreadEntry::new(signal.clone(), entry_multiplier)));
        criteria.add_exit(Box::new(SpreadExit::new(signal.clone(), exit_multiplier)));
        Self {
            first,
            second,
            signal,
            criteria,
        }
    }

    pub fn signal(&self) -> &Arc<SpreadSignal> {
        &self.signal
    }
}

impl Strategy for CointegrationStrategy {
    fn name(&self) -> &str {
        "cointegration"
    }

    fn criteria_mut(&mut self) -> &mut CriteriaSet {
        &mut self.criteria
    }

    fn open_position(&mut self, ctx: &mut dyn TradingContext) -> Result<(), TradingError> {
        let (error, beta) = match (self.signal.last_error(), self.signal.beta()) {
            (Some(error), Some(beta)) => (error, beta),
            _ => {
                debug!("signal still warming up; not opening");
                return Ok(());
            }
        };
        let base = self.signal.base_amount();
        if base <= 0.0 {
            debug!("no sized entry recorded; not opening");
            return Ok(());
        }
        let beta = if self.signal.is_futures_pair() { 1.0 } else { beta };

        // Second leg first; if the hedge leg then fails, the partial
        // position stays on the book and the failure is logged upstream.
        ctx.place_order(&self.second, error < 0.0, base)?;
        ctx.place_order(&self.first, error > 0.0, base * beta)?;
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
    use crate::domain::Order;
    use chrono::{Duration, TimeZone, Utc};

    fn drive(signal: &SpreadSignal, ctx: &mut StubContext, ticks: usize, dislocate_last: bool) {
        let start = Utc.with_ymd_and_hms(2020, 3, 2, 10, 0, 0).unwrap();
        for i in 0..ticks {
            let x = 100.0 + (i as f64 * 0.9).sin();
            let mut y = 2.0 * x + 5.0;
            if dislocate_last && i == ticks - 1 {
                y += 40.0;
            }
            ctx.time = start + Duration::minutes(i as i64);
            ctx.prices.insert("GLD".into(), x);
            ctx.prices.insert("USO".into(), y);
            signal.observe(&*ctx).unwrap();
        }
    }

    #[test]
    fn observe_is_idempotent_within_a_tick() {
        let signal = SpreadSignal::new("GLD", "USO", 1e-4, 1e-3);
        let ctx = StubContext::new().with_price("GLD", 100.0).with_price("USO", 205.0);
        let a = signal.observe(&ctx).unwrap();
        let b = signal.observe(&ctx).unwrap();
        assert_eq!(a.error, b.error);
        assert_eq!(a.beta, b.beta);
    }

    #[test]
    fn volatility_needs_a_full_error_window() {
        let signal = SpreadSignal::new("GLD", "USO", 1e-4, 1e-3);
        let mut ctx = StubContext::new();
        drive(&signal, &mut ctx, ERROR_WINDOW - 1, false);
        assert!(signal.observe(&ctx).unwrap().sd.is_none());

        drive(&signal, &mut ctx, ERROR_WINDOW, false);
        assert!(signal.observe(&ctx).unwrap().sd.is_some());
    }

    #[test]
    fn entry_waits_for_volatility_then_fires_on_dislocation() {
        let signal = Arc::new(SpreadSignal::new("GLD", "USO", 1e-4, 1e-3));
        let mut entry = SpreadEntry::new(signal.clone(), 1.0);

        let mut ctx = StubContext::new();
        drive(&signal, &mut ctx, 10, false);
        assert!(!entry.is_met(&ctx).unwrap());

        drive(&signal, &mut ctx, 60, true);
        assert!(entry.is_met(&ctx).unwrap());
        assert!(signal.base_amount() > 0.0);
    }

    #[test]
    fn futures_pairs_trade_a_fixed_clip() {
        let signal = Arc::new(SpreadSignal::new("ES=F", "YM=F", 1e-4, 1e-3));
        assert!(signal.is_futures_pair());
        let mut entry = SpreadEntry::new(signal.clone(), 1.0);

        let start = Utc.with_ymd_and_hms(2020, 3, 2, 10, 0, 0).unwrap();
        let mut ctx = StubContext::new();
        for i in 0..60 {
            let x = 3000.0 + (i as f64 * 0.9).sin();
            // YM=F carries a 5x multiplier, so 10x the ES dollar value.
            let mut y = x * 10.0;
            if i == 59 {
                y += 5000.0;
            }
            ctx.time = start + Duration::minutes(i);
            ctx.prices.insert("ES=F".into(), x);
            ctx.prices.insert("YM=F".into(), y);
            signal.observe(&ctx).unwrap();
        }
        assert!(entry.is_met(&ctx).unwrap());
        assert_eq!(signal.base_amount(), 4.0);
    }

    #[test]
    fn exit_is_direction_aware() {
        let signal = Arc::new(SpreadSignal::new("GLD", "USO", 1e-4, 1e-3));
        let mut ctx = StubContext::new();
        // Dislocated last tick leaves a large positive innovation.
        drive(&signal, &mut ctx, 60, true);
        let error = signal.last_error().unwrap();
        assert!(error > 0.0);

        let open = Utc.with_ymd_and_hms(2020, 3, 2, 9, 0, 0).unwrap();
        let mut exit = SpreadExit::new(signal.clone(), 0.0);

        // Long second leg unwinds on a positive innovation.
        ctx.orders
            .insert("USO".into(), Order::new(1, "USO", open, 200.0, 10.0));
        assert!(exit.is_met(&ctx).unwrap());

        // Short second leg does not.
        ctx.orders
            .insert("USO".into(), Order::new(1, "USO", open, 200.0, -10.0));
        assert!(!exit.is_met(&ctx).unwrap());
    }

    #[test]
    fn exit_needs_an_open_second_leg() {
        let signal = Arc::new(SpreadSignal::new("GLD", "USO", 1e-4, 1e-3));
        let mut ctx = StubContext::new();
        drive(&signal, &mut ctx, 60, true);
        let mut exit = SpreadExit::new(signal, 0.0);
        assert!(!exit.is_met(&ctx).unwrap());
    }
}
