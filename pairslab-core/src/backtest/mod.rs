//! Deterministic backtest: replay a recorded price panel through a strategy
//! tick by tick.

mod context;
mod report;

pub use context::{commission, SimContext};
pub use report::render_report;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::context::TradingContext;
use crate::domain::ClosedOrder;
use crate::series::MultipleDoubleSeries;
use crate::stats::{self, Drawdown, TRADING_DAYS};
use crate::strategy::Strategy;

/// A backtest over one aligned price panel.
pub struct BackTest {
    deposit: f64,
    leverage: f64,
    prices: MultipleDoubleSeries,
}

impl BackTest {
    /// # Panics
    /// If the panel is empty or not in ascending timestamp order.
    pub fn new(deposit: f64, leverage: f64, prices: MultipleDoubleSeries) -> Self {
        assert!(!prices.is_empty(), "price panel must not be empty");
        assert!(prices.is_ascending(), "price panel must be ascending");
        Self {
            deposit,
            leverage,
            prices,
        }
    }

    /// Replay every tick through the strategy. Account state is snapshotted
    /// before the strategy acts, so the recorded curve reflects the position
    /// entering each tick. A negative available-funds balance is a margin
    /// call and stops the replay; any position left at the end is closed at
    /// the last quote.
    pub fn run(&self, strategy: &mut dyn Strategy) -> BackTestResult {
        let mut ctx = SimContext::new(self.deposit, self.leverage, self.prices.names().to_vec());
        strategy.on_start(&mut ctx);

        let mut pl_history = Vec::with_capacity(self.prices.len());
        let mut funds_history = Vec::with_capacity(self.prices.len());
        let mut instants = Vec::with_capacity(self.prices.len());
        let mut margin_called = false;

        for entry in self.prices.iter() {
            ctx.set_tick(&entry.value, entry.instant);
            pl_history.push(ctx.pl());
            funds_history.push(ctx.available_funds());
            instants.push(entry.instant);
            if ctx.available_funds() < 0.0 {
                warn!(instant = %entry.instant, "margin call; stopping replay");
                margin_called = true;
                break;
            }
            strategy.on_tick(&mut ctx);
            ctx.append_history();
        }

        if let Err(err) = ctx.close_all_open() {
            warn!(%err, "could not flatten every position");
        }
        info!(
            realized_pl = ctx.realized_pl(),
            commissions = ctx.commissions(),
            trades = ctx.closed_orders().len(),
            "backtest finished"
        );

        BackTestResult {
            deposit: self.deposit,
            realized_pl: ctx.realized_pl(),
            commissions: ctx.commissions(),
            pl_history,
            funds_history,
            instants,
            margin_called,
            closed_orders: ctx.into_closed_orders(),
        }
    }
}

/// Everything a finished backtest produced.
#[derive(Debug, Clone, Serialize)]
pub struct BackTestResult {
    pub deposit: f64,
    pub closed_orders: Vec<ClosedOrder>,
    /// Realized P&L, before commissions.
    pub realized_pl: f64,
    pub commissions: f64,
    /// Account P&L entering each tick.
    pub pl_history: Vec<f64>,
    /// Available funds entering each tick.
    pub funds_history: Vec<f64>,
    pub instants: Vec<DateTime<Utc>>,
    pub margin_called: bool,
}

impl BackTestResult {
    /// Deposit plus realized P&L.
    pub fn final_value(&self) -> f64 {
        self.deposit + self.realized_pl
    }

    pub fn return_rate(&self) -> f64 {
        (self.final_value() - self.deposit) / self.deposit
    }

    /// Calendar days covered by the replay, at least one.
    pub fn days_count(&self) -> i64 {
        match (self.instants.first(), self.instants.last()) {
            (Some(first), Some(last)) => (*last - *first).num_days().max(1),
            _ => 1,
        }
    }

    /// Return rate scaled to a 250-session trading year.
    pub fn annualized_return(&self) -> f64 {
        self.return_rate() * TRADING_DAYS / self.days_count() as f64
    }

    /// Account value entering each tick.
    pub fn account_value_history(&self) -> Vec<f64> {
        self.pl_history.iter().map(|pl| self.deposit + pl).collect()
    }

    pub fn sharpe_ratio(&self) -> f64 {
        stats::sharpe(&stats::simple_returns(&self.account_value_history()))
    }

    pub fn max_drawdown(&self) -> Drawdown {
        stats::drawdown(&self.account_value_history())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{TradingContext, TradingError};
    use crate::criteria::CriteriaSet;
    use chrono::TimeZone;

    fn panel(rows: &[(i64, f64, f64)]) -> MultipleDoubleSeries {
        let mut panel = MultipleDoubleSeries::with_names(vec!["GLD".into(), "USO".into()]);
        for &(day, x, y) in rows {
            panel.push(
                vec![x, y],
                Utc.with_ymd_and_hms(2020, 3, 1, 10, 0, 0).unwrap() + chrono::Duration::days(day),
            );
        }
        panel
    }

    /// Buys on the first tick and holds.
    struct BuyAndHold {
        criteria: CriteriaSet,
        bought: bool,
    }

    impl BuyAndHold {
        fn new() -> Self {
            Self {
                criteria: CriteriaSet::new(),
                bought: false,
            }
        }
    }

    impl Strategy for BuyAndHold {
        fn name(&self) -> &str {
            "buy and hold"
        }

        fn criteria_mut(&mut self) -> &mut CriteriaSet {
            &mut self.criteria
        }

        fn open_position(&mut self, ctx: &mut dyn TradingContext) -> Result<(), TradingError> {
            ctx.place_order("GLD", true, 100.0)?;
            Ok(())
        }

        fn close_position(&mut self, _ctx: &mut dyn TradingContext) -> Result<(), TradingError> {
            Ok(())
        }

        fn on_tick(&mut self, ctx: &mut dyn TradingContext) {
            if !self.bought {
                self.bought = true;
                self.open_position(ctx).unwrap();
            }
        }
    }

    #[test]
    fn replay_realizes_open_positions_at_the_end() {
        let backtest = BackTest::new(
            100_000.0,
            2.0,
            panel(&[(0, 100.0, 40.0), (1, 102.0, 40.0), (2, 105.0, 40.0)]),
        );
        let result = backtest.run(&mut BuyAndHold::new());

        // 100 shares, 100 -> 105.
        assert_eq!(result.realized_pl, 500.0);
        assert_eq!(result.final_value(), 100_500.0);
        assert_eq!(result.closed_orders.len(), 1);
        assert!(!result.margin_called);

        // Snapshots are taken before the strategy acts: tick 0 is flat,
        // tick 1 carries the position opened on tick 0.
        assert_eq!(result.pl_history[0], 0.0);
        assert!((result.pl_history[1] - (200.0 - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn margin_call_stops_the_replay() {
        struct Overreach {
            criteria: CriteriaSet,
            done: bool,
        }

        impl Strategy for Overreach {
            fn name(&self) -> &str {
                "overreach"
            }

            fn criteria_mut(&mut self) -> &mut CriteriaSet {
                &mut self.criteria
            }

            fn open_position(&mut self, ctx: &mut dyn TradingContext) -> Result<(), TradingError> {
                // Far beyond 2x leverage on a 10k account.
                ctx.place_order("GLD", true, 10_000.0)?;
                Ok(())
            }

            fn close_position(&mut self, _: &mut dyn TradingContext) -> Result<(), TradingError> {
                Ok(())
            }

            fn on_tick(&mut self, ctx: &mut dyn TradingContext) {
                if !self.done {
                    self.done = true;
                    self.open_position(ctx).unwrap();
                }
            }
        }

        let backtest = BackTest::new(
            10_000.0,
            2.0,
            panel(&[(0, 100.0, 40.0), (1, 100.0, 40.0), (2, 100.0, 40.0)]),
        );
        let mut strategy = Overreach {
            criteria: CriteriaSet::new(),
            done: false,
        };
        let result = backtest.run(&mut strategy);
        assert!(result.margin_called);
        // Ticks 0 and 1 were recorded, tick 2 never ran.
        assert_eq!(result.pl_history.len(), 2);
    }

    #[test]
    fn derived_metrics_follow_the_curve() {
        let backtest = BackTest::new(
            100_000.0,
            2.0,
            panel(&[(0, 100.0, 40.0), (5, 105.0, 40.0)]),
        );
        let result = backtest.run(&mut BuyAndHold::new());

        assert_eq!(result.days_count(), 5);
        assert!((result.return_rate() - 0.005).abs() < 1e-12);
        assert!((result.annualized_return() - 0.005 * 250.0 / 5.0).abs() < 1e-12);
        let values = result.account_value_history();
        assert_eq!(values[0], 100_000.0);
    }

    #[test]
    #[should_panic(expected = "ascending")]
    fn descending_panel_is_rejected() {
        let mut panel = MultipleDoubleSeries::with_names(vec!["GLD".into(), "USO".into()]);
        panel.push(vec![1.0, 1.0], Utc.with_ymd_and_hms(2020, 3, 2, 0, 0, 0).unwrap());
        panel.push(vec![1.0, 1.0], Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap());
        BackTest::new(100_000.0, 2.0, panel);
    }
}
