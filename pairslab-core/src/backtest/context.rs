//! In-memory trading context for the simulator: immediate fills, modeled
//! commissions, margin accounting, and replayed history.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use tracing::debug;

use crate::context::{TradingContext, TradingError};
use crate::domain::{ClosedOrder, Instrument, Order};
use crate::series::DoubleSeries;

/// Hour (UTC) at which the session close snapshot is taken.
const CLOSE_HOUR: u32 = 13;

/// Simulated brokerage account replaying a recorded price panel.
pub struct SimContext {
    deposit: f64,
    leverage: f64,
    symbols: Vec<String>,
    time: DateTime<Utc>,
    current: HashMap<String, f64>,
    open_orders: Vec<Order>,
    closed_orders: Vec<ClosedOrder>,
    realized_pl: f64,
    commissions: f64,
    next_order_id: u64,
    history: HashMap<String, DoubleSeries>,
    close_prices: HashMap<String, f64>,
    close_date: Option<NaiveDate>,
}

impl SimContext {
    pub fn new(deposit: f64, leverage: f64, symbols: Vec<String>) -> Self {
        assert!(deposit > 0.0, "deposit must be positive");
        assert!(leverage >= 1.0, "leverage must be at least 1");
        let history = symbols
            .iter()
            .map(|s| (s.clone(), DoubleSeries::new(s.clone())))
            .collect();
        Self {
            deposit,
            leverage,
            symbols,
            time: Utc.timestamp_opt(0, 0).unwrap(),
            current: HashMap::new(),
            open_orders: Vec::new(),
            closed_orders: Vec::new(),
            realized_pl: 0.0,
            commissions: 0.0,
            next_order_id: 1,
            history,
            close_prices: HashMap::new(),
            close_date: None,
        }
    }

    /// Advance the clock and quotes to the next tick. A non-finite or
    /// non-positive value marks the symbol as unquoted for this tick.
    pub(crate) fn set_tick(&mut self, values: &[f64], instant: DateTime<Utc>) {
        assert_eq!(values.len(), self.symbols.len(), "tick width mismatch");
        self.time = instant;
        for (symbol, &value) in self.symbols.iter().zip(values) {
            if value.is_finite() && value > 0.0 {
                self.current.insert(symbol.clone(), value);
            } else {
                self.current.remove(symbol);
            }
        }
        // First tick at or past the close hour fixes the session close.
        let date = instant.date_naive();
        if instant.hour() >= CLOSE_HOUR && self.close_date != Some(date) {
            self.close_prices = self.current.clone();
            self.close_date = Some(date);
        }
    }

    /// Append the current quotes to the replayed history, making them
    /// visible through `history_in_days`.
    pub(crate) fn append_history(&mut self) {
        for symbol in &self.symbols {
            if let Some(&price) = self.current.get(symbol) {
                if let Some(series) = self.history.get_mut(symbol) {
                    series.push(price, self.time);
                }
            }
        }
    }

    /// Total P&L: realized plus open mark-to-market, net of commissions.
    pub fn pl(&self) -> f64 {
        let unrealized: f64 = self
            .open_orders
            .iter()
            .filter_map(|o| {
                self.current
                    .get(&o.symbol)
                    .map(|&price| o.unrealized_pl(price))
            })
            .sum();
        self.realized_pl + unrealized - self.commissions
    }

    pub fn realized_pl(&self) -> f64 {
        self.realized_pl
    }

    pub fn commissions(&self) -> f64 {
        self.commissions
    }

    pub fn open_orders(&self) -> &[Order] {
        &self.open_orders
    }

    pub fn closed_orders(&self) -> &[ClosedOrder] {
        &self.closed_orders
    }

    pub(crate) fn into_closed_orders(self) -> Vec<ClosedOrder> {
        self.closed_orders
    }

    /// Close every open order at the current price. Orders whose symbol has
    /// no quote stay open and are reported.
    pub(crate) fn close_all_open(&mut self) -> Result<(), TradingError> {
        for order in std::mem::take(&mut self.open_orders) {
            match self.current.get(&order.symbol).copied() {
                Some(price) => self.settle(order, price),
                None => {
                    debug!(symbol = %order.symbol, "no quote to close against");
                    self.open_orders.push(order);
                }
            }
        }
        if let Some(order) = self.open_orders.first() {
            return Err(TradingError::PriceNotAvailable {
                symbol: order.symbol.clone(),
            });
        }
        Ok(())
    }

    fn settle(&mut self, order: Order, price: f64) {
        // Both legs are charged on the order's open price.
        self.commissions += commission(&order.symbol, order.amount, order.open_price);
        let closed = ClosedOrder::new(order, self.time, price);
        self.realized_pl += closed.pl;
        self.closed_orders.push(closed);
    }

    fn history_since(
        &self,
        symbol: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<DoubleSeries, TradingError> {
        let series = self
            .history
            .get(symbol)
            .ok_or_else(|| TradingError::UnknownContract {
                symbol: symbol.to_string(),
            })?;
        let entries = series
            .iter()
            .filter(|e| e.instant >= cutoff)
            .cloned()
            .collect();
        let within =
            DoubleSeries::from_series(symbol, crate::series::TimeSeries::from_entries(entries));
        Ok(within.to_descending())
    }

    /// Margin committed by open positions.
    fn margin_used(&self) -> f64 {
        self.open_orders
            .iter()
            .map(|o| o.amount.abs() * o.open_price / self.leverage)
            .sum()
    }
}

/// Commission for one fill, per instrument class.
pub fn commission(symbol: &str, amount: f64, price: f64) -> f64 {
    let quantity = amount.abs();
    match Instrument::of(symbol) {
        Instrument::Fx => quantity * price * 0.00002,
        Instrument::Future => quantity * 2.04,
        Instrument::Equity => (quantity * 0.005).max(1.0),
    }
}

impl TradingContext for SimContext {
    fn time(&self) -> DateTime<Utc> {
        self.time
    }

    fn contracts(&self) -> Vec<String> {
        self.symbols.clone()
    }

    fn available_funds(&self) -> f64 {
        self.net_value() - self.margin_used()
    }

    fn net_value(&self) -> f64 {
        self.deposit + self.pl()
    }

    fn leverage(&self) -> f64 {
        self.leverage
    }

    fn last_price(&self, symbol: &str) -> Result<f64, TradingError> {
        self.current
            .get(symbol)
            .copied()
            .ok_or_else(|| TradingError::PriceNotAvailable {
                symbol: symbol.to_string(),
            })
    }

    fn history(&self, symbol: &str) -> Result<DoubleSeries, TradingError> {
        let series = self
            .history
            .get(symbol)
            .ok_or_else(|| TradingError::UnknownContract {
                symbol: symbol.to_string(),
            })?;
        Ok(series.to_descending())
    }

    fn history_in_days(&self, symbol: &str, days: u32) -> Result<DoubleSeries, TradingError> {
        self.history_since(symbol, self.time - chrono::Duration::days(days as i64))
    }

    fn history_in_minutes(&self, symbol: &str, minutes: u32) -> Result<DoubleSeries, TradingError> {
        self.history_since(symbol, self.time - chrono::Duration::minutes(minutes as i64))
    }

    fn change_by_symbol(&self, symbol: &str) -> Result<f64, TradingError> {
        let (Some(&current), Some(&close)) =
            (self.current.get(symbol), self.close_prices.get(symbol))
        else {
            return Err(TradingError::PriceNotAvailable {
                symbol: symbol.to_string(),
            });
        };
        let raw = (current - close) * 100.0 / close;
        Ok((raw * 100.0).round() / 100.0)
    }

    fn add_contract(&mut self, _symbol: &str) -> Result<(), TradingError> {
        Err(TradingError::Unsupported)
    }

    fn remove_contract(&mut self, _symbol: &str) -> Result<(), TradingError> {
        Err(TradingError::Unsupported)
    }

    fn place_order(&mut self, symbol: &str, buy: bool, amount: f64) -> Result<Order, TradingError> {
        assert!(amount > 0.0, "order amount must be positive");
        if !self.symbols.iter().any(|s| s == symbol) {
            return Err(TradingError::UnknownContract {
                symbol: symbol.to_string(),
            });
        }
        let price = self.last_price(symbol)?;
        let signed = if buy { amount } else { -amount };
        self.commissions += commission(symbol, signed, price);
        let order = Order::new(self.next_order_id, symbol, self.time, price, signed);
        self.next_order_id += 1;
        debug!(symbol, buy, amount, price, "order filled");
        self.open_orders.push(order.clone());
        Ok(order)
    }

    fn close_order(&mut self, order: &Order) -> Result<(), TradingError> {
        let index = self
            .open_orders
            .iter()
            .position(|o| o.id == order.id)
            .ok_or_else(|| TradingError::NoOrderAvailable {
                symbol: order.symbol.clone(),
            })?;
        let price = self.last_price(&order.symbol)?;
        let order = self.open_orders.remove(index);
        debug!(symbol = %order.symbol, price, "order closed");
        self.settle(order, price);
        Ok(())
    }

    fn last_order(&self, symbol: &str) -> Result<Order, TradingError> {
        self.open_orders
            .iter()
            .rev()
            .find(|o| o.symbol == symbol)
            .cloned()
            .ok_or_else(|| TradingError::NoOrderAvailable {
                symbol: symbol.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, day, hour, 0, 0).unwrap()
    }

    fn ctx() -> SimContext {
        let mut ctx = SimContext::new(100_000.0, 2.0, vec!["GLD".into(), "USO".into()]);
        ctx.set_tick(&[100.0, 40.0], at(2, 10));
        ctx
    }

    #[test]
    fn fills_are_immediate_and_charged() {
        let mut ctx = ctx();
        ctx.place_order("GLD", true, 100.0).unwrap();

        let order = ctx.last_order("GLD").unwrap();
        assert!(order.is_long());
        assert_eq!(order.open_price, 100.0);
        assert!(ctx.is_order_filled(&order));
        // Equity commission: max(1, 100 * 0.005) = 1.
        assert_eq!(ctx.commissions(), 1.0);
    }

    #[test]
    fn net_value_marks_open_positions_to_market() {
        let mut ctx = ctx();
        ctx.place_order("GLD", true, 100.0).unwrap();
        ctx.set_tick(&[105.0, 40.0], at(2, 11));

        // +500 unrealized, -1 commission.
        assert_eq!(ctx.pl(), 499.0);
        assert_eq!(ctx.net_value(), 100_499.0);
        // Margin: 100 * 100 / 2 = 5000.
        assert_eq!(ctx.available_funds(), 100_499.0 - 5_000.0);
    }

    #[test]
    fn closing_realizes_and_removes_the_order() {
        let mut ctx = ctx();
        ctx.place_order("GLD", true, 100.0).unwrap();
        ctx.set_tick(&[105.0, 40.0], at(2, 11));

        let order = ctx.last_order("GLD").unwrap();
        ctx.close_order(&order).unwrap();

        assert_eq!(ctx.realized_pl(), 500.0);
        assert_eq!(ctx.open_orders().len(), 0);
        assert_eq!(ctx.closed_orders().len(), 1);
        assert!(matches!(
            ctx.last_order("GLD"),
            Err(TradingError::NoOrderAvailable { .. })
        ));
        // Commissions on both sides, each priced off the open.
        assert!((ctx.commissions() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn commission_schedule_by_instrument() {
        assert_eq!(commission("EUR/USD", 10_000.0, 1.10), 10_000.0 * 1.10 * 0.00002);
        assert_eq!(commission("ES=F", -3.0, 3000.0), 3.0 * 2.04);
        assert_eq!(commission("GLD", 10.0, 100.0), 1.0);
        assert_eq!(commission("GLD", 1000.0, 100.0), 5.0);
    }

    #[test]
    fn missing_quote_surfaces_as_price_not_available() {
        let mut ctx = ctx();
        ctx.set_tick(&[f64::NAN, 40.0], at(2, 11));
        assert!(matches!(
            ctx.last_price("GLD"),
            Err(TradingError::PriceNotAvailable { .. })
        ));
        assert!(matches!(
            ctx.place_order("GLD", true, 1.0),
            Err(TradingError::PriceNotAvailable { .. })
        ));
    }

    #[test]
    fn change_by_symbol_compares_to_the_session_close() {
        let mut ctx = ctx();
        // No close fixed yet.
        assert!(matches!(
            ctx.change_by_symbol("GLD"),
            Err(TradingError::PriceNotAvailable { .. })
        ));

        // 13:00 tick fixes the close.
        ctx.set_tick(&[100.0, 40.0], at(2, 13));
        ctx.set_tick(&[103.0, 39.0], at(3, 10));

        assert_eq!(ctx.change_by_symbol("GLD").unwrap(), 3.0);
        assert_eq!(ctx.change_by_symbol("USO").unwrap(), -2.5);
    }

    #[test]
    fn unquoted_symbol_has_no_change() {
        let mut ctx = ctx();
        ctx.set_tick(&[100.0, 40.0], at(2, 13));
        ctx.set_tick(&[f64::NAN, 39.0], at(3, 10));

        assert!(matches!(
            ctx.change_by_symbol("GLD"),
            Err(TradingError::PriceNotAvailable { .. })
        ));
        assert_eq!(ctx.change_by_symbol("USO").unwrap(), -2.5);
    }

    #[test]
    fn placed_order_is_returned() {
        let mut ctx = ctx();
        let order = ctx.place_order("GLD", false, 50.0).unwrap();
        assert!(order.is_short());
        assert_eq!(order.open_price, 100.0);
        assert_eq!(order, ctx.last_order("GLD").unwrap());
    }

    #[test]
    fn fx_close_commission_uses_the_open_price() {
        let mut ctx = SimContext::new(100_000.0, 2.0, vec!["EUR/USD".into()]);
        ctx.set_tick(&[1.10], at(2, 10));
        let order = ctx.place_order("EUR/USD", true, 10_000.0).unwrap();
        ctx.set_tick(&[1.20], at(2, 11));
        ctx.close_order(&order).unwrap();

        // Both legs priced off the 1.10 fill, not the 1.20 settlement.
        let per_leg = 10_000.0 * 1.10 * 0.00002;
        assert!((ctx.commissions() - 2.0 * per_leg).abs() < 1e-12);
        assert_eq!(ctx.realized_pl(), 10_000.0 * (1.20 - 1.10));
    }

    #[test]
    fn minute_history_windows_the_replay() {
        let mut ctx = ctx();
        ctx.append_history();
        ctx.set_tick(
            &[101.0, 41.0],
            Utc.with_ymd_and_hms(2020, 3, 2, 10, 30, 0).unwrap(),
        );
        ctx.append_history();

        let recent = ctx.history_in_minutes("GLD", 10).unwrap();
        assert_eq!(recent.to_vec(), vec![101.0]);
        let wider = ctx.history_in_minutes("GLD", 60).unwrap();
        assert_eq!(wider.to_vec(), vec![101.0, 100.0]);
    }

    #[test]
    fn history_is_newest_first() {
        let mut ctx = ctx();
        ctx.append_history();
        ctx.set_tick(&[101.0, 41.0], at(3, 10));
        ctx.append_history();

        let history = ctx.history_in_days("GLD", 5).unwrap();
        assert_eq!(history.to_vec(), vec![101.0, 100.0]);

        let full = ctx.history("USO").unwrap();
        assert_eq!(full.to_vec(), vec![41.0, 40.0]);
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let mut ctx = ctx();
        assert!(matches!(
            ctx.place_order("SPY", true, 1.0),
            Err(TradingError::UnknownContract { .. })
        ));
    }
}
