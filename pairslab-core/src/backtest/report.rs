//! Plain-text summary of a finished backtest.

use crate::backtest::BackTestResult;
use crate::domain::Instrument;

/// Render the trade table and headline metrics as a printable block.
pub fn render_report(result: &BackTestResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:>4}  {:>10}  {:>4}  {:>8}  {:>20}  {:>20}  {:>10}  {:>10}  {:>12}\n",
        "id", "amount", "side", "instr", "opened", "closed", "open", "close", "pl"
    ));
    for closed in &result.closed_orders {
        let order = &closed.order;
        out.push_str(&format!(
            "{:>4}  {:>10.2}  {:>4}  {:>8}  {:>20}  {:>20}  {:>10.2}  {:>10.2}  {:>12.2}\n",
            order.id,
            order.amount.abs(),
            order.side().to_string(),
            format!("{:?}", Instrument::of(&order.symbol)),
            order.open_instant.format("%Y-%m-%d %H:%M"),
            closed.close_instant.format("%Y-%m-%d %H:%M"),
            order.open_price,
            closed.close_price,
            closed.pl,
        ));
    }

    out.push('\n');
    out.push_str(&format!("trades:            {}\n", result.closed_orders.len()));
    out.push_str(&format!("commissions:       {:.2}\n", result.commissions));
    out.push_str(&format!("realized P&L:      {:.2}\n", result.realized_pl));
    out.push_str(&format!("final value:       {:.2}\n", result.final_value()));
    out.push_str(&format!(
        "return rate:       {:.2}%\n",
        result.return_rate() * 100.0
    ));
    out.push_str(&format!(
        "annualized return: {:.2}%\n",
        result.annualized_return() * 100.0
    ));
    out.push_str(&format!("sharpe ratio:      {:.2}\n", result.sharpe_ratio()));
    let drawdown = result.max_drawdown();
    out.push_str(&format!(
        "max drawdown:      {:.2} ({:.2}%)\n",
        drawdown.absolute,
        drawdown.percent * 100.0
    ));
    if result.margin_called {
        out.push_str("margin call: replay stopped early\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClosedOrder, Order};
    use chrono::{TimeZone, Utc};

    #[test]
    fn report_carries_trades_and_metrics() {
        let open = Utc.with_ymd_and_hms(2020, 3, 2, 10, 0, 0).unwrap();
        let close = Utc.with_ymd_and_hms(2020, 3, 6, 10, 0, 0).unwrap();
        let order = Order::new(1, "GLD", open, 100.0, 50.0);
        let result = BackTestResult {
            deposit: 100_000.0,
            closed_orders: vec![ClosedOrder::new(order, close, 104.0)],
            realized_pl: 200.0,
            commissions: 2.0,
            pl_history: vec![0.0, 150.0, 200.0],
            funds_history: vec![100_000.0, 100_150.0, 100_200.0],
            instants: vec![open, open + chrono::Duration::days(2), close],
            margin_called: false,
        };

        let report = render_report(&result);
        assert!(report.contains("Buy"));
        assert!(report.contains("final value:       100200.00"));
        assert!(report.contains("trades:            1"));
        assert!(!report.contains("margin call"));
    }

    #[test]
    fn margin_call_is_called_out() {
        let result = BackTestResult {
            deposit: 10_000.0,
            closed_orders: vec![],
            realized_pl: 0.0,
            commissions: 0.0,
            pl_history: vec![0.0],
            funds_history: vec![-1.0],
            instants: vec![Utc.with_ymd_and_hms(2020, 3, 2, 10, 0, 0).unwrap()],
            margin_called: true,
        };
        assert!(render_report(&result).contains("margin call"));
    }
}
