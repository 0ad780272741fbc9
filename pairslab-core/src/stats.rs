//! Performance statistics — pure functions over numeric arrays.
//!
//! Every function is equity-curve in, scalar (or small struct) out; no
//! dependency on the backtest engine or context.

/// Trading-day annualization factor.
pub const TRADING_DAYS: f64 = 250.0;

/// Maximum peak-to-trough decline of a series, in absolute and percent terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawdown {
    /// Largest `value - running_peak` (≤ 0).
    pub absolute: f64,
    /// Largest `value / running_peak - 1` (≤ 0).
    pub percent: f64,
}

/// Compute the maximum drawdown against the running peak.
///
/// Returns zeros for empty or never-declining series.
pub fn drawdown(series: &[f64]) -> Drawdown {
    let mut peak = match series.first() {
        Some(&v) => v,
        None => {
            return Drawdown {
                absolute: 0.0,
                percent: 0.0,
            }
        }
    };
    let mut absolute = 0.0f64;
    let mut percent = 0.0f64;
    for &x in series {
        absolute = absolute.min(x - peak);
        if peak != 0.0 {
            percent = percent.min(x / peak - 1.0);
        }
        peak = peak.max(x);
    }
    Drawdown { absolute, percent }
}

/// Annualized Sharpe ratio (risk-free rate 0) from daily returns:
/// `mean / sample_std * sqrt(250)`.
///
/// Returns 0 when fewer than two observations or zero variance.
pub fn sharpe(daily_returns: &[f64]) -> f64 {
    if daily_returns.len() < 2 {
        return 0.0;
    }
    let mean = daily_returns.iter().sum::<f64>() / daily_returns.len() as f64;
    let var = daily_returns
        .iter()
        .map(|r| (r - mean).powi(2))
        .sum::<f64>()
        / (daily_returns.len() - 1) as f64;
    if var == 0.0 {
        return 0.0;
    }
    mean / var.sqrt() * TRADING_DAYS.sqrt()
}

/// One-period simple returns: `s[i] / s[i-1] - 1`. Empty for len ≤ 1.
pub fn simple_returns(series: &[f64]) -> Vec<f64> {
    if series.len() <= 1 {
        return Vec::new();
    }
    series.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_returns_basic() {
        let r = simple_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.10).abs() < 1e-12);
        assert!((r[1] - (99.0 / 110.0 - 1.0)).abs() < 1e-12);
        assert!(simple_returns(&[42.0]).is_empty());
        assert!(simple_returns(&[]).is_empty());
    }

    #[test]
    fn drawdown_of_rising_series_is_zero() {
        let dd = drawdown(&[1.0, 2.0, 3.0]);
        assert_eq!(dd.absolute, 0.0);
        assert_eq!(dd.percent, 0.0);
    }

    #[test]
    fn drawdown_measures_peak_to_trough() {
        // Peak 120, trough 90 after the peak.
        let dd = drawdown(&[100.0, 120.0, 90.0, 110.0]);
        assert!((dd.absolute - (-30.0)).abs() < 1e-12);
        assert!((dd.percent - (90.0 / 120.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn drawdown_uses_running_peak_not_global_max() {
        // The later higher peak must not retroactively deepen the early dip.
        let dd = drawdown(&[100.0, 95.0, 200.0]);
        assert!((dd.absolute - (-5.0)).abs() < 1e-12);
    }

    #[test]
    fn sharpe_of_constant_returns_is_zero() {
        assert_eq!(sharpe(&[0.01, 0.01, 0.01]), 0.0);
        assert_eq!(sharpe(&[0.01]), 0.0);
    }

    #[test]
    fn sharpe_scales_mean_over_std() {
        let returns = [0.01, -0.01, 0.02, 0.0];
        let mean = 0.005f64;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 3.0;
        let expected = mean / var.sqrt() * 250.0f64.sqrt();
        assert!((sharpe(&returns) - expected).abs() < 1e-12);
    }
}
