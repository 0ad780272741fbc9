//! Rolling-regression z-score: fixed-window OLS hedge ratio plus a
//! standardized synthetic spread.
//!
//! With lookback `L`, the estimator keeps `2L − 1` observations of history.
//! Each scored tick regresses `y` on `[x, 1]` over the latest length-`L`
//! window (the x-coefficient is the hedge ratio), forms the synthetic spread
//! `y_port = y − hedge·x`, pushes it into a length-`L` buffer, and reports
//! `(y_port_latest − mean) / sample_std` over that buffer.
//!
//! Deterministic but stateful: feed exactly one `(x, y)` pair per tick —
//! out-of-order calls corrupt the rolling windows.

/// Rolling OLS hedge-ratio and z-score estimator for one instrument pair.
#[derive(Debug, Clone)]
pub struct RollingZScore {
    lookback: usize,
    first_history: Vec<f64>,
    second_history: Vec<f64>,
    recorded: usize,
    window: Option<Windows>,
    last_hedge_ratio: Option<f64>,
    last_z_score: Option<f64>,
}

#[derive(Debug, Clone)]
struct Windows {
    x: Vec<f64>,
    y: Vec<f64>,
    y_port: Vec<f64>,
}

impl RollingZScore {
    /// Streaming construction: the first `2L − 2` updates warm the history
    /// and return `0.0`; the `2L − 1`-th completes the buffer and yields the
    /// first real statistic.
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 2, "lookback must be at least 2");
        let size = 2 * lookback - 1;
        Self {
            lookback,
            first_history: vec![0.0; size],
            second_history: vec![0.0; size],
            recorded: 0,
            window: None,
            last_hedge_ratio: None,
            last_z_score: None,
        }
    }

    /// Pre-seeded construction: both histories must hold exactly `2L − 1`
    /// observations; the first `update` call scores immediately.
    ///
    /// # Panics
    /// If either slice is not exactly `2L − 1` long.
    pub fn with_history(first: &[f64], second: &[f64], lookback: usize) -> Self {
        assert!(lookback >= 2, "lookback must be at least 2");
        let size = 2 * lookback - 1;
        assert_eq!(
            first.len(),
            size,
            "first history must hold 2 * lookback - 1 observations"
        );
        assert_eq!(
            second.len(),
            size,
            "second history must hold 2 * lookback - 1 observations"
        );
        Self {
            lookback,
            first_history: first.to_vec(),
            second_history: second.to_vec(),
            recorded: size,
            window: None,
            last_hedge_ratio: None,
            last_z_score: None,
        }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Latest OLS hedge ratio, once one has been computed.
    pub fn hedge_ratio(&self) -> Option<f64> {
        self.last_hedge_ratio
    }

    /// Latest z-score, once one has been computed.
    pub fn last_z_score(&self) -> Option<f64> {
        self.last_z_score
    }

    /// Feed the next aligned price pair and return the z-score (`0.0` while
    /// the history buffer is still warming up).
    ///
    /// # Panics
    /// If either price is not strictly positive.
    pub fn update(&mut self, x_price: f64, y_price: f64) -> f64 {
        assert!(x_price > 0.0, "x price must be positive");
        assert!(y_price > 0.0, "y price must be positive");

        let size = 2 * self.lookback - 1;
        if self.recorded < size {
            self.first_history[self.recorded] = x_price;
            self.second_history[self.recorded] = y_price;
            self.recorded += 1;
            if self.recorded < size {
                return 0.0;
            }
            // Buffer just completed: seed the windows and score the history
            // itself; this tick's prices are already the newest observation.
            self.seed();
            let z = self.score_port();
            self.last_z_score = Some(z);
            return z;
        }

        if self.window.is_none() {
            self.seed();
        }
        self.slide(x_price, y_price)
    }

    /// Walk the length-`L` regression window across the recorded history,
    /// filling the spread buffer.
    fn seed(&mut self) {
        let l = self.lookback;
        let mut x = vec![0.0; l];
        let mut y = vec![0.0; l];
        x[..l - 1].copy_from_slice(&self.first_history[..l - 1]);
        y[..l - 1].copy_from_slice(&self.second_history[..l - 1]);
        let mut y_port = vec![0.0; l];
        let mut hedge = 0.0;
        for i in (l - 1)..(2 * l - 1) {
            x[l - 1] = self.first_history[i];
            y[l - 1] = self.second_history[i];
            hedge = ols_slope(&x, &y);
            y_port[i + 1 - l] = y[l - 1] - hedge * x[l - 1];
            shift_left(&mut x);
            shift_left(&mut y);
        }
        self.window = Some(Windows { x, y, y_port });
        self.last_hedge_ratio = Some(hedge);
    }

    /// Score the newest spread value against the current buffer without
    /// consuming a new observation.
    fn score_port(&self) -> f64 {
        let w = self.window.as_ref().expect("windows not seeded");
        let (mean, std) = mean_and_sample_std(&w.y_port);
        (w.y_port[self.lookback - 1] - mean) / std
    }

    /// Advance the windows one tick with fresh prices and score.
    fn slide(&mut self, x_price: f64, y_price: f64) -> f64 {
        let l = self.lookback;
        let w = self.window.as_mut().expect("windows not seeded");
        shift_left(&mut w.y_port);
        w.x[l - 1] = x_price;
        w.y[l - 1] = y_price;
        let hedge = ols_slope(&w.x, &w.y);
        w.y_port[l - 1] = y_price - hedge * x_price;
        let (mean, std) = mean_and_sample_std(&w.y_port);
        shift_left(&mut w.x);
        shift_left(&mut w.y);
        let z = (w.y_port[l - 1] - mean) / std;
        self.last_hedge_ratio = Some(hedge);
        self.last_z_score = Some(z);
        z
    }
}

/// Slope of the least-squares fit of `y` on `[x, 1]` (normal equations).
fn ols_slope(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let sx: f64 = x.iter().sum();
    let sy: f64 = y.iter().sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sxx: f64 = x.iter().map(|a| a * a).sum();
    let denom = n * sxx - sx * sx;
    assert!(denom.abs() > f64::EPSILON, "degenerate regression window");
    (n * sxy - sx * sy) / denom
}

fn mean_and_sample_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

fn shift_left(values: &mut [f64]) {
    for i in 0..values.len() - 1 {
        values[i] = values[i + 1];
    }
}
