//! Pairs-trading specialization of the Kalman filter: a 2-state, 1-sensor
//! model tracking `[alpha, beta]` (intercept, dynamic hedge ratio).
//!
//! Each step observes `y = alpha + beta·x + noise` through `H = [1, x]`.
//! The innovation is the spread between the observed `y` and its prediction
//! from `x` — the trading signal.

use super::kalman::KalmanFilter;
use super::matrix::Matrix;

const STATE_COUNT: usize = 2;

/// Dynamic hedge-ratio estimator for a cointegrated pair.
#[derive(Debug, Clone)]
pub struct Cointegration {
    filter: KalmanFilter,
}

impl Cointegration {
    /// `delta` smooths the hedge ratio (smaller ⇒ more stable beta) via
    /// process noise `Q = I·(delta / (1 − delta))`; `r` is the scalar
    /// measurement noise.
    pub fn new(delta: f64, r: f64) -> Self {
        assert!(delta > 0.0 && delta < 1.0, "delta must be in (0, 1)");
        assert!(r > 0.0, "measurement noise must be positive");
        let mut filter = KalmanFilter::new(STATE_COUNT, 1);
        filter.set_transition(Matrix::identity(STATE_COUNT));
        filter.set_process_noise(Matrix::identity(STATE_COUNT).scale(delta / (1.0 - delta)));
        filter.set_measurement_noise(Matrix::scalar(r));
        Self { filter }
    }

    /// Feed one aligned price pair; rebuilds `H = [1, x]` and advances the
    /// filter one step with measurement `y`.
    pub fn step(&mut self, x: f64, y: f64) {
        self.filter.set_observation(Matrix::row_vector(&[1.0, x]));
        self.filter.step(&Matrix::scalar(y));
    }

    /// Intercept estimate.
    pub fn alpha(&self) -> f64 {
        self.filter.state().get(0, 0)
    }

    /// Hedge-ratio estimate.
    pub fn beta(&self) -> f64 {
        self.filter.state().get(1, 0)
    }

    /// Last innovation — the spread signal.
    ///
    /// # Panics
    /// If `step` has not been called yet.
    pub fn error(&self) -> f64 {
        self.filter.innovation().get(0, 0)
    }

    /// Last innovation covariance.
    ///
    /// # Panics
    /// If `step` has not been called yet.
    pub fn variance(&self) -> f64 {
        self.filter.innovation_covariance().get(0, 0)
    }
}
