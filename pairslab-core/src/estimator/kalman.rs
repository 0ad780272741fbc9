//! Generic single-step Bayesian linear filter (Kalman filter).
//!
//! Model: `n` states, `m` sensors, no control input beyond an optional
//! additive move vector `u`. Each step:
//!
//! 1. Predict:    `x' = F·x + u`,  `P' = F·P·Fᵀ + Q`
//! 2. Innovation: `y  = z − H·x'`, `S  = H·P'·Hᵀ + R`
//! 3. Gain:       `K  = P'·Hᵀ·S⁻¹`
//! 4. Correct:    `x  = x' + K·y`, `P  = (I − K·H)·P'`
//!
//! `S` must be invertible; failure to invert means the filter is
//! misconfigured and is treated as a fatal precondition violation.

use super::matrix::Matrix;

/// Recursive linear state-space estimator.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    state_count: usize,
    sensor_count: usize,
    /// x — state estimate, n×1.
    state: Matrix,
    /// P — state covariance, n×n.
    state_covariance: Matrix,
    /// F — state transition, n×n.
    transition: Matrix,
    /// Q — process noise added each prediction, n×n.
    process_noise: Matrix,
    /// H — observation matrix, m×n. Rebuilt by callers that regress on
    /// fresh data each step.
    observation: Matrix,
    /// R — measurement noise, m×m.
    measurement_noise: Matrix,
    /// u — optional additive move vector, n×1.
    move_vector: Matrix,
    /// y — last innovation, m×1.
    innovation: Option<Matrix>,
    /// S — last innovation covariance, m×m.
    innovation_covariance: Option<Matrix>,
}

impl KalmanFilter {
    /// A filter with zeroed state/noise and identity transition.
    pub fn new(state_count: usize, sensor_count: usize) -> Self {
        assert!(state_count > 0 && sensor_count > 0);
        Self {
            state_count,
            sensor_count,
            state: Matrix::zeros(state_count, 1),
            state_covariance: Matrix::zeros(state_count, state_count),
            transition: Matrix::identity(state_count),
            process_noise: Matrix::zeros(state_count, state_count),
            observation: Matrix::zeros(sensor_count, state_count),
            measurement_noise: Matrix::zeros(sensor_count, sensor_count),
            move_vector: Matrix::zeros(state_count, 1),
            innovation: None,
            innovation_covariance: None,
        }
    }

    pub fn set_state(&mut self, state: Matrix) {
        assert_eq!((state.rows(), state.cols()), (self.state_count, 1));
        self.state = state;
    }

    pub fn set_state_covariance(&mut self, p: Matrix) {
        assert_eq!((p.rows(), p.cols()), (self.state_count, self.state_count));
        self.state_covariance = p;
    }

    pub fn set_transition(&mut self, f: Matrix) {
        assert_eq!((f.rows(), f.cols()), (self.state_count, self.state_count));
        self.transition = f;
    }

    pub fn set_process_noise(&mut self, q: Matrix) {
        assert_eq!((q.rows(), q.cols()), (self.state_count, self.state_count));
        self.process_noise = q;
    }

    pub fn set_measurement_noise(&mut self, r: Matrix) {
        assert_eq!((r.rows(), r.cols()), (self.sensor_count, self.sensor_count));
        self.measurement_noise = r;
    }

    pub fn set_observation(&mut self, h: Matrix) {
        assert_eq!((h.rows(), h.cols()), (self.sensor_count, self.state_count));
        self.observation = h;
    }

    pub fn state(&self) -> &Matrix {
        &self.state
    }

    pub fn state_covariance(&self) -> &Matrix {
        &self.state_covariance
    }

    /// Last innovation `y`.
    ///
    /// # Panics
    /// If `step` has not been called yet.
    pub fn innovation(&self) -> &Matrix {
        self.innovation
            .as_ref()
            .expect("innovation queried before first step")
    }

    /// Last innovation covariance `S`.
    ///
    /// # Panics
    /// If `step` has not been called yet.
    pub fn innovation_covariance(&self) -> &Matrix {
        self.innovation_covariance
            .as_ref()
            .expect("innovation covariance queried before first step")
    }

    /// One predict/innovate/correct cycle with the standing move vector.
    pub fn step(&mut self, measurement: &Matrix) {
        assert_eq!(
            (measurement.rows(), measurement.cols()),
            (self.sensor_count, 1),
            "measurement dimension mismatch"
        );

        // Predict.
        let predicted_state = self.transition.multiply(&self.state).add(&self.move_vector);
        let predicted_covariance = self
            .transition
            .multiply(&self.state_covariance)
            .multiply(&self.transition.transpose())
            .add(&self.process_noise);

        // Innovation.
        let innovation = measurement.sub(&self.observation.multiply(&predicted_state));
        let innovation_covariance = self
            .observation
            .multiply(&predicted_covariance)
            .multiply(&self.observation.transpose())
            .add(&self.measurement_noise);

        // Gain. A singular S means the model is misconfigured.
        let s_inverse = innovation_covariance
            .inverse()
            .expect("innovation covariance is singular; filter misconfigured");
        let gain = predicted_covariance
            .multiply(&self.observation.transpose())
            .multiply(&s_inverse);

        // Correct.
        self.state = predicted_state.add(&gain.multiply(&innovation));
        self.state_covariance = Matrix::identity(self.state_count)
            .sub(&gain.multiply(&self.observation))
            .multiply(&predicted_covariance);

        self.innovation = Some(innovation);
        self.innovation_covariance = Some(innovation_covariance);
    }

    /// Step with an explicit move vector applied to this prediction and all
    /// subsequent ones.
    pub fn step_with_move(&mut self, measurement: &Matrix, move_vector: Matrix) {
        assert_eq!((move_vector.rows(), move_vector.cols()), (self.state_count, 1));
        self.move_vector = move_vector;
        self.step(measurement);
    }
}
