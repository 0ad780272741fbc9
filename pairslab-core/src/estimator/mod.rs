//! Signal estimators: the recursive dynamic hedge-ratio filter and the
//! rolling-regression z-score.

mod cointegration;
mod kalman;
mod matrix;
mod zscore;

pub use cointegration::Cointegration;
pub use kalman::KalmanFilter;
pub use matrix::Matrix;
pub use zscore::RollingZScore;
