//! PairsLab Core — statistical-arbitrage pairs-trading engine.
//!
//! This crate contains the heart of the system:
//! - Timestamp-ordered series with alignment, lag, and arithmetic
//! - Recursive dynamic hedge-ratio estimator (Kalman filter) and its
//!   cointegration specialization
//! - Rolling-regression z-score estimator
//! - Composable entry/exit/stop-loss criteria with asymmetric aggregation
//! - Strategy state machine and concrete pair strategies
//! - Deterministic backtest simulator with position, commission, and P&L
//!   bookkeeping
//! - Thread-safe feed/cache primitives for the live path

pub mod backtest;
pub mod context;
pub mod criteria;
pub mod domain;
pub mod estimator;
pub mod live;
pub mod series;
pub mod stats;
pub mod strategy;

pub use backtest::{BackTest, BackTestResult, SimContext};
pub use context::{TradingContext, TradingError};
pub use criteria::{Criterion, CriterionError};
pub use domain::{ClosedOrder, Order, Side};
pub use estimator::{Cointegration, KalmanFilter, RollingZScore};
pub use series::{DoubleSeries, Entry, MultipleDoubleSeries, TimeSeries};
