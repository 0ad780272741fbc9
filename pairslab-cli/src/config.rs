//! TOML run configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// A full backtest run: account, data files, and strategy parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub deposit: f64,
    pub leverage: f64,
    pub first: LegConfig,
    pub second: LegConfig,
    pub strategy: StrategyConfig,
    /// Combined unrealized-loss stop, e.g. `-2000.0`. Off when absent.
    pub stop_loss: Option<f64>,
}

/// One leg of the pair: a symbol and its price CSV.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegConfig {
    pub symbol: String,
    pub file: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Rolling-regression z-score bands.
    Bollinger {
        lookback: usize,
        entry_z: f64,
        exit_z: f64,
    },
    /// Kalman spread with volatility bands.
    Cointegration {
        delta: f64,
        r: f64,
        entry_multiplier: f64,
        exit_multiplier: f64,
    },
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: RunConfig = toml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        anyhow::ensure!(config.deposit > 0.0, "deposit must be positive");
        anyhow::ensure!(config.leverage >= 1.0, "leverage must be at least 1");
        if let Some(threshold) = config.stop_loss {
            anyhow::ensure!(threshold < 0.0, "stop_loss must be negative");
        }
        Ok(config)
    }
}
