//! PairsLab CLI — run pairs-trading backtests from CSV closes.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file and print the report

mod config;
mod load;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{RunConfig, StrategyConfig};
use pairslab_core::backtest::render_report;
use pairslab_core::criteria::{AllOrdersOpen, DefaultStopLoss, NoOpenOrders};
use pairslab_core::series::MultipleDoubleSeries;
use pairslab_core::strategy::{BollingerStrategy, CointegrationStrategy, Strategy};
use pairslab_core::BackTest;

#[derive(Parser)]
#[command(name = "pairslab", about = "PairsLab — pairs-trading backtest runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Also write the full result as JSON to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, output } => run_backtest(&config, output.as_deref()),
    }
}

fn run_backtest(config_path: &std::path::Path, output: Option<&std::path::Path>) -> Result<()> {
    let config = RunConfig::load(config_path)?;

    let first = load::load_csv(&config.first.file, &config.first.symbol)?;
    let second = load::load_csv(&config.second.file, &config.second.symbol)?;
    let panel = MultipleDoubleSeries::from_columns(&[first, second]);
    anyhow::ensure!(
        !panel.is_empty(),
        "the two series share no timestamps; nothing to replay"
    );
    info!(
        ticks = panel.len(),
        first = %config.first.symbol,
        second = %config.second.symbol,
        "panel loaded"
    );

    let mut strategy = build_strategy(&config);
    let backtest = BackTest::new(config.deposit, config.leverage, panel);
    let result = backtest.run(strategy.as_mut());

    print!("{}", render_report(&result));

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "result written");
    }
    Ok(())
}

/// Assemble the configured strategy with the standard position gates.
fn build_strategy(config: &RunConfig) -> Box<dyn Strategy> {
    let symbols = [config.first.symbol.clone(), config.second.symbol.clone()];

    let mut strategy: Box<dyn Strategy> = match config.strategy {
        StrategyConfig::Bollinger {
            lookback,
            entry_z,
            exit_z,
        } => Box::new(BollingerStrategy::new(
            &symbols[0], &symbols[1], lookback, entry_z, exit_z,
        )),
        StrategyConfig::Cointegration {
            delta,
            r,
            entry_multiplier,
            exit_multiplier,
        } => Box::new(CointegrationStrategy::new(
            &symbols[0],
            &symbols[1],
            delta,
            r,
            entry_multiplier,
            exit_multiplier,
        )),
    };

    let criteria = strategy.criteria_mut();
    criteria.add_entry(Box::new(NoOpenOrders::new(symbols.clone())));
    criteria.add_exit(Box::new(AllOrdersOpen::new(symbols.clone())));
    if let Some(threshold) = config.stop_loss {
        criteria.add_stop_loss(Box::new(DefaultStopLoss::new(symbols, threshold)));
    }
    strategy
}
