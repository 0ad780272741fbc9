//! CSV price loading: `date,close` rows into a timestamp-ordered series.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use pairslab_core::DoubleSeries;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Row {
    date: String,
    close: f64,
}

/// Parse a timestamp as RFC 3339, `%Y-%m-%d %H:%M:%S`, or a bare date
/// (taken as midnight UTC).
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("unrecognized timestamp {text:?}"))?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc())
}

/// Load one symbol's closes. Rows may be in either direction on disk; the
/// result is ascending.
pub fn load_csv(path: &Path, symbol: &str) -> Result<DoubleSeries> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut series = DoubleSeries::new(symbol);
    for (index, row) in reader.deserialize::<Row>().enumerate() {
        let row = row.with_context(|| format!("{}: row {}", path.display(), index + 2))?;
        anyhow::ensure!(
            row.close.is_finite() && row.close > 0.0,
            "{}: row {}: close must be positive",
            path.display(),
            index + 2
        );
        let instant = parse_instant(&row.date)
            .with_context(|| format!("{}: row {}", path.display(), index + 2))?;
        series.push(row.close, instant);
    }
    anyhow::ensure!(!series.is_empty(), "{} holds no rows", path.display());
    Ok(series.to_ascending())
}
