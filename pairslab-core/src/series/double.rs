//! Named numeric series with elementwise arithmetic and returns.

use super::{merge, Entry, TimeSeries};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named series of `f64` observations.
///
/// Binary operations against another series align on shared timestamps
/// (inner join); scalar operations map in place. The result keeps the
/// left-hand name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoubleSeries {
    name: String,
    series: TimeSeries<f64>,
}

impl DoubleSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            series: TimeSeries::new(),
        }
    }

    pub fn from_series(name: impl Into<String>, series: TimeSeries<f64>) -> Self {
        Self {
            name: name.into(),
            series,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inner(&self) -> &TimeSeries<f64> {
        &self.series
    }

    pub fn push(&mut self, value: f64, instant: DateTime<Utc>) {
        self.series.push(value, instant);
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn get(&self, index: usize) -> &Entry<f64> {
        self.series.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry<f64>> {
        self.series.iter()
    }

    pub fn is_ascending(&self) -> bool {
        self.series.is_ascending()
    }

    pub fn to_ascending(&self) -> Self {
        Self::from_series(self.name.clone(), self.series.to_ascending())
    }

    pub fn to_descending(&self) -> Self {
        Self::from_series(self.name.clone(), self.series.to_descending())
    }

    pub fn reversed(&self) -> Self {
        Self::from_series(self.name.clone(), self.series.reversed())
    }

    pub fn lag(&self, k: usize) -> Self {
        Self::from_series(self.name.clone(), self.series.lag(k))
    }

    /// Last observed value.
    ///
    /// # Panics
    /// If the series is empty.
    pub fn last_value(&self) -> f64 {
        self.series
            .last()
            .expect("last_value on empty series")
            .value
    }

    /// The final `n` entries as a new series.
    pub fn tail(&self, n: usize) -> Self {
        assert!(n <= self.len(), "tail longer than series");
        let entries = self.series.iter().skip(self.len() - n).cloned().collect();
        Self::from_series(self.name.clone(), TimeSeries::from_entries(entries))
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.series.iter().map(|e| e.value).collect()
    }

    pub fn map_values(&self, f: impl FnMut(&f64) -> f64) -> Self {
        Self::from_series(self.name.clone(), self.series.map(f))
    }

    /// Elementwise combination on shared timestamps.
    pub fn merge_with(&self, other: &DoubleSeries, f: impl FnMut(&f64, &f64) -> f64) -> Self {
        Self::from_series(self.name.clone(), merge(&self.series, &other.series, f))
    }

    pub fn add_series(&self, other: &DoubleSeries) -> Self {
        self.merge_with(other, |a, b| a + b)
    }

    pub fn mul_series(&self, other: &DoubleSeries) -> Self {
        self.merge_with(other, |a, b| a * b)
    }

    pub fn div_series(&self, other: &DoubleSeries) -> Self {
        self.merge_with(other, |a, b| a / b)
    }

    pub fn add_scalar(&self, v: f64) -> Self {
        self.map_values(|x| x + v)
    }

    pub fn mul_scalar(&self, v: f64) -> Self {
        self.map_values(|x| x * v)
    }

    /// One-period simple returns: `(s / lag(1)) - 1`.
    pub fn returns(&self) -> Self {
        self.returns_over(1)
    }

    /// `k`-period simple returns: `(s / lag(k)) - 1`.
    pub fn returns_over(&self, k: usize) -> Self {
        self.div_series(&self.lag(k)).add_scalar(-1.0)
    }
}
