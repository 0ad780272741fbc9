//! Vector-valued series: several named columns on one shared time axis.

use super::{merge, DoubleSeries, Entry, TimeSeries};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Multiple named columns sharing a single timestamp axis.
///
/// Built by successively inner-joining single columns, so the axis holds only
/// instants present in every column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleDoubleSeries {
    names: Vec<String>,
    series: TimeSeries<Vec<f64>>,
}

impl MultipleDoubleSeries {
    /// An empty multi-series with a fixed column layout.
    pub fn with_names(names: Vec<String>) -> Self {
        Self {
            names,
            series: TimeSeries::new(),
        }
    }

    /// Join the given columns into one vector-valued series.
    ///
    /// # Panics
    /// If `columns` is empty, or any column is not strictly ascending.
    pub fn from_columns(columns: &[DoubleSeries]) -> Self {
        assert!(!columns.is_empty(), "from_columns requires a column");
        let mut names = vec![columns[0].name().to_string()];
        let mut series = columns[0].inner().map(|v| vec![*v]);
        for col in &columns[1..] {
            series = merge(&series, col.inner(), |row, v| {
                let mut row = row.clone();
                row.push(*v);
                row
            });
            names.push(col.name().to_string());
        }
        Self { names, series }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn get(&self, index: usize) -> &Entry<Vec<f64>> {
        self.series.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry<Vec<f64>>> {
        self.series.iter()
    }

    pub fn iter_rev(&self) -> impl Iterator<Item = &Entry<Vec<f64>>> {
        self.series.iter_rev()
    }

    pub fn is_ascending(&self) -> bool {
        self.series.is_ascending()
    }

    /// Append one aligned price vector.
    ///
    /// # Panics
    /// If the vector width does not match the column layout.
    pub fn push(&mut self, values: Vec<f64>, instant: DateTime<Utc>) {
        assert_eq!(
            values.len(),
            self.names.len(),
            "row width must match column count"
        );
        self.series.push(values, instant);
    }

    /// Extract one column by name.
    pub fn column(&self, name: &str) -> Option<DoubleSeries> {
        let index = self.index_of(name)?;
        let mut out = DoubleSeries::new(name);
        for e in self.series.iter() {
            out.push(e.value[index], e.instant);
        }
        Some(out)
    }
}
