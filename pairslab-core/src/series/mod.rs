//! Timestamp-ordered series: the alignment primitive under every estimator.
//!
//! A `TimeSeries<T>` is an append-only sequence of `(value, instant)` entries.
//! Algorithms that merge, lag, or difference two series require both to be
//! strictly time-ascending; violating that precondition panics rather than
//! silently misaligning.

mod double;
mod multiple;

pub use double::DoubleSeries;
pub use multiple::MultipleDoubleSeries;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single observation: a value at an instant. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<T> {
    pub value: T,
    pub instant: DateTime<Utc>,
}

impl<T> Entry<T> {
    pub fn new(value: T, instant: DateTime<Utc>) -> Self {
        Self { value, instant }
    }
}

/// Append-only sequence of timestamped entries.
///
/// Entries are stored in arrival order; callers that intend to merge or lag
/// must append in ascending timestamp order (there is no auto-sort).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for TimeSeries<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimeSeries<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn from_entries(entries: Vec<Entry<T>>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, value: T, instant: DateTime<Utc>) {
        self.entries.push(Entry::new(value, instant));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> &Entry<T> {
        &self.entries[index]
    }

    pub fn first(&self) -> Option<&Entry<T>> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&Entry<T>> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry<T>> {
        self.entries.iter()
    }

    /// Lazy, restartable walk over the backing storage in reverse order.
    /// No sorting work is performed.
    pub fn iter_rev(&self) -> impl Iterator<Item = &Entry<T>> {
        self.entries.iter().rev()
    }

    /// True iff every consecutive pair of timestamps is strictly increasing.
    pub fn is_ascending(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].instant < w[1].instant)
    }

    pub fn map<U, F: FnMut(&T) -> U>(&self, mut f: F) -> TimeSeries<U> {
        TimeSeries {
            entries: self
                .entries
                .iter()
                .map(|e| Entry::new(f(&e.value), e.instant))
                .collect(),
        }
    }
}

impl<T: Clone> TimeSeries<T> {
    /// A new series with entry order reversed.
    pub fn reversed(&self) -> Self {
        let mut entries = self.entries.clone();
        entries.reverse();
        Self { entries }
    }

    /// O(n) reversal only when the current order mismatches; identity
    /// otherwise.
    pub fn to_ascending(&self) -> Self {
        if self.is_ascending() {
            self.clone()
        } else {
            self.reversed()
        }
    }

    pub fn to_descending(&self) -> Self {
        if self.is_ascending() {
            self.reversed()
        } else {
            self.clone()
        }
    }

    /// Shift values forward by `k` positions: the entry at position `i + k`
    /// carries the value that was at position `i`. The first `k` entries are
    /// dropped.
    ///
    /// # Panics
    /// If `k == 0` or the series holds fewer than `k` entries.
    pub fn lag(&self, k: usize) -> Self {
        assert!(k > 0, "lag requires k > 0");
        assert!(self.len() >= k, "lag requires at least k entries");
        let entries = (k..self.len())
            .map(|i| Entry::new(self.entries[i - k].value.clone(), self.entries[i].instant))
            .collect();
        Self { entries }
    }

    /// Like [`lag`](Self::lag), but keeps the original length: the first `k`
    /// entries take `fill` at their original timestamps.
    pub fn lag_padded(&self, k: usize, fill: T) -> Self {
        assert!(k > 0, "lag requires k > 0");
        assert!(self.len() >= k, "lag requires at least k entries");
        let mut entries: Vec<Entry<T>> = (0..k)
            .map(|i| Entry::new(fill.clone(), self.entries[i].instant))
            .collect();
        entries.extend(
            (k..self.len())
                .map(|i| Entry::new(self.entries[i - k].value.clone(), self.entries[i].instant)),
        );
        Self { entries }
    }
}

impl<'a, T> IntoIterator for &'a TimeSeries<T> {
    type Item = &'a Entry<T>;
    type IntoIter = std::slice::Iter<'a, Entry<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Inner-join two series on their shared timestamps.
///
/// Walks both series with two cursors, advancing whichever points at the
/// earlier timestamp; when timestamps coincide, emits `f(a, b)` at the shared
/// instant. Entries with no counterpart in the other series are dropped.
///
/// # Panics
/// If either input is not strictly ascending.
pub fn merge<A, B, T, F>(a: &TimeSeries<A>, b: &TimeSeries<B>, mut f: F) -> TimeSeries<T>
where
    F: FnMut(&A, &B) -> T,
{
    assert!(a.is_ascending(), "merge requires ascending left series");
    assert!(b.is_ascending(), "merge requires ascending right series");

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let ea = a.get(i);
        let eb = b.get(j);
        match ea.instant.cmp(&eb.instant) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(Entry::new(f(&ea.value, &eb.value), ea.instant));
                i += 1;
                j += 1;
            }
        }
    }
    TimeSeries::from_entries(out)
}
