use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::region::RegionCode;

/// Weekly values aligned index-for-index with a label axis. The axis is
/// shared by every series cut from the same matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries {
    labels: Arc<[String]>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Pads missing trailing values with 0 and drops values past the axis,
    /// so `labels().len() == values().len()` always holds.
    pub fn new(labels: Arc<[String]>, mut values: Vec<f64>) -> Self {
        values.resize(labels.len(), 0.0);
        Self { labels, values }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drops leading weeks below `threshold`; if no week ever reaches it,
    /// keeps the last `fallback_tail` weeks instead.
    pub fn trim(&self, threshold: f64, fallback_tail: usize) -> SeriesWindow<'_> {
        let n = self.values.len();
        let start = match self.values.iter().position(|v| *v >= threshold) {
            Some(i) => i,
            None => n.saturating_sub(fallback_tail),
        };
        SeriesWindow { labels: &self.labels[start..], values: &self.values[start..] }
    }
}

/// Borrowed, index-aligned slice of a [`TimeSeries`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesWindow<'a> {
    pub labels: &'a [String],
    pub values: &'a [f64],
}

impl SeriesWindow<'_> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    pub fn last_label(&self) -> Option<&str> {
        self.labels.last().map(String::as_str)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

/// Cache key: region plus normalized county name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub region: RegionCode,
    pub name: String,
}

/// Append-only memo of materialized county series. Entries are never
/// invalidated; the matrix they are cut from is immutable.
#[derive(Default)]
pub struct SeriesCache {
    entries: Mutex<HashMap<SeriesKey, Arc<TimeSeries>>>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached series for `key`, or builds it with `build` and
    /// caches the result. Misses (`build` returning `None`) are not cached.
    pub fn get_or_insert_with<F>(&self, key: SeriesKey, build: F) -> Option<Arc<TimeSeries>>
    where
        F: FnOnce() -> Option<TimeSeries>,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = entries.get(&key) {
            return Some(Arc::clone(hit));
        }
        let series = Arc::new(build()?);
        entries.insert(key, Arc::clone(&series));
        Some(series)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
