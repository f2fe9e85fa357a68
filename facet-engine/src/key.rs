//! FILENAME: facet-engine/src/key.rs
//! PURPOSE: Ordered key type used to bucket records along a dimension.
//! CONTEXT: A dimension maps every record to one `FacetKey`. Keys must be
//! hashable (group accumulator maps) and totally ordered (sorted iteration,
//! top/bottom range queries), which rules out bare `f64`.

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

/// Wrapper around f64 that implements Eq, Ord and Hash so amounts can be
/// used as bucket keys. Ordering follows IEEE total order; NaN values are
/// equal to each other and sort after every number.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OrderedF64(f64);

impl OrderedF64 {
    pub fn new(value: f64) -> Self {
        // Collapse -0.0 into 0.0 so both land in the same bucket.
        if value == 0.0 {
            OrderedF64(0.0)
        } else {
            OrderedF64(value)
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl PartialEq for OrderedF64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for OrderedF64 {}

impl PartialOrd for OrderedF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for OrderedF64 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// A bucket key produced by a dimension's key function.
///
/// Keys of one dimension all share the same variant; the derived ordering
/// across variants only matters for heterogeneous composite keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FacetKey {
    Int(i64),
    Number(OrderedF64),
    Text(String),
    Date(NaiveDate),
    Composite(Vec<FacetKey>),
}

impl FacetKey {
    pub fn number(value: f64) -> Self {
        FacetKey::Number(OrderedF64::new(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        FacetKey::Text(value.into())
    }

    pub fn kind(&self) -> KeyKind {
        match self {
            FacetKey::Int(_) => KeyKind::Int,
            FacetKey::Number(_) => KeyKind::Number,
            FacetKey::Text(_) => KeyKind::Text,
            FacetKey::Date(_) => KeyKind::Date,
            FacetKey::Composite(_) => KeyKind::Composite,
        }
    }

    /// Numeric reading of the key, where one exists.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FacetKey::Int(v) => Some(*v as f64),
            FacetKey::Number(v) => Some(v.as_f64()),
            _ => None,
        }
    }
}

/// Discriminant of a `FacetKey`, used to validate filters against the key
/// type of the dimension they target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyKind {
    Int,
    Number,
    Text,
    Date,
    Composite,
}
