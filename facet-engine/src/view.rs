//! FILENAME: facet-engine/src/view.rs
//! PURPOSE: Read-only transforms over a group's output sequence.
//! CONTEXT: Presentation consumers all speak the same contract -
//! `all_entries()`, `top(n)`, `bottom(n)` - whether they read a group
//! directly or through a derived shape (running totals, a single labeled
//! bin, zero-bucket removal, display rounding). Views hold no state of
//! their own; every call re-reads the underlying group, so results are
//! always consistent with the filters in effect.

use crate::error::FacetError;
use crate::index::{Entry, FacetIndex, GroupHandle};
use crate::key::FacetKey;
use crate::reduce::AggregateValue;

/// A composable, read-only window onto a group.
pub enum AggregateView<'a> {
    /// The group's own output, in ascending key order.
    Base {
        index: &'a FacetIndex,
        group: GroupHandle,
    },

    /// Running totals over the wrapped view's key order. Only meaningful
    /// when that order is ascending, which `Base` guarantees.
    Cumulative(Box<AggregateView<'a>>),

    /// Collapses the wrapped view into one bucket holding the ordered
    /// series of its numeric values (distributional consumption).
    SingleBin {
        inner: Box<AggregateView<'a>>,
        label: String,
    },

    /// Drops buckets with a zero entry count. Applied before any top/bottom
    /// truncation, so N never undercounts.
    EmptyFiltered(Box<AggregateView<'a>>),

    /// Rounds numeric values half away from zero at a decimal count, as
    /// currency display expects.
    Rounded {
        inner: Box<AggregateView<'a>>,
        decimals: u32,
    },
}

/// Rounds half away from zero at `decimals` places.
///
/// Scales on the decimal rendering of the value instead of multiplying,
/// so inputs with no exact binary form (1.005, 0.285) still round on
/// their decimal digits.
fn round_half_away(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let shifted = format!("{value}e{decimals}")
        .parse::<f64>()
        .unwrap_or(value * factor);
    shifted.round() / factor
}

impl<'a> AggregateView<'a> {
    pub fn base(index: &'a FacetIndex, group: GroupHandle) -> Self {
        AggregateView::Base { index, group }
    }

    pub fn cumulative(self) -> Self {
        AggregateView::Cumulative(Box::new(self))
    }

    pub fn single_bin(self, label: impl Into<String>) -> Self {
        AggregateView::SingleBin {
            inner: Box::new(self),
            label: label.into(),
        }
    }

    pub fn without_empty_bins(self) -> Self {
        AggregateView::EmptyFiltered(Box::new(self))
    }

    pub fn rounded(self, decimals: u32) -> Self {
        AggregateView::Rounded {
            inner: Box::new(self),
            decimals,
        }
    }

    /// The full output sequence in the underlying key order.
    pub fn all_entries(&self) -> Vec<Entry> {
        match self {
            AggregateView::Base { index, group } => index.group_entries(*group),

            AggregateView::Cumulative(inner) => {
                let mut running = 0.0;
                inner
                    .all_entries()
                    .into_iter()
                    .map(|entry| {
                        running += entry.value.magnitude();
                        Entry {
                            key: entry.key,
                            value: AggregateValue::Number(running),
                        }
                    })
                    .collect()
            }

            AggregateView::SingleBin { inner, label } => {
                let series: Vec<f64> = inner
                    .all_entries()
                    .iter()
                    .map(|entry| entry.value.magnitude())
                    .collect();
                vec![Entry {
                    key: FacetKey::text(label.clone()),
                    value: AggregateValue::Series(series),
                }]
            }

            AggregateView::EmptyFiltered(inner) => inner
                .all_entries()
                .into_iter()
                .filter(|entry| entry.value.count() != 0)
                .collect(),

            AggregateView::Rounded { inner, decimals } => inner
                .all_entries()
                .into_iter()
                .map(|entry| Entry {
                    key: entry.key,
                    value: match entry.value {
                        AggregateValue::Number(v) => {
                            AggregateValue::Number(round_half_away(v, *decimals))
                        }
                        AggregateValue::Series(values) => AggregateValue::Series(
                            values
                                .into_iter()
                                .map(|v| round_half_away(v, *decimals))
                                .collect(),
                        ),
                        bucket @ AggregateValue::Bucket { .. } => bucket,
                    },
                })
                .collect(),
        }
    }

    /// The N entries with the largest values. Zero-bucket removal (if any)
    /// happens before truncation.
    pub fn top(&self, n: usize) -> Result<Vec<Entry>, FacetError> {
        self.select(n, true)
    }

    /// The N entries with the smallest values.
    pub fn bottom(&self, n: usize) -> Result<Vec<Entry>, FacetError> {
        self.select(n, false)
    }

    fn select(&self, n: usize, descending: bool) -> Result<Vec<Entry>, FacetError> {
        let mut entries = self.all_entries();
        if entries.is_empty() {
            return Err(FacetError::EmptyDataset);
        }

        // Stable sort: ties keep key order.
        entries.sort_by(|a, b| {
            let ordering = a.value.magnitude().total_cmp(&b.value.magnitude());
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        entries.truncate(n);
        Ok(entries)
    }
}
