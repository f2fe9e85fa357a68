//! FILENAME: facet-engine/src/lib.rs
//! Dimensional aggregation subsystem for the shared-expense dashboard.
//!
//! This crate turns the expanded record set from `ledger` into the
//! dimensions, measures and axis bounds the presentation layer binds its
//! charts to. It depends on `ledger` only for the record model.
//!
//! Layers:
//! - `key`: Ordered bucket keys (what records are grouped BY)
//! - `reduce`: Incremental reducers (HOW buckets accumulate)
//! - `index`: The crossfilter-style index (WHERE filters and groups live)
//! - `view`: Read-only transforms over group output (WHAT charts consume)
//! - `extrema` / `search` / `dashboard`: the session-level surface

pub mod dashboard;
pub mod error;
pub mod extrema;
pub mod index;
pub mod key;
pub mod reduce;
pub mod search;
pub mod view;

pub use dashboard::{Dashboard, DashboardDimensions, DashboardMeasures};
pub use error::FacetError;
pub use extrema::{compute_extrema, Extrema};
pub use index::{
    DimensionHandle, Entry, FacetFilter, FacetIndex, GroupHandle, MAX_DIMENSIONS,
};
pub use key::{FacetKey, KeyKind, OrderedF64};
pub use reduce::{
    community_balance_reducer, community_contribution, AggregateValue, Reducer, SumReducer,
    TransactionBucketReducer,
};
pub use search::{apply_search, define_search_dimension};
pub use view::AggregateView;
