//! FILENAME: facet-engine/src/search.rs
//! PURPOSE: Free-text search over the active record set.
//! CONTEXT: A thin convenience over the ordinary filter mechanism: a
//! dedicated dimension keys every record by its lowercased JSON
//! serialization, and searching applies a substring predicate to it. The
//! search therefore composes with all other filters like any dimension,
//! and clearing it is just clearing that dimension's filter.

use ledger::ExpandedRecord;

use crate::error::FacetError;
use crate::index::{DimensionHandle, FacetFilter, FacetIndex};
use crate::key::FacetKey;

/// Registers the search dimension on an index.
pub fn define_search_dimension(index: &mut FacetIndex) -> Result<DimensionHandle, FacetError> {
    index.define_dimension(|record| FacetKey::Text(serialized_form(record)))
}

fn serialized_form(record: &ExpandedRecord) -> String {
    // Serializing a plain data struct to JSON cannot fail.
    serde_json::to_string(record)
        .unwrap_or_default()
        .to_lowercase()
}

/// Restricts the active set to records whose serialized form contains the
/// search text, case-insensitively. An empty string clears the filter.
pub fn apply_search(
    index: &mut FacetIndex,
    dimension: DimensionHandle,
    text: &str,
) -> Result<(), FacetError> {
    if text.is_empty() {
        return index.filter(dimension, FacetFilter::All);
    }

    let needle = text.to_lowercase();
    index.filter(
        dimension,
        FacetFilter::Predicate(Box::new(move |key| match key {
            FacetKey::Text(serialized) => serialized.contains(&needle),
            _ => false,
        })),
    )
}
