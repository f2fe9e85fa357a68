//! FILENAME: facet-engine/src/error.rs

use thiserror::Error;

use crate::key::KeyKind;

#[derive(Error, Debug)]
pub enum FacetError {
    #[error("Operation requires a non-empty active record set")]
    EmptyDataset,

    #[error("Filter key type {found:?} does not match dimension key type {expected:?}")]
    TypeMismatch { expected: KeyKind, found: KeyKind },

    #[error("At most {limit} dimensions are supported per index")]
    DimensionLimit { limit: usize },

    #[error(transparent)]
    Ledger(#[from] ledger::LedgerError),
}
