//! FILENAME: ledger/src/lib.rs
//! PURPOSE: Main library entry point for the shared-expense ledger model.
//! CONTEXT: Re-exports record types and the expansion routine for use by
//! the aggregation crate.

pub mod error;
pub mod expand;
pub mod record;

// Re-export commonly used types at the crate root
pub use error::LedgerError;
pub use expand::{expand, first_of_month};
pub use record::{
    Beneficiaries, ExpandedRecord, RawRecord, TransactionId, AMORTIZATION_CATEGORY, SHADOW_ID,
};
