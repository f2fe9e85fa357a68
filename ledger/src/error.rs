//! FILENAME: ledger/src/error.rs

use thiserror::Error;

use crate::record::TransactionId;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Malformed record {id}: {reason}")]
    MalformedRecord { id: TransactionId, reason: String },

    #[error("Bin width must be non-zero")]
    DivisionByZero,
}
