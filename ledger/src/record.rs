//! FILENAME: ledger/src/record.rs
//! PURPOSE: Data model for shared-expense transaction records.
//! CONTEXT: A `RawRecord` is one transaction as delivered by the backend:
//! one payer, one amount, one or more beneficiaries. The aggregation layer
//! operates on flat per-beneficiary rows instead, so each raw record is
//! expanded into one authoritative row (attributed to the payer) plus one
//! shadow row per non-paying beneficiary. See `expand`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Identifier of an original transaction. Always >= 0 for real rows.
pub type TransactionId = i64;

/// Sentinel ID carried by shadow rows. Not a valid join key; any measure
/// that counts "real transactions" must skip rows with this ID.
pub const SHADOW_ID: TransactionId = -1;

/// Category whose full negative effect is borne by the payer.
pub const AMORTIZATION_CATEGORY: &str = "Amortization";

/// Beneficiary lists are almost always two or three names.
pub type Beneficiaries = SmallVec<[String; 4]>;

/// One transaction as delivered by the backend (JSON array of these).
/// Field names on the wire are capitalized, matching the backend schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "ID")]
    pub id: TransactionId,

    #[serde(rename = "Date")]
    pub date: NaiveDate,

    #[serde(rename = "Category")]
    pub category: String,

    /// The agent who paid for this transaction.
    #[serde(rename = "Payer")]
    pub payer: String,

    /// Order preserved, duplicates NOT removed. A duplicated name inflates
    /// the divisor and produces duplicate shadow rows; the backend is
    /// expected to keep the list clean.
    #[serde(rename = "Beneficiaries")]
    pub beneficiaries: Beneficiaries,

    /// Negative for expenses, positive for income.
    #[serde(rename = "Amount")]
    pub amount: f64,

    #[serde(rename = "Subject", default)]
    pub subject: String,

    #[serde(rename = "Comment", default)]
    pub comment: String,

    #[serde(rename = "Partner", default)]
    pub partner: String,
}

/// One flat per-beneficiary row derived from exactly one `RawRecord`.
///
/// Authoritative row: keeps the original ID, `beneficiary` is the payer,
/// `original_amount` is the raw amount and `amount` is the payer's
/// attributed share.
///
/// Shadow row: `id` is `SHADOW_ID`, `original_amount` is 0 and `amount` is
/// the equal share of the raw amount for one non-paying beneficiary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedRecord {
    #[serde(rename = "ID")]
    pub id: TransactionId,

    /// Truncated to the first of the month, for monthly bucketing.
    #[serde(rename = "Date")]
    pub date: NaiveDate,

    /// The untouched calendar date of the transaction.
    #[serde(rename = "ExactDate")]
    pub exact_date: NaiveDate,

    #[serde(rename = "Category")]
    pub category: String,

    #[serde(rename = "Payer")]
    pub payer: String,

    #[serde(rename = "Beneficiaries")]
    pub beneficiaries: Beneficiaries,

    /// Attributed share for this row's beneficiary.
    #[serde(rename = "Amount")]
    pub amount: f64,

    /// Raw amount of the originating transaction (0 on shadow rows).
    #[serde(rename = "originalAmount")]
    pub original_amount: f64,

    /// `floor(amount / bin_width) * bin_width`, for histogram bucketing.
    #[serde(rename = "roundedAmount")]
    pub rounded_amount: f64,

    /// The specific beneficiary this row represents.
    #[serde(rename = "Beneficiary")]
    pub beneficiary: String,

    #[serde(rename = "Subject", default)]
    pub subject: String,

    #[serde(rename = "Comment", default)]
    pub comment: String,

    #[serde(rename = "Partner", default)]
    pub partner: String,
}

impl ExpandedRecord {
    /// True for synthetic per-beneficiary rows.
    pub fn is_shadow(&self) -> bool {
        self.id == SHADOW_ID
    }

    /// True if the originating transaction is an amortization.
    pub fn is_amortization(&self) -> bool {
        self.category == AMORTIZATION_CATEGORY
    }
}
