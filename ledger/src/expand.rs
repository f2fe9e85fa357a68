//! FILENAME: ledger/src/expand.rs
//! PURPOSE: Expands raw transactions into flat per-beneficiary rows.
//! CONTEXT: The aggregation layer needs one row per beneficiary so that
//! per-user measures (balance by beneficiary, community balance) fall out
//! of ordinary grouping. Every raw transaction becomes one authoritative
//! row plus one shadow row per non-paying beneficiary, such that the
//! attributed amounts of all rows of a transaction sum back to its raw
//! amount (amortizations excepted, where the payer bears the full
//! reversed effect).

use chrono::{Datelike, NaiveDate};

use crate::error::LedgerError;
use crate::record::{ExpandedRecord, RawRecord, AMORTIZATION_CATEGORY, SHADOW_ID};

/// Truncates a date to the first day of its month.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month.
    date.with_day(1).unwrap_or(date)
}

/// Buckets an amount onto the histogram grid: `floor(amount / width) * width`.
fn bin_amount(amount: f64, bin_width: f64) -> f64 {
    (amount / bin_width).floor() * bin_width
}

/// Expands raw transactions into per-beneficiary rows.
///
/// Deterministic and all-or-nothing: the first malformed record fails the
/// whole batch, no partially expanded set is ever returned. Output order is
/// all authoritative rows (input order) followed by all shadow rows.
///
/// `bin_width` is the histogram bin width applied to each row's attributed
/// amount; it must be non-zero.
pub fn expand(raw: &[RawRecord], bin_width: f64) -> Result<Vec<ExpandedRecord>, LedgerError> {
    if bin_width == 0.0 {
        return Err(LedgerError::DivisionByZero);
    }

    let mut authoritative = Vec::with_capacity(raw.len());
    let mut shadows = Vec::new();

    for record in raw {
        if record.beneficiaries.is_empty() {
            return Err(LedgerError::MalformedRecord {
                id: record.id,
                reason: "empty beneficiary list".to_string(),
            });
        }

        // The divisor deliberately includes duplicates; see RawRecord docs.
        let share_count = record.beneficiaries.len() as f64;
        let payer_is_beneficiary = record.beneficiaries.iter().any(|b| b == &record.payer);

        // Attributed share for the payer. A transaction needs correcting
        // whenever anyone besides the payer is involved.
        let attributed = if !payer_is_beneficiary || record.beneficiaries.len() > 1 {
            if record.category == AMORTIZATION_CATEGORY {
                // Payer bears the full reversed effect of an amortization.
                -record.amount
            } else if payer_is_beneficiary {
                record.amount / share_count
            } else {
                0.0
            }
        } else {
            // Single beneficiary and it is the payer: nothing to split.
            record.amount
        };

        let base = ExpandedRecord {
            id: record.id,
            date: first_of_month(record.date),
            exact_date: record.date,
            category: record.category.clone(),
            payer: record.payer.clone(),
            beneficiaries: record.beneficiaries.clone(),
            amount: attributed,
            original_amount: record.amount,
            rounded_amount: bin_amount(attributed, bin_width),
            beneficiary: record.payer.clone(),
            subject: record.subject.clone(),
            comment: record.comment.clone(),
            partner: record.partner.clone(),
        };

        // One shadow row per non-paying beneficiary. Shadow rows carry the
        // sentinel ID and a zero original amount so that transaction counts
        // and table views can skip them.
        let share = record.amount / share_count;
        for beneficiary in &record.beneficiaries {
            if beneficiary != &record.payer {
                let mut shadow = base.clone();
                shadow.id = SHADOW_ID;
                shadow.amount = share;
                shadow.original_amount = 0.0;
                shadow.rounded_amount = bin_amount(share, bin_width);
                shadow.beneficiary = beneficiary.clone();
                shadows.push(shadow);
            }
        }

        authoritative.push(base);
    }

    authoritative.extend(shadows);
    Ok(authoritative)
}
