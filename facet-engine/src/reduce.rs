//! FILENAME: facet-engine/src/reduce.rs
//! PURPOSE: Incremental reducers maintained by the index per group bucket.
//! CONTEXT: A reducer bundles three operations - initial, add, remove -
//! where add and remove are exact inverses over multiset membership:
//! removing a previously added record restores the accumulator to its
//! pre-add state, regardless of how distinct records interleave. The index
//! relies on this to keep every group consistent while filters toggle
//! records in and out of the active set.

use ledger::{ExpandedRecord, AMORTIZATION_CATEGORY};
use serde::Serialize;

/// Accumulated value of one group bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AggregateValue {
    /// A running sum.
    Number(f64),

    /// A collection of authoritative transactions, by record index.
    Bucket {
        transactions: Vec<usize>,
        count: usize,
    },

    /// An ordered series of numeric values. Never produced by a reducer;
    /// only by the single-bin view.
    Series(Vec<f64>),
}

impl AggregateValue {
    /// Number of contributing entries. Emptiness is a property of bucket
    /// collections; a sum is always one entry, even when it nets to zero.
    pub fn count(&self) -> usize {
        match self {
            AggregateValue::Number(_) => 1,
            AggregateValue::Bucket { count, .. } => *count,
            AggregateValue::Series(values) => values.len(),
        }
    }

    /// Numeric magnitude used for ordering entries by value.
    pub fn magnitude(&self) -> f64 {
        match self {
            AggregateValue::Number(v) => *v,
            AggregateValue::Bucket { count, .. } => *count as f64,
            AggregateValue::Series(values) => values.len() as f64,
        }
    }
}

/// The incremental/decremental aggregation contract.
pub trait Reducer {
    /// Fresh accumulator for an empty bucket.
    fn initial(&self) -> AggregateValue;

    /// Folds a record into the accumulator.
    fn add(&self, acc: &mut AggregateValue, record: &ExpandedRecord, record_index: usize);

    /// Exact inverse of `add` for the same record.
    fn remove(&self, acc: &mut AggregateValue, record: &ExpandedRecord, record_index: usize);
}

/// Sums an arbitrary per-record value.
pub struct SumReducer {
    value: Box<dyn Fn(&ExpandedRecord) -> f64>,
}

impl SumReducer {
    pub fn new(value: impl Fn(&ExpandedRecord) -> f64 + 'static) -> Self {
        SumReducer {
            value: Box::new(value),
        }
    }
}

impl Reducer for SumReducer {
    fn initial(&self) -> AggregateValue {
        AggregateValue::Number(0.0)
    }

    fn add(&self, acc: &mut AggregateValue, record: &ExpandedRecord, _record_index: usize) {
        if let AggregateValue::Number(total) = acc {
            *total += (self.value)(record);
        }
    }

    fn remove(&self, acc: &mut AggregateValue, record: &ExpandedRecord, _record_index: usize) {
        if let AggregateValue::Number(total) = acc {
            *total -= (self.value)(record);
        }
    }
}

/// Collects authoritative transactions per bucket. Shadow rows never count,
/// so the bucket reflects real transactions only.
pub struct TransactionBucketReducer;

impl Reducer for TransactionBucketReducer {
    fn initial(&self) -> AggregateValue {
        AggregateValue::Bucket {
            transactions: Vec::new(),
            count: 0,
        }
    }

    fn add(&self, acc: &mut AggregateValue, record: &ExpandedRecord, record_index: usize) {
        if record.is_shadow() {
            return;
        }
        if let AggregateValue::Bucket {
            transactions,
            count,
        } = acc
        {
            transactions.push(record_index);
            *count += 1;
        }
    }

    fn remove(&self, acc: &mut AggregateValue, record: &ExpandedRecord, record_index: usize) {
        if record.is_shadow() {
            return;
        }
        if let AggregateValue::Bucket {
            transactions,
            count,
        } = acc
        {
            if let Some(position) = transactions.iter().position(|&i| i == record_index) {
                transactions.remove(position);
                *count -= 1;
            }
        }
    }
}

/// Net contribution of one row to the community pool.
///
/// Authoritative self-rows contribute what the payer put in beyond their
/// own share (`amount - original_amount`, zero when no split happened);
/// amortization rows carry the already reversed amount in full. Shadow rows
/// contribute their share, since someone else paid it for them. Everything
/// else is irrelevant to the pool.
pub fn community_contribution(record: &ExpandedRecord) -> f64 {
    if !record.is_shadow() && record.payer == record.beneficiary {
        if record.category == AMORTIZATION_CATEGORY {
            return record.amount;
        }
        return record.amount - record.original_amount;
    }

    if record.is_shadow() && record.payer != record.beneficiary {
        return record.amount;
    }

    0.0
}

/// Reducer for the community-balance measure, keyed by beneficiary.
pub fn community_balance_reducer() -> SumReducer {
    SumReducer::new(community_contribution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::{expand, Beneficiaries, RawRecord};
    use smallvec::smallvec;

    fn record(amount: f64, category: &str, payer: &str, beneficiaries: &[&str]) -> RawRecord {
        RawRecord {
            id: 1,
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            category: category.to_string(),
            payer: payer.to_string(),
            beneficiaries: beneficiaries
                .iter()
                .map(|b| b.to_string())
                .collect::<Beneficiaries>(),
            amount,
            subject: String::new(),
            comment: String::new(),
            partner: String::new(),
        }
    }

    fn single(amount: f64) -> RawRecord {
        let mut r = record(amount, "Dinner", "A", &["A"]);
        r.beneficiaries = smallvec!["A".to_string()];
        r
    }

    #[test]
    fn test_sum_add_remove_are_inverses() {
        let rows = expand(&[single(25.0), single(-10.0)], 100.0).unwrap();
        let reducer = SumReducer::new(|d| d.amount);

        let mut acc = reducer.initial();
        reducer.add(&mut acc, &rows[0], 0);
        reducer.add(&mut acc, &rows[1], 1);
        reducer.remove(&mut acc, &rows[1], 1);
        reducer.remove(&mut acc, &rows[0], 0);
        assert_eq!(acc, AggregateValue::Number(0.0));
    }

    #[test]
    fn test_bucket_skips_shadow_rows() {
        let rows = expand(&[record(90.0, "Dinner", "A", &["A", "B"])], 100.0).unwrap();
        let reducer = TransactionBucketReducer;

        let mut acc = reducer.initial();
        for (i, row) in rows.iter().enumerate() {
            reducer.add(&mut acc, row, i);
        }
        assert_eq!(acc.count(), 1);

        for (i, row) in rows.iter().enumerate() {
            reducer.remove(&mut acc, row, i);
        }
        assert_eq!(acc.count(), 0);
    }

    #[test]
    fn test_community_contribution_cases() {
        // Three-way split: payer covered 60 for others, shadows owe 30 each.
        let rows = expand(&[record(90.0, "Dinner", "A", &["A", "B", "C"])], 100.0).unwrap();
        assert_eq!(community_contribution(&rows[0]), -60.0);
        assert_eq!(community_contribution(&rows[1]), 30.0);
        assert_eq!(community_contribution(&rows[2]), 30.0);

        // No split: irrelevant to the pool.
        let rows = expand(&[single(40.0)], 100.0).unwrap();
        assert_eq!(community_contribution(&rows[0]), 0.0);

        // Amortization: the authoritative row carries the reversed amount.
        let rows = expand(&[record(90.0, "Amortization", "A", &["A", "B", "C"])], 100.0).unwrap();
        assert_eq!(community_contribution(&rows[0]), -90.0);
        assert_eq!(community_contribution(&rows[1]), 30.0);

        // Payer not a beneficiary: paid 90 into the pool, B received 90.
        let rows = expand(&[record(90.0, "Dinner", "A", &["B"])], 100.0).unwrap();
        assert_eq!(community_contribution(&rows[0]), -90.0);
        assert_eq!(community_contribution(&rows[1]), 90.0);
    }
}
