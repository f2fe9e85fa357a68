//! FILENAME: facet-engine/src/index.rs
//! PURPOSE: In-memory multi-dimensional index over expanded records.
//! CONTEXT: Holds the session's working set in an arena and maintains named
//! dimensions (key extractors) and groups (incremental reductions) over it.
//! Filters on distinct dimensions compose as logical AND. A group ignores
//! the filter of its own dimension, so a brushed histogram keeps showing
//! its own bars - the standard crossfilter contract.
//!
//! Per-record bookkeeping is a 32-bit mask with one bit per dimension
//! (bit set = record fails that dimension's filter). A record is active
//! overall when its mask is zero, and active for a group when the mask is
//! zero after clearing the group's own dimension bit. Filtering therefore
//! touches each group only for records whose membership actually changes,
//! and groups on the filtered dimension are exempt by construction.

use log::debug;
use rustc_hash::FxHashMap;
use serde::Serialize;

use ledger::ExpandedRecord;

use crate::error::FacetError;
use crate::key::{FacetKey, KeyKind};
use crate::reduce::{AggregateValue, Reducer};

/// One filter bit per dimension in a u32 mask.
pub const MAX_DIMENSIONS: usize = 32;

/// Bucket key used by groups defined over the whole index.
const GROUP_ALL_KEY: FacetKey = FacetKey::Int(0);

/// Opaque handle to a registered dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionHandle(usize);

/// Opaque handle to a registered group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupHandle(usize);

/// One {key, value} pair of a group's output sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub key: FacetKey,
    pub value: AggregateValue,
}

/// Restriction applied to a dimension's keys.
///
/// `Exact` and `Range` are validated against the dimension's key type and
/// fail with `TypeMismatch` on a mismatch; a `Predicate` is opaque and
/// cannot be checked. `All` clears the dimension's filter.
pub enum FacetFilter {
    All,
    Exact(FacetKey),
    /// Half-open interval: `from <= key < to`.
    Range { from: FacetKey, to: FacetKey },
    Predicate(Box<dyn Fn(&FacetKey) -> bool>),
}

struct Dimension {
    key_fn: Box<dyn Fn(&ExpandedRecord) -> FacetKey>,
    /// Pre-computed key per record, by arena index.
    keys: Vec<FacetKey>,
    /// Key type of this dimension (None when the arena is empty).
    kind: Option<KeyKind>,
    /// Arena indices in ascending key order (ties by arena order).
    sorted: Vec<u32>,
}

struct Group {
    /// Dimension whose filter this group ignores; None for group-all,
    /// which every filter affects.
    dimension: Option<usize>,
    reducer: Box<dyn Reducer>,
    accumulators: FxHashMap<FacetKey, AggregateValue>,
}

impl Group {
    /// Mask selecting the filter bits this group responds to.
    fn mask(&self) -> u32 {
        match self.dimension {
            Some(d) => !(1u32 << d),
            None => u32::MAX,
        }
    }
}

/// The session index. Built once over the expanded working set; filters
/// mutate which records are active but never the records themselves.
pub struct FacetIndex {
    records: Vec<ExpandedRecord>,
    /// Bit d set = record fails dimension d's filter.
    filter_bits: Vec<u32>,
    dimensions: Vec<Dimension>,
    groups: Vec<Group>,
    active_count: usize,
}

impl FacetIndex {
    pub fn new(records: Vec<ExpandedRecord>) -> Self {
        debug!("building facet index over {} records", records.len());
        let count = records.len();
        FacetIndex {
            records,
            filter_bits: vec![0; count],
            dimensions: Vec::new(),
            groups: Vec::new(),
            active_count: count,
        }
    }

    /// The full arena, regardless of filters.
    pub fn records(&self) -> &[ExpandedRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&ExpandedRecord> {
        self.records.get(index)
    }

    /// Number of records passing every filter.
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Records passing every filter, in arena order.
    pub fn all_records(&self) -> Vec<&ExpandedRecord> {
        self.records
            .iter()
            .zip(self.filter_bits.iter())
            .filter_map(|(record, &bits)| (bits == 0).then_some(record))
            .collect()
    }

    /// Registers a dimension by its key-extraction function.
    pub fn define_dimension(
        &mut self,
        key_fn: impl Fn(&ExpandedRecord) -> FacetKey + 'static,
    ) -> Result<DimensionHandle, FacetError> {
        if self.dimensions.len() >= MAX_DIMENSIONS {
            return Err(FacetError::DimensionLimit {
                limit: MAX_DIMENSIONS,
            });
        }

        let keys: Vec<FacetKey> = self.records.iter().map(&key_fn).collect();
        let kind = keys.first().map(FacetKey::kind);

        let mut sorted: Vec<u32> = (0..self.records.len() as u32).collect();
        sorted.sort_by(|&a, &b| {
            keys[a as usize]
                .cmp(&keys[b as usize])
                .then_with(|| a.cmp(&b))
        });

        self.dimensions.push(Dimension {
            key_fn: Box::new(key_fn),
            keys,
            kind,
            sorted,
        });
        Ok(DimensionHandle(self.dimensions.len() - 1))
    }

    /// Registers a group on a dimension. Buckets exist for every distinct
    /// key in the arena; records currently excluded by other dimensions'
    /// filters simply leave their bucket at the initial value.
    pub fn define_group(
        &mut self,
        dimension: DimensionHandle,
        reducer: impl Reducer + 'static,
    ) -> GroupHandle {
        self.install_group(Some(dimension.0), Box::new(reducer))
    }

    /// Registers a group over the whole index, affected by every filter.
    /// Its single bucket is read through `group_value`.
    pub fn define_group_all(&mut self, reducer: impl Reducer + 'static) -> GroupHandle {
        self.install_group(None, Box::new(reducer))
    }

    fn install_group(&mut self, dimension: Option<usize>, reducer: Box<dyn Reducer>) -> GroupHandle {
        let mut group = Group {
            dimension,
            reducer,
            accumulators: FxHashMap::default(),
        };
        let mask = group.mask();
        let Group {
            reducer,
            accumulators,
            ..
        } = &mut group;

        for (i, record) in self.records.iter().enumerate() {
            let key = match dimension {
                Some(d) => self.dimensions[d].keys[i].clone(),
                None => GROUP_ALL_KEY,
            };
            let acc = accumulators.entry(key).or_insert_with(|| reducer.initial());
            if self.filter_bits[i] & mask == 0 {
                reducer.add(acc, record, i);
            }
        }

        self.groups.push(group);
        GroupHandle(self.groups.len() - 1)
    }

    /// Replaces the filter on a dimension and incrementally re-derives
    /// every group's accumulators for records entering or leaving their
    /// active sets. Groups on the filtered dimension are untouched.
    pub fn filter(
        &mut self,
        dimension: DimensionHandle,
        filter: FacetFilter,
    ) -> Result<(), FacetError> {
        let d = dimension.0;

        if let Some(kind) = self.dimensions[d].kind {
            let check = |key: &FacetKey| -> Result<(), FacetError> {
                if key.kind() != kind {
                    return Err(FacetError::TypeMismatch {
                        expected: kind,
                        found: key.kind(),
                    });
                }
                Ok(())
            };
            match &filter {
                FacetFilter::Exact(key) => check(key)?,
                FacetFilter::Range { from, to } => {
                    check(from)?;
                    check(to)?;
                }
                FacetFilter::All | FacetFilter::Predicate(_) => {}
            }
        }

        let bit = 1u32 << d;
        let mut entered = 0usize;
        let mut left = 0usize;

        for i in 0..self.records.len() {
            let key = &self.dimensions[d].keys[i];
            let passes = match &filter {
                FacetFilter::All => true,
                FacetFilter::Exact(k) => key == k,
                FacetFilter::Range { from, to } => key >= from && key < to,
                FacetFilter::Predicate(p) => p(key),
            };

            let old_bits = self.filter_bits[i];
            let new_bits = if passes {
                old_bits & !bit
            } else {
                old_bits | bit
            };
            if new_bits == old_bits {
                continue;
            }
            self.filter_bits[i] = new_bits;

            if new_bits == 0 {
                self.active_count += 1;
                entered += 1;
            } else if old_bits == 0 {
                self.active_count -= 1;
                left += 1;
            }

            let record = &self.records[i];
            for group in &mut self.groups {
                let mask = group.mask();
                let was_active = old_bits & mask == 0;
                let is_active = new_bits & mask == 0;
                if was_active == is_active {
                    continue;
                }

                let key = match group.dimension {
                    Some(gd) => self.dimensions[gd].keys[i].clone(),
                    None => GROUP_ALL_KEY,
                };
                let Group {
                    reducer,
                    accumulators,
                    ..
                } = group;
                let acc = accumulators.entry(key).or_insert_with(|| reducer.initial());
                if is_active {
                    reducer.add(acc, record, i);
                } else {
                    reducer.remove(acc, record, i);
                }
            }
        }

        debug!(
            "filter on dimension {}: {} entered, {} left, {} active",
            d, entered, left, self.active_count
        );
        Ok(())
    }

    /// The N records with the largest keys on a dimension, among records
    /// passing every filter.
    pub fn top(
        &self,
        dimension: DimensionHandle,
        n: usize,
    ) -> Result<Vec<&ExpandedRecord>, FacetError> {
        self.select(dimension, n, true)
    }

    /// The N records with the smallest keys on a dimension.
    pub fn bottom(
        &self,
        dimension: DimensionHandle,
        n: usize,
    ) -> Result<Vec<&ExpandedRecord>, FacetError> {
        self.select(dimension, n, false)
    }

    fn select(
        &self,
        dimension: DimensionHandle,
        n: usize,
        descending: bool,
    ) -> Result<Vec<&ExpandedRecord>, FacetError> {
        if self.active_count == 0 {
            return Err(FacetError::EmptyDataset);
        }

        let sorted = &self.dimensions[dimension.0].sorted;
        let order: Box<dyn Iterator<Item = &u32>> = if descending {
            Box::new(sorted.iter().rev())
        } else {
            Box::new(sorted.iter())
        };

        let mut out = Vec::with_capacity(n.min(self.active_count));
        for &i in order {
            if self.filter_bits[i as usize] == 0 {
                out.push(&self.records[i as usize]);
                if out.len() == n {
                    break;
                }
            }
        }
        Ok(out)
    }

    /// A group's output sequence in ascending key order.
    pub fn group_entries(&self, group: GroupHandle) -> Vec<Entry> {
        let group = &self.groups[group.0];
        let mut entries: Vec<Entry> = group
            .accumulators
            .iter()
            .map(|(key, value)| Entry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// The single accumulator of a group-all.
    pub fn group_value(&self, group: GroupHandle) -> AggregateValue {
        let group = &self.groups[group.0];
        group
            .accumulators
            .get(&GROUP_ALL_KEY)
            .cloned()
            .unwrap_or_else(|| group.reducer.initial())
    }

    /// Evaluates a dimension's key function against a record.
    pub fn dimension_key(&self, dimension: DimensionHandle, record: &ExpandedRecord) -> FacetKey {
        (self.dimensions[dimension.0].key_fn)(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduce::{SumReducer, TransactionBucketReducer};
    use ledger::{expand, Beneficiaries, RawRecord};

    fn raw(id: i64, day: u32, amount: f64, category: &str, payer: &str) -> RawRecord {
        RawRecord {
            id,
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            category: category.to_string(),
            payer: payer.to_string(),
            beneficiaries: [payer.to_string()].into_iter().collect::<Beneficiaries>(),
            amount,
            subject: String::new(),
            comment: String::new(),
            partner: String::new(),
        }
    }

    fn build_index() -> (FacetIndex, DimensionHandle, DimensionHandle) {
        let rows = expand(
            &[
                raw(1, 1, -50.0, "Rent", "A"),
                raw(2, 2, -20.0, "Dinner", "B"),
                raw(3, 3, 100.0, "Salary", "A"),
                raw(4, 4, -30.0, "Dinner", "A"),
            ],
            100.0,
        )
        .unwrap();

        let mut index = FacetIndex::new(rows);
        let category = index
            .define_dimension(|d| FacetKey::text(d.category.clone()))
            .unwrap();
        let payer = index
            .define_dimension(|d| FacetKey::text(d.payer.clone()))
            .unwrap();
        (index, category, payer)
    }

    #[test]
    fn test_group_entries_in_key_order() {
        let (mut index, category, _) = build_index();
        let sums = index.define_group(category, SumReducer::new(|d| d.amount));

        let entries = index.group_entries(sums);
        let keys: Vec<&FacetKey> = entries.iter().map(|e| &e.key).collect();
        assert_eq!(
            keys,
            vec![
                &FacetKey::text("Dinner"),
                &FacetKey::text("Rent"),
                &FacetKey::text("Salary")
            ]
        );
        assert_eq!(entries[0].value, AggregateValue::Number(-50.0));
    }

    #[test]
    fn test_filters_compose_as_and() {
        let (mut index, category, payer) = build_index();

        index
            .filter(category, FacetFilter::Exact(FacetKey::text("Dinner")))
            .unwrap();
        assert_eq!(index.active_count(), 2);

        index
            .filter(payer, FacetFilter::Exact(FacetKey::text("A")))
            .unwrap();
        assert_eq!(index.active_count(), 1);
        assert_eq!(index.all_records()[0].id, 4);
    }

    #[test]
    fn test_self_group_is_exempt_from_own_filter() {
        let (mut index, category, payer) = build_index();
        let by_category = index.define_group(category, SumReducer::new(|d| d.amount));
        let by_payer = index.define_group(payer, SumReducer::new(|d| d.amount));

        index
            .filter(category, FacetFilter::Exact(FacetKey::text("Dinner")))
            .unwrap();

        // The category group still shows every bar.
        let total: f64 = index
            .group_entries(by_category)
            .iter()
            .map(|e| e.value.magnitude())
            .sum();
        assert_eq!(total, 0.0); // -50 - 20 + 100 - 30

        // The payer group shrank to dinner records only.
        let entries = index.group_entries(by_payer);
        let a = entries
            .iter()
            .find(|e| e.key == FacetKey::text("A"))
            .unwrap();
        assert_eq!(a.value, AggregateValue::Number(-30.0));
    }

    #[test]
    fn test_clearing_a_filter_restores_accumulators() {
        let (mut index, category, payer) = build_index();
        let by_payer = index.define_group(payer, SumReducer::new(|d| d.amount));

        let before = index.group_entries(by_payer);
        index
            .filter(category, FacetFilter::Exact(FacetKey::text("Rent")))
            .unwrap();
        index.filter(category, FacetFilter::All).unwrap();
        let after = index.group_entries(by_payer);

        assert_eq!(before, after);
        assert_eq!(index.active_count(), 4);
    }

    #[test]
    fn test_range_filter_is_half_open() {
        let (mut index, _, _) = build_index();
        let amount = index
            .define_dimension(|d| FacetKey::number(d.amount))
            .unwrap();

        index
            .filter(
                amount,
                FacetFilter::Range {
                    from: FacetKey::number(-50.0),
                    to: FacetKey::number(100.0),
                },
            )
            .unwrap();
        // 100.0 itself is excluded.
        assert_eq!(index.active_count(), 3);
    }

    #[test]
    fn test_top_and_bottom_respect_filters() {
        let (mut index, category, _) = build_index();
        let amount = index
            .define_dimension(|d| FacetKey::number(d.amount))
            .unwrap();

        let top = index.top(amount, 2).unwrap();
        assert_eq!(top[0].amount, 100.0);
        assert_eq!(top[1].amount, -20.0);

        let bottom = index.bottom(amount, 1).unwrap();
        assert_eq!(bottom[0].amount, -50.0);

        index
            .filter(category, FacetFilter::Exact(FacetKey::text("Dinner")))
            .unwrap();
        let top = index.top(amount, 2).unwrap();
        assert_eq!(top[0].amount, -20.0);
        assert_eq!(top[1].amount, -30.0);
    }

    #[test]
    fn test_top_on_empty_active_set_fails() {
        let (mut index, category, _) = build_index();
        let amount = index
            .define_dimension(|d| FacetKey::number(d.amount))
            .unwrap();

        index
            .filter(category, FacetFilter::Exact(FacetKey::text("Nonexistent")))
            .unwrap();
        assert!(matches!(
            index.top(amount, 1),
            Err(FacetError::EmptyDataset)
        ));
    }

    #[test]
    fn test_exact_filter_with_wrong_key_type_fails() {
        let (mut index, category, _) = build_index();
        let err = index
            .filter(category, FacetFilter::Exact(FacetKey::Int(3)))
            .unwrap_err();
        assert!(matches!(
            err,
            FacetError::TypeMismatch {
                expected: KeyKind::Text,
                found: KeyKind::Int
            }
        ));
    }

    #[test]
    fn test_group_defined_under_active_filter_seeds_empty_buckets() {
        let (mut index, category, payer) = build_index();
        index
            .filter(payer, FacetFilter::Exact(FacetKey::text("B")))
            .unwrap();

        let by_category = index.define_group(category, TransactionBucketReducer);
        let entries = index.group_entries(by_category);

        // Every distinct category has a bucket; only B's dinner counts.
        assert_eq!(entries.len(), 3);
        let dinner = entries
            .iter()
            .find(|e| e.key == FacetKey::text("Dinner"))
            .unwrap();
        assert_eq!(dinner.value.count(), 1);
        let rent = entries
            .iter()
            .find(|e| e.key == FacetKey::text("Rent"))
            .unwrap();
        assert_eq!(rent.value.count(), 0);
    }

    #[test]
    fn test_group_all_sees_every_filter() {
        let (mut index, category, _) = build_index();
        let balance = index.define_group_all(SumReducer::new(|d| d.amount));

        assert_eq!(index.group_value(balance), AggregateValue::Number(0.0));

        index
            .filter(category, FacetFilter::Exact(FacetKey::text("Salary")))
            .unwrap();
        assert_eq!(index.group_value(balance), AggregateValue::Number(100.0));
    }
}
