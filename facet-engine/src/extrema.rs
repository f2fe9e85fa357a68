//! FILENAME: facet-engine/src/extrema.rs
//! PURPOSE: Min/max bounds the presentation layer needs to size its axes.
//! CONTEXT: Purely derived from the index; stateless. Date bounds come from
//! the month dimension's extreme records and are padded so axis endpoints
//! do not clip marks. Amount bounds read the extreme records' original
//! amounts. The per-user-and-type group has no bottom operation, so its
//! bounds fall back to a linear scan seeded at zero.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::error::FacetError;
use crate::index::{DimensionHandle, FacetIndex, GroupHandle};
use crate::view::AggregateView;

/// Padding applied on each side of the date bounds.
const DATE_PADDING_DAYS: i64 = 5;

/// Axis bounds bundle, computed once per session build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extrema {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub min_amount: f64,
    pub max_amount: f64,
    pub min_by_user_and_type: f64,
    pub max_by_user_and_type: f64,
    pub max_expense_by_month: f64,
    pub max_income_by_month: f64,
}

pub fn compute_extrema(
    index: &FacetIndex,
    month: DimensionHandle,
    amount: DimensionHandle,
    by_user_and_type: GroupHandle,
    expense_by_month: GroupHandle,
    income_by_month: GroupHandle,
) -> Result<Extrema, FacetError> {
    let earliest = index
        .bottom(month, 1)?
        .first()
        .map(|record| record.exact_date)
        .ok_or(FacetError::EmptyDataset)?;
    let latest = index
        .top(month, 1)?
        .first()
        .map(|record| record.exact_date)
        .ok_or(FacetError::EmptyDataset)?;

    let min_amount = index
        .bottom(amount, 1)?
        .first()
        .map(|record| record.original_amount)
        .ok_or(FacetError::EmptyDataset)?;
    let max_amount = index
        .top(amount, 1)?
        .first()
        .map(|record| record.original_amount)
        .ok_or(FacetError::EmptyDataset)?;

    let mut min_by_user_and_type = 0.0;
    let mut max_by_user_and_type = 0.0;
    for entry in index.group_entries(by_user_and_type) {
        let value = entry.value.magnitude();
        if value < min_by_user_and_type {
            min_by_user_and_type = value;
        }
        if value > max_by_user_and_type {
            max_by_user_and_type = value;
        }
    }

    let max_expense_by_month = peak(index, expense_by_month)?;
    let max_income_by_month = peak(index, income_by_month)?;

    Ok(Extrema {
        min_date: earliest - Duration::days(DATE_PADDING_DAYS),
        max_date: latest + Duration::days(DATE_PADDING_DAYS),
        min_amount,
        max_amount,
        min_by_user_and_type,
        max_by_user_and_type,
        max_expense_by_month,
        max_income_by_month,
    })
}

/// Largest value of a group's output.
fn peak(index: &FacetIndex, group: GroupHandle) -> Result<f64, FacetError> {
    let top = AggregateView::base(index, group).top(1)?;
    top.first()
        .map(|entry| entry.value.magnitude())
        .ok_or(FacetError::EmptyDataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::FacetKey;
    use crate::reduce::SumReducer;
    use ledger::{expand, Beneficiaries, RawRecord};

    fn raw(id: i64, date: (i32, u32, u32), amount: f64, payer: &str) -> RawRecord {
        RawRecord {
            id,
            date: chrono::NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            category: "Dinner".to_string(),
            payer: payer.to_string(),
            beneficiaries: [payer.to_string()].into_iter().collect::<Beneficiaries>(),
            amount,
            subject: String::new(),
            comment: String::new(),
            partner: String::new(),
        }
    }

    #[test]
    fn test_date_bounds_are_padded_by_five_days() {
        let rows = expand(
            &[
                raw(1, (2024, 1, 10), -20.0, "A"),
                raw(2, (2024, 3, 15), 80.0, "B"),
            ],
            100.0,
        )
        .unwrap();
        let mut index = FacetIndex::new(rows);
        let month = index.define_dimension(|d| FacetKey::Date(d.date)).unwrap();
        let amount = index
            .define_dimension(|d| FacetKey::number(d.amount))
            .unwrap();
        let payer = index
            .define_dimension(|d| FacetKey::text(d.payer.clone()))
            .unwrap();
        let by_payer = index.define_group(payer, SumReducer::new(|d| d.amount));
        let expense = index.define_group(
            month,
            SumReducer::new(|d| if d.amount < 0.0 { -d.amount } else { 0.0 }),
        );
        let income = index.define_group(
            month,
            SumReducer::new(|d| if d.amount > 0.0 { d.amount } else { 0.0 }),
        );

        let extrema = compute_extrema(&index, month, amount, by_payer, expense, income).unwrap();
        assert_eq!(
            extrema.min_date,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(
            extrema.max_date,
            chrono::NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
        );
        assert_eq!(extrema.min_amount, -20.0);
        assert_eq!(extrema.max_amount, 80.0);
        assert_eq!(extrema.min_by_user_and_type, -20.0);
        assert_eq!(extrema.max_by_user_and_type, 80.0);
        assert_eq!(extrema.max_expense_by_month, 20.0);
        assert_eq!(extrema.max_income_by_month, 80.0);
    }

    #[test]
    fn test_empty_record_set_fails() {
        let mut index = FacetIndex::new(Vec::new());
        let month = index.define_dimension(|d| FacetKey::Date(d.date)).unwrap();
        let amount = index
            .define_dimension(|d| FacetKey::number(d.amount))
            .unwrap();
        let group = index.define_group(month, SumReducer::new(|d| d.amount));

        let result = compute_extrema(&index, month, amount, group, group, group);
        assert!(matches!(result, Err(FacetError::EmptyDataset)));
    }
}
