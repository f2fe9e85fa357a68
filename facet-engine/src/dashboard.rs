//! FILENAME: facet-engine/src/dashboard.rs
//! PURPOSE: The per-session context object consumed by the presentation layer.
//! CONTEXT: Builds one index over the expanded working set and registers
//! every dimension and measure the dashboard charts read, then exposes them
//! by name. All state lives in this object; there is no shared registry.
//! Rendering, chart configuration and DOM wiring stay outside this crate.

use chrono::{Datelike, Duration, NaiveDate};
use log::{debug, info};

use ledger::{expand, RawRecord};

use crate::error::FacetError;
use crate::extrema::{compute_extrema, Extrema};
use crate::index::{DimensionHandle, FacetFilter, FacetIndex, GroupHandle};
use crate::key::FacetKey;
use crate::reduce::{community_balance_reducer, SumReducer, TransactionBucketReducer};
use crate::search::{apply_search, define_search_dimension};
use crate::view::AggregateView;

/// Truncates a date to the Sunday starting its week.
fn week_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// Handles of every registered dimension, by chart concern.
pub struct DashboardDimensions {
    pub amount: DimensionHandle,
    pub rounded_amount: DimensionHandle,
    /// Month of the exact date; drives the time line chart.
    pub month: DimensionHandle,
    /// Same key as `month`, registered separately so the monthly-balance
    /// chart has a dimension of its own to brush.
    pub balance_month: DimensionHandle,
    pub category: DimensionHandle,
    /// Sunday-based week of the exact date.
    pub week: DimensionHandle,
    pub transaction_id: DimensionHandle,
    /// (exact date, original amount, income/expense label) for the scatter.
    pub scatter: DimensionHandle,
    pub payer: DimensionHandle,
    /// (income/expense label, payer).
    pub payer_by_type: DimensionHandle,
    pub beneficiary: DimensionHandle,
    pub income_expense: DimensionHandle,
    pub search: DimensionHandle,
}

/// Handles of every registered measure.
pub struct DashboardMeasures {
    pub sum_by_month: GroupHandle,
    pub expense_sum_by_month: GroupHandle,
    pub revenue_sum_by_month: GroupHandle,
    pub sum_by_category: GroupHandle,
    /// Transaction buckets by ID; read through `transaction_table`.
    pub table_by_id: GroupHandle,
    /// Group-all bucket of authoritative transactions.
    pub transaction_count: GroupHandle,
    /// Group-all sum of attributed amounts.
    pub total_balance: GroupHandle,
    pub frequency_by_week: GroupHandle,
    pub histogram_by_amount: GroupHandle,
    pub scatter: GroupHandle,
    pub paid_by_payer: GroupHandle,
    pub received_by_payer: GroupHandle,
    pub net_by_payer: GroupHandle,
    pub net_by_payer_and_type: GroupHandle,
    pub net_by_beneficiary: GroupHandle,
    pub community_balance: GroupHandle,
    /// Sum of original amounts per month; read through `monthly_balance_bins`.
    pub monthly_balance: GroupHandle,
}

/// One session's worth of dimensions, measures and axis bounds.
pub struct Dashboard {
    index: FacetIndex,
    pub dimensions: DashboardDimensions,
    pub measures: DashboardMeasures,
    pub extrema: Extrema,
    bin_width: f64,
}

impl Dashboard {
    /// Expands the raw records and registers the full dimension/measure
    /// set. Fails on malformed input, a zero bin width, or an empty batch
    /// (extrema are undefined without records).
    pub fn build(raw: &[RawRecord], bin_width: f64) -> Result<Self, FacetError> {
        let rows = expand(raw, bin_width)?;
        debug!(
            "expanded {} raw records into {} rows",
            raw.len(),
            rows.len()
        );
        let mut index = FacetIndex::new(rows);

        let dimensions = DashboardDimensions {
            amount: index.define_dimension(|d| FacetKey::number(d.amount))?,
            rounded_amount: index.define_dimension(|d| FacetKey::number(d.rounded_amount))?,
            month: index.define_dimension(|d| FacetKey::Date(d.date))?,
            balance_month: index.define_dimension(|d| FacetKey::Date(d.date))?,
            category: index.define_dimension(|d| FacetKey::text(d.category.clone()))?,
            week: index.define_dimension(|d| FacetKey::Date(week_of(d.exact_date)))?,
            transaction_id: index.define_dimension(|d| FacetKey::Int(d.id))?,
            scatter: index.define_dimension(|d| {
                FacetKey::Composite(vec![
                    FacetKey::Date(d.exact_date),
                    FacetKey::number(d.original_amount),
                    FacetKey::text(if d.original_amount > 0.0 {
                        "Income"
                    } else {
                        "Expenses"
                    }),
                ])
            })?,
            payer: index.define_dimension(|d| FacetKey::text(d.payer.clone()))?,
            payer_by_type: index.define_dimension(|d| {
                FacetKey::Composite(vec![
                    FacetKey::text(if d.amount > 0.0 { "Income" } else { "Expenses" }),
                    FacetKey::text(d.payer.clone()),
                ])
            })?,
            beneficiary: index.define_dimension(|d| FacetKey::text(d.beneficiary.clone()))?,
            income_expense: index.define_dimension(|d| {
                FacetKey::text(if d.amount < 0.0 { "Expenses" } else { "Income" })
            })?,
            search: define_search_dimension(&mut index)?,
        };

        let measures = DashboardMeasures {
            sum_by_month: index.define_group(dimensions.month, SumReducer::new(|d| d.amount)),
            expense_sum_by_month: index.define_group(
                dimensions.month,
                SumReducer::new(|d| if d.amount < 0.0 { -d.amount } else { 0.0 }),
            ),
            revenue_sum_by_month: index.define_group(
                dimensions.month,
                SumReducer::new(|d| if d.amount > 0.0 { d.amount } else { 0.0 }),
            ),
            sum_by_category: index.define_group(dimensions.category, SumReducer::new(|d| d.amount)),
            table_by_id: index.define_group(dimensions.transaction_id, TransactionBucketReducer),
            transaction_count: index.define_group_all(TransactionBucketReducer),
            total_balance: index.define_group_all(SumReducer::new(|d| d.amount)),
            frequency_by_week: index.define_group(dimensions.week, TransactionBucketReducer),
            histogram_by_amount: index
                .define_group(dimensions.rounded_amount, TransactionBucketReducer),
            scatter: index.define_group(dimensions.scatter, TransactionBucketReducer),
            paid_by_payer: index.define_group(
                dimensions.payer,
                SumReducer::new(|d| if d.amount < 0.0 { d.amount } else { 0.0 }),
            ),
            received_by_payer: index.define_group(
                dimensions.payer,
                SumReducer::new(|d| if d.amount > 0.0 { d.amount } else { 0.0 }),
            ),
            net_by_payer: index.define_group(dimensions.payer, SumReducer::new(|d| d.amount)),
            net_by_payer_and_type: index
                .define_group(dimensions.payer_by_type, SumReducer::new(|d| d.amount)),
            net_by_beneficiary: index
                .define_group(dimensions.beneficiary, SumReducer::new(|d| d.amount)),
            community_balance: index
                .define_group(dimensions.beneficiary, community_balance_reducer()),
            monthly_balance: index.define_group(
                dimensions.balance_month,
                SumReducer::new(|d| d.original_amount),
            ),
        };

        let extrema = compute_extrema(
            &index,
            dimensions.month,
            dimensions.amount,
            measures.net_by_payer_and_type,
            measures.expense_sum_by_month,
            measures.revenue_sum_by_month,
        )?;

        info!(
            "dashboard ready: {} active rows, dates {} to {}",
            index.active_count(),
            extrema.min_date,
            extrema.max_date
        );

        Ok(Dashboard {
            index,
            dimensions,
            measures,
            extrema,
            bin_width,
        })
    }

    pub fn index(&self) -> &FacetIndex {
        &self.index
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// A base view onto any registered measure.
    pub fn view(&self, group: GroupHandle) -> AggregateView<'_> {
        AggregateView::base(&self.index, group)
    }

    /// Cumulative balance over time (running sum of the monthly sums).
    pub fn balance_by_month(&self) -> AggregateView<'_> {
        self.view(self.measures.sum_by_month).cumulative()
    }

    /// All monthly balances in one labeled bin, for the boxplot.
    pub fn monthly_balance_bins(&self) -> AggregateView<'_> {
        self.view(self.measures.monthly_balance)
            .single_bin("All months")
    }

    /// The entry table's buckets, with empty IDs dropped.
    pub fn transaction_table(&self) -> AggregateView<'_> {
        self.view(self.measures.table_by_id).without_empty_bins()
    }

    /// Applies a filter on one dimension; composes with other filters.
    pub fn filter(
        &mut self,
        dimension: DimensionHandle,
        filter: FacetFilter,
    ) -> Result<(), FacetError> {
        self.index.filter(dimension, filter)
    }

    /// Free-text search over the active set; empty string clears.
    pub fn search(&mut self, text: &str) -> Result<(), FacetError> {
        apply_search(&mut self.index, self.dimensions.search, text)
    }

    /// Number of authoritative transactions in the active set.
    pub fn transaction_count(&self) -> usize {
        self.index.group_value(self.measures.transaction_count).count()
    }

    /// Sum of attributed amounts over the active set.
    pub fn total_balance(&self) -> f64 {
        self.index.group_value(self.measures.total_balance).magnitude()
    }
}
