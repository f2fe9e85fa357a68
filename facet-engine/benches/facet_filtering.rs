//! FILENAME: facet-engine/benches/facet_filtering.rs
//! Build and filter-toggle throughput over a synthetic expense ledger.

use criterion::{criterion_group, criterion_main, Criterion};

use facet_engine::{Dashboard, FacetFilter, FacetKey};
use ledger::{Beneficiaries, RawRecord};

const CATEGORIES: [&str; 5] = ["Dinner", "Rent", "Groceries", "Salary", "Travel"];
const USERS: [&str; 3] = ["A", "B", "C"];

fn synthetic_records(count: usize) -> Vec<RawRecord> {
    (0..count)
        .map(|i| {
            let payer = USERS[i % USERS.len()];
            let beneficiaries: Beneficiaries = if i % 4 == 0 {
                USERS.iter().map(|u| u.to_string()).collect()
            } else {
                [payer.to_string()].into_iter().collect()
            };
            RawRecord {
                id: i as i64,
                date: chrono::NaiveDate::from_ymd_opt(2024, (i % 12) as u32 + 1, (i % 28) as u32 + 1)
                    .unwrap(),
                category: CATEGORIES[i % CATEGORIES.len()].to_string(),
                payer: payer.to_string(),
                beneficiaries,
                amount: ((i % 200) as f64) - 100.0 + 0.5,
                subject: format!("entry {}", i),
                comment: String::new(),
                partner: String::new(),
            }
        })
        .collect()
}

fn bench_dashboard_build(c: &mut Criterion) {
    let records = synthetic_records(5_000);
    c.bench_function("dashboard_build_5k", |b| {
        b.iter(|| Dashboard::build(&records, 100.0).unwrap())
    });
}

fn bench_filter_toggle(c: &mut Criterion) {
    let records = synthetic_records(5_000);
    let mut dashboard = Dashboard::build(&records, 100.0).unwrap();

    c.bench_function("category_filter_toggle_5k", |b| {
        b.iter(|| {
            dashboard
                .filter(
                    dashboard.dimensions.category,
                    FacetFilter::Exact(FacetKey::text("Dinner")),
                )
                .unwrap();
            dashboard
                .filter(dashboard.dimensions.category, FacetFilter::All)
                .unwrap();
        })
    });
}

criterion_group!(benches, bench_dashboard_build, bench_filter_toggle);
criterion_main!(benches);
