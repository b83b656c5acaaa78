//! This bench test simulates loading and editing a large catalogue, where
//! every edit re-sorts the working set into canonical order.

#![allow(missing_docs)]

use catalogue::{Hierarchy, OptionId, OptionRecord};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

const SENTINEL: &str = "(Top-level category)";

/// Generates 100 categories with 20 sub-options each, in reverse order.
fn preseed_records() -> Vec<OptionRecord> {
    let mut records = Vec::new();
    for category in (0..100).rev() {
        let category_id = format!("cat-{category:03}");
        for option in (0..20).rev() {
            records.push(OptionRecord::sub_option(
                format!("{category_id}-{option:02}"),
                format!("Option {option:02}"),
                category_id.as_str(),
            ));
        }
        records.push(OptionRecord::top_level(
            category_id.as_str(),
            format!("Category {category:03}"),
        ));
    }
    records
}

fn load(c: &mut Criterion) {
    c.bench_function("load catalogue", |b| {
        b.iter_batched(
            preseed_records,
            |records| Hierarchy::load(SENTINEL, records).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

fn edit(c: &mut Criterion) {
    let hierarchy = Hierarchy::load(SENTINEL, preseed_records()).unwrap();

    c.bench_function("add option", |b| {
        b.iter_batched(
            || hierarchy.clone(),
            |mut hierarchy| {
                let category = OptionId::from("cat-050");
                hierarchy.add_option(0, Some(category)).unwrap()
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("move between categories", |b| {
        b.iter_batched(
            || hierarchy.clone(),
            |mut hierarchy| {
                hierarchy
                    .set_parent(&OptionId::from("cat-010-05"), Some(OptionId::from("cat-090")))
                    .unwrap()
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, load, edit);
criterion_main!(benches);
