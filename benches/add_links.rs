//! This bench test builds up a registry the way an editor does, one side of a
//! link at a time, and then queries and cascades through it.

#![allow(missing_docs)]

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use stpa::{IdGenerator, LinkRegistry, LinkType};
use uuid::Uuid;

const PAIRS: u128 = 500;

/// Adds every pair as a half link first, then completes it.
fn populate() -> LinkRegistry {
    let mut links = LinkRegistry::new().with_ids(IdGenerator::Sequential(1 << 64));
    for n in 0..PAIRS {
        let uca = Some(Uuid::from_u128(n));
        let hazard = Some(Uuid::from_u128(PAIRS + n % 20));
        links.add_link(LinkType::UcaHazard, uca, None);
        links.add_link(LinkType::UcaHazard, uca, hazard);
    }
    links
}

fn add_links(c: &mut Criterion) {
    c.bench_function("add and repair links", |b| b.iter(populate));

    c.bench_function("query links", |b| {
        let mut links = populate();
        b.iter(|| {
            (0..20)
                .map(|n| links.get_links_for(LinkType::UcaHazard, Uuid::from_u128(PAIRS + n)).len())
                .sum::<usize>()
        });
    });

    c.bench_function("cascade delete", |b| {
        b.iter_batched(
            populate,
            |mut links| {
                for n in 0..20 {
                    links.delete_links_for(Uuid::from_u128(PAIRS + n), 2);
                }
                links
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, add_links);
criterion_main!(benches);
