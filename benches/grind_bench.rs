//! Grind Decision Benchmarks - Hot-Path Performance Validation
//!
//! Benchmarks the pure domain functions evaluated for every position
//! of every cycle.
//!
//! Run with: cargo bench --bench grind_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal_macros::dec;

use grinder_keeper::domain::{
    CostGate, Cursor, GasMultiplier, GrindBatch, Ladder, OperationSelector, PartialLadderPolicy,
    PositionSnapshot,
};

fn positions(n: u64) -> Vec<PositionSnapshot> {
    (0..n)
        .map(|pool_id| {
            let long = u32::try_from(pool_id % 6).unwrap_or(0);
            PositionSnapshot {
                pool_id,
                long: Ladder::with_counts(long, 5),
                hedge: Ladder::with_counts(u32::try_from(pool_id % 2).unwrap_or(0), 0),
            }
        })
        .collect()
}

/// Selector over a mixed population of ladder states.
fn bench_selector(c: &mut Criterion) {
    let selector = OperationSelector::new(PartialLadderPolicy::SellThenBuy);
    let population = positions(1_000);

    c.bench_function("selector_1000_positions", |b| {
        b.iter(|| {
            for position in &population {
                black_box(selector.candidates(black_box(position)));
            }
        });
    });
}

/// Exact decimal cost assessment of one batch.
fn bench_cost_gate(c: &mut Criterion) {
    let gate = CostGate::new(dec!(0.05));

    c.bench_function("cost_gate_assess", |b| {
        b.iter(|| {
            gate.assess(
                black_box(1_250_000),
                black_box(20_000_000),
                black_box(dec!(2712.34)),
                black_box(25),
            )
        });
    });
}

/// Batch assembly and ABI code mapping.
fn bench_batch_build(c: &mut Criterion) {
    let selector = OperationSelector::new(PartialLadderPolicy::SellOnly);
    let population = positions(256);

    c.bench_function("batch_build_256", |b| {
        b.iter(|| {
            let batch: GrindBatch = population
                .iter()
                .map(|p| (p.pool_id, selector.candidates(p)[0]))
                .collect();
            black_box(batch.op_codes());
            black_box(GasMultiplier::DEFAULT.apply(black_box(3_000_000)))
        });
    });
}

/// Cursor slicing and advance.
fn bench_cursor(c: &mut Criterion) {
    c.bench_function("cursor_slice_advance", |b| {
        let mut cursor = Cursor::new(10);
        b.iter(|| {
            black_box(cursor.slice(black_box(10_000)));
            cursor.advance(10_000);
        });
    });
}

criterion_group!(
    benches,
    bench_selector,
    bench_cost_gate,
    bench_batch_build,
    bench_cursor
);
criterion_main!(benches);
