//! Benchmarks for pc-to-line lookups
//!
//! Compares checkpointed `resolve_location` against a binary search over the
//! fully decoded line table, for several checkpoint strides.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use zdb_core::{DebugData, DebugDataBuilder, IndexConfig, Pc};

const ROWS: u32 = 20_000;

/// A single-file program with `ROWS` rows, mixing short and long steps.
fn program(stride: u32) -> DebugData
{
    let config = IndexConfig::with_checkpoint_stride(stride).expect("valid stride");
    let mut b = DebugDataBuilder::with_config(config);
    b.add_source_file("big.zs", "");
    b.set_file(0);
    for i in 0..ROWS {
        if i % 7 == 0 {
            b.extended_step(300, 5);
        } else {
            b.simple_step(3);
        }
    }
    b.build().expect("program must validate")
}

fn sample_pcs(data: &DebugData) -> Vec<Pc>
{
    let last = data.line_table().last().map_or(0, |row| row.pc.value());
    (0..256u32).map(|i| Pc::new(i.wrapping_mul(2_654_435_761) % (last + 1))).collect()
}

fn bench_resolve_location(c: &mut Criterion)
{
    let mut group = c.benchmark_group("resolve_location");

    for stride in [64u32, 1024, 16_384] {
        let data = program(stride);
        let pcs = sample_pcs(&data);

        group.bench_with_input(BenchmarkId::new("cached", stride), &pcs, |b, pcs| {
            b.iter(|| {
                for pc in pcs {
                    black_box(data.resolve_location(black_box(*pc)));
                }
            });
        });

        // A fresh store per batch so the result cache starts empty.
        group.bench_with_input(BenchmarkId::new("cold", stride), &pcs, |b, pcs| {
            b.iter_batched(
                || program(stride),
                |fresh| {
                    for pc in pcs {
                        black_box(fresh.resolve_location(*pc));
                    }
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_line_table(c: &mut Criterion)
{
    let data = program(1024);
    let pcs = sample_pcs(&data);
    let table = data.line_table();

    c.bench_function("line_table_binary_search", |b| {
        b.iter(|| {
            for pc in &pcs {
                let idx = table.partition_point(|row| row.pc <= *pc);
                black_box(idx.checked_sub(1).map(|i| table[i].location()));
            }
        });
    });
}

criterion_group!(benches, bench_resolve_location, bench_line_table);
criterion_main!(benches);
