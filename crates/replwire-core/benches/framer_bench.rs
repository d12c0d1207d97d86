//! Criterion benchmarks for the replwire framer.
//!
//! Run with:
//! ```bash
//! cargo bench --package replwire-core --bench framer_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use replwire_core::{encode, split_frames, Message};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn payload(len: usize) -> Message {
    let bytes: Vec<u8> = (0..len).map(|i| b'a' + (i % 26) as u8).collect();
    Message::new(bytes).expect("alphabetic payload has no terminator")
}

fn wire_of(count: usize, len: usize) -> Vec<u8> {
    (0..count).flat_map(|_| encode(&payload(len))).collect()
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for len in [16usize, 1024, 64 * 1024] {
        let msg = payload(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &msg, |b, m| {
            b.iter(|| encode(black_box(m)))
        });
    }
    group.finish();
}

fn bench_split_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_frames");
    for count in [1usize, 16, 256] {
        let wire = wire_of(count, 64);
        group.bench_with_input(BenchmarkId::from_parameter(count), &wire, |b, w| {
            b.iter(|| split_frames(black_box(w)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_split_frames);
criterion_main!(benches);
