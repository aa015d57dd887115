//! Criterion benchmarks for the Burrows-Wheeler Transform (forward and
//! inverse) in isolation from the rest of the pipeline.
//!
//! Run with:
//!   cargo bench --bench bwt

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kanzi::transform::{Bwt, Transform};

mod corpus {
    include!("corpus.rs");
}

fn bench_bwt_forward_inverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("bwt_forward_inverse");

    for &chunk_size in &[65_536usize, 1 << 20] {
        let input = corpus::synthetic_data(chunk_size);

        group.throughput(Throughput::Bytes(chunk_size as u64));
        group.bench_with_input(BenchmarkId::new("forward", chunk_size), &input, |b, input| {
            let mut bwt = Bwt::new();
            let mut out = vec![0u8; bwt.max_encoded_len(input.len())];
            b.iter(|| bwt.forward(input, &mut out).unwrap());
        });

        let mut bwt = Bwt::new();
        let mut transformed = vec![0u8; bwt.max_encoded_len(input.len())];
        let written = bwt.forward(&input, &mut transformed).unwrap();
        transformed.truncate(written);

        group.throughput(Throughput::Bytes(chunk_size as u64));
        group.bench_with_input(
            BenchmarkId::new("inverse", chunk_size),
            &transformed,
            |b, transformed| {
                let mut bwt = Bwt::new();
                let mut out = vec![0u8; chunk_size];
                b.iter(|| bwt.inverse(transformed, &mut out).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_bwt_forward_inverse);
criterion_main!(benches);
