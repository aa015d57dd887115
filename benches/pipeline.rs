//! Criterion benchmarks for the end-to-end concurrent stream pipeline
//! (`CompressingStream`/`DecompressingStream`), across job counts.
//!
//! Run with:
//!   cargo bench --bench pipeline

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kanzi::entropy::EntropyCodecId;
use kanzi::{CompressingStream, DecompressingStream, StreamConfig};

mod corpus {
    include!("corpus.rs");
}

#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn compress(data: &[u8], jobs: usize) -> Vec<u8> {
    let sink = SharedSink::default();
    let config = StreamConfig {
        block_size: 1 << 16,
        jobs,
        checksum: true,
        entropy: EntropyCodecId::Fpaq,
        transform: 0,
        listeners: Vec::new(),
    };
    let mut stream = CompressingStream::new(sink.clone(), config).unwrap();
    stream.write_all(data).unwrap();
    stream.close().unwrap();
    sink.0.lock().unwrap().clone()
}

fn bench_pipeline(c: &mut Criterion) {
    let data = corpus::synthetic_data(1 << 22);
    let mut group = c.benchmark_group("pipeline_compress_decompress");
    group.sample_size(10);

    for &jobs in &[1usize, 2, 4, 8] {
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("compress", jobs), &data, |b, data| {
            b.iter(|| compress(data, jobs));
        });

        let compressed = compress(&data, jobs);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("decompress", jobs),
            &compressed,
            |b, compressed| {
                b.iter(|| {
                    let mut decoder = DecompressingStream::new(
                        std::io::Cursor::new(compressed.clone()),
                        jobs,
                        Vec::new(),
                    )
                    .unwrap();
                    let mut out = Vec::new();
                    decoder.read_to_end(&mut out).unwrap();
                    out
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
