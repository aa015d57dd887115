//! Full stream round-trips through the public `CompressingStream`/
//! `DecompressingStream` API: varying job counts, block sizes, checksum
//! on/off, and the boundary-sized inputs the frame format treats specially
//! (empty, exactly `SMALL_BLOCK_SIZE`, exactly one block, spanning batches).

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use kanzi::entropy::EntropyCodecId;
use kanzi::{CompressingStream, DecompressingStream, StreamConfig};

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

fn roundtrip(data: &[u8], block_size: u32, enc_jobs: usize, dec_jobs: usize, checksum: bool) -> Vec<u8> {
    roundtrip_with_transform(data, block_size, enc_jobs, dec_jobs, checksum, 0)
}

fn roundtrip_with_transform(
    data: &[u8],
    block_size: u32,
    enc_jobs: usize,
    dec_jobs: usize,
    checksum: bool,
    transform: u16,
) -> Vec<u8> {
    let sink = SharedSink::default();
    let config = StreamConfig {
        block_size,
        jobs: enc_jobs,
        checksum,
        entropy: EntropyCodecId::Fpaq,
        transform,
        listeners: Vec::new(),
    };
    let mut stream = CompressingStream::new(sink.clone(), config).expect("open compressor");
    stream.write_all(data).expect("write");
    stream.close().expect("close");

    let compressed = sink.0.lock().unwrap().clone();
    let mut decoder =
        DecompressingStream::new(std::io::Cursor::new(compressed), dec_jobs, Vec::new())
            .expect("open decompressor");
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).expect("read");
    out
}

fn lorem(n: usize) -> Vec<u8> {
    b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. "
        .iter()
        .copied()
        .cycle()
        .take(n)
        .collect()
}

#[test]
fn empty_input_round_trips_for_every_job_count() {
    for jobs in 1..=4 {
        let out = roundtrip(b"", 1024, jobs, jobs, false);
        assert!(out.is_empty());
    }
}

#[test]
fn exactly_small_block_size_round_trips() {
    let data = vec![b'x'; 15];
    let out = roundtrip(&data, 1024, 1, 1, false);
    assert_eq!(out, data);
}

#[test]
fn one_byte_past_small_block_size_round_trips() {
    let data = vec![b'x'; 16];
    let out = roundtrip(&data, 1024, 1, 1, false);
    assert_eq!(out, data);
}

#[test]
fn exactly_one_block_round_trips() {
    let data = lorem(1024);
    let out = roundtrip(&data, 1024, 1, 1, false);
    assert_eq!(out, data);
}

#[test]
fn input_spanning_several_batches_round_trips() {
    let data = lorem(1024 * 37 + 17);
    let out = roundtrip(&data, 1024, 4, 4, false);
    assert_eq!(out, data);
}

#[test]
fn checksum_enabled_round_trips() {
    let data = lorem(1024 * 5 + 3);
    let out = roundtrip(&data, 1024, 2, 2, true);
    assert_eq!(out, data);
}

#[test]
fn all_job_counts_one_through_eight_round_trip() {
    let data = lorem(1024 * 9 + 123);
    for jobs in 1..=8 {
        let out = roundtrip(&data, 1024, jobs, jobs, jobs % 2 == 0);
        assert_eq!(out, data, "mismatch at jobs={jobs}");
    }
}

#[test]
fn asymmetric_encode_and_decode_job_counts_round_trip() {
    let data = lorem(1024 * 6 + 9);
    for (enc, dec) in [(1, 4), (4, 1), (3, 5), (8, 2)] {
        let out = roundtrip(&data, 1024, enc, dec, true);
        assert_eq!(out, data, "mismatch at enc={enc} dec={dec}");
    }
}

#[test]
fn a_variety_of_block_sizes_round_trip() {
    let data = lorem(1024 * 20 + 5);
    for block_size in [1024u32, 4096, 1 << 16] {
        let out = roundtrip(&data, block_size, 2, 3, false);
        assert_eq!(out, data, "mismatch at block_size={block_size}");
    }
}

/// Exercises the transform-sequence framing end to end (not just the
/// per-transform unit tests): a non-zero `transform` id, single and
/// multi-stage, across several blocks and job counts.
#[test]
fn bwt_transform_round_trips_through_the_full_pipeline() {
    let data = lorem(1024 * 5 + 17);
    // Bwt alone, in the header's highest nibble.
    let out = roundtrip_with_transform(&data, 1024, 3, 3, true, 0x1000);
    assert_eq!(out, data);
}

#[test]
fn leading_null_nibble_transform_id_round_trips_through_the_full_pipeline() {
    let data = lorem(1024 * 3 + 9);
    // Bwt alone, but named in the lowest nibble (0x0001) rather than the
    // highest (0x1000) — both must decode to the same single stage.
    let out = roundtrip_with_transform(&data, 1024, 2, 4, true, 0x0001);
    assert_eq!(out, data);
}

#[test]
fn two_stage_bwt_then_mtft_transform_round_trips_through_the_full_pipeline() {
    let data = lorem(1024 * 6 + 3);
    // Bwt (first) then Mtft (second).
    let out = roundtrip_with_transform(&data, 1024, 4, 2, true, 0x1700);
    assert_eq!(out, data);
}

#[test]
fn header_is_readable_before_any_data_is_requested() {
    let sink = SharedSink::default();
    let config = StreamConfig { jobs: 2, checksum: true, ..StreamConfig::default() };
    let mut stream = CompressingStream::new(sink.clone(), config.clone()).unwrap();
    stream.write_all(&lorem(2048)).unwrap();
    stream.close().unwrap();

    let compressed = sink.0.lock().unwrap().clone();
    let mut decoder =
        DecompressingStream::new(std::io::Cursor::new(compressed), 1, Vec::new()).unwrap();
    decoder.read(&mut [0u8; 1]).unwrap();
    let header = decoder.header().expect("header decoded by first read");
    assert_eq!(header.block_size, config.block_size);
    assert!(header.checksum);
}
