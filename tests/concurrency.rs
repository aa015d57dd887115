//! Exercises the ordering guarantees the concurrent pipeline promises:
//! output survives job-count mismatches between encode and decode, and a
//! mid-batch failure surfaces exactly one error while still delivering the
//! blocks that decoded successfully before it.

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

fn compress(data: &[u8], block_size: u32, jobs: usize, checksum: bool) -> Vec<u8> {
    let sink = SharedSink::default();
    let config = StreamConfig {
        block_size,
        jobs,
        checksum,
        entropy: EntropyCodecId::None,
        transform: 0,
        listeners: Vec::new(),
    };
    let mut stream = CompressingStream::new(sink.clone(), config).unwrap();
    stream.write_all(data).unwrap();
    stream.close().unwrap();
    sink.0.lock().unwrap().clone()
}

fn blocks(n: usize, block_size: u32) -> Vec<u8> {
    (0..n * block_size as usize).map(|i| (i % 256) as u8).collect()
}

#[test]
fn high_job_count_decode_of_low_job_count_encode_round_trips() {
    let data = blocks(8, 1024);
    let compressed = compress(&data, 1024, 1, true);
    let mut decoder =
        DecompressingStream::new(std::io::Cursor::new(compressed), 8, Vec::new()).unwrap();
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn low_job_count_decode_of_high_job_count_encode_round_trips() {
    let data = blocks(8, 1024);
    let compressed = compress(&data, 1024, 8, true);
    let mut decoder =
        DecompressingStream::new(std::io::Cursor::new(compressed), 1, Vec::new()).unwrap();
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}

/// Corrupts the checksum-protected payload of the second block in a
/// four-block, four-job batch, then confirms: exactly one block's worth of
/// bytes is delivered before the error (block 0's output), and the error
/// itself propagates once rather than silently truncating the stream.
#[test]
fn mid_batch_checksum_failure_yields_partial_output_and_one_error() {
    let block_size = 1024u32;
    let data = blocks(4, block_size);
    let mut compressed = compress(&data, block_size, 4, true);

    // Frame layout per block here: header(12) + [mode(1) + length(1) +
    // checksum(4) + payload(block_size)] repeated, terminator(1) at the end.
    // Flip a payload byte inside the second block (index 1) to break its
    // checksum without touching block 0's already-framed bytes.
    let frame_size = 1 + 1 + 4 + block_size as usize;
    let second_block_payload_start = 12 + frame_size + 1 + 1 + 4;
    compressed[second_block_payload_start] ^= 0xFF;

    let mut decoder =
        DecompressingStream::new(std::io::Cursor::new(compressed), 4, Vec::new()).unwrap();
    let mut out = Vec::new();
    let result = decoder.read_to_end(&mut out);

    assert!(result.is_err(), "corrupted batch must surface an error");
    assert_eq!(
        out,
        &data[..block_size as usize],
        "only block 0's bytes should have been delivered before the failure"
    );

    // Further reads must not yield more data or a second error: the stream
    // is done once the failure has been reported.
    let mut trailing = [0u8; 16];
    assert_eq!(decoder.read(&mut trailing).unwrap(), 0);
}

#[test]
fn listener_events_fire_for_a_multi_job_stream() {
    use kanzi::{Event, EventKind, Listener};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        before_transform: AtomicUsize,
        after_transform: AtomicUsize,
    }

    impl Listener for CountingListener {
        fn on_event(&self, event: &Event) {
            match event.kind {
                EventKind::BeforeTransform => {
                    self.before_transform.fetch_add(1, Ordering::SeqCst);
                }
                EventKind::AfterTransform => {
                    self.after_transform.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    let listener = Arc::new(CountingListener {
        before_transform: AtomicUsize::new(0),
        after_transform: AtomicUsize::new(0),
    });

    let data = blocks(6, 1024);
    let sink = SharedSink::default();
    let config = StreamConfig {
        block_size: 1024,
        jobs: 3,
        checksum: false,
        entropy: EntropyCodecId::None,
        transform: 0,
        listeners: vec![listener.clone() as Arc<dyn Listener>],
    };
    let mut stream = CompressingStream::new(sink.clone(), config).unwrap();
    stream.write_all(&data).unwrap();
    stream.close().unwrap();

    assert_eq!(listener.before_transform.load(Ordering::SeqCst), 6);
    assert_eq!(listener.after_transform.load(Ordering::SeqCst), 6);
}
