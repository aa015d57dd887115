//! Block-structured, concurrently-encoding compressor (§4.H encode side).
//!
//! Grounded on `io::compress_mt`'s batch-of-`nb_workers` read/compress/write
//! loop, generalised from LZ4 block compression to this crate's
//! checksum + transform-sequence + entropy-coder pipeline. Where the teacher
//! orders output with a `WriteRegister` (`BTreeMap` drain keyed by rank),
//! this implementation follows the engine's own re-architecture guidance
//! (§9) and uses a monotonic `AtomicI64` barrier plus park/backoff instead:
//! each block's task waits for the previous block's id to appear in the
//! counter before it may touch the shared bit-stream, so frames land in
//! strict block-id order without buffering whole blocks in a side map.

use std::io::{self, Write};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use crate::bitstream::OutputBitStream;
use crate::checksum::block_checksum;
use crate::config::{MODE_SMALL_BLOCK_FLAG, MODE_TERMINATOR, SMALL_BLOCK_SIZE};
use crate::entropy::new_encoder;
use crate::error::{KanziError, Result};
use crate::listener::{notify, Event, EventKind, Listener};
use crate::transform::TransformSequence;

use super::header::StreamHeader;
use super::StreamConfig;

/// Minimum number of bytes needed to represent `post_len`
/// (§9: `dataSize = max(1, ceil(log256(postLen + 1)))`), asserted to fit the
/// frame's 2-bit `dataSize - 1` field (1..=4 bytes).
fn bytes_needed(post_len: u32) -> Result<u8> {
    let mut n = post_len;
    let mut bytes = 1u8;
    while n >= 256 {
        n >>= 8;
        bytes += 1;
    }
    if bytes > 4 {
        return Err(KanziError::ProcessBlock(format!(
            "invalid block data length: postLen {post_len} needs {bytes} bytes to encode"
        )));
    }
    Ok(bytes)
}

fn mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn to_io_error(e: KanziError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

fn spin_until_wait(progress: &AtomicI64, target: i64) -> bool {
    let mut backoff: u32 = 1;
    loop {
        let cur = progress.load(Ordering::Acquire);
        if cur < 0 {
            return false;
        }
        if cur >= target {
            return true;
        }
        for _ in 0..backoff {
            std::hint::spin_loop();
        }
        backoff = (backoff * 2).min(1024);
        if backoff >= 1024 {
            std::thread::yield_now();
        }
    }
}

/// One block's worth of work: checksum, small-block copy-through or full
/// transform sequence, then (serialised) framing + entropy encode.
#[allow(clippy::too_many_arguments)]
fn encode_block<W: Write>(
    id: u64,
    block: &[u8],
    checksum_enabled: bool,
    transform_id: u16,
    entropy_id: crate::entropy::EntropyCodecId,
    listeners: &[Arc<dyn Listener>],
    bitstream: &Mutex<Option<OutputBitStream<W>>>,
    progress: &AtomicI64,
) -> Result<()>
where
    W: 'static,
{
    let checksum = checksum_enabled.then(|| block_checksum(block));

    notify(
        listeners,
        &Event::new(EventKind::BeforeTransform, id as i64, block.len() as u64),
    );

    let (mode, data_size, post_len, payload): (u8, u8, u32, Vec<u8>) = if block.len() <= SMALL_BLOCK_SIZE {
        (
            MODE_SMALL_BLOCK_FLAG | block.len() as u8,
            0,
            block.len() as u32,
            block.to_vec(),
        )
    } else {
        let mut sequence = TransformSequence::new(transform_id);
        let mut scratch = Vec::new();
        let (skip_flags, post_len) = sequence.forward(block, &mut scratch);
        let bytes = bytes_needed(post_len as u32)?;
        let mode = (skip_flags << 2) | (bytes - 1);
        (mode, bytes, post_len as u32, scratch)
    };

    notify(
        listeners,
        &Event::new(EventKind::AfterTransform, id as i64, post_len as u64),
    );

    if !spin_until_wait(progress, id as i64 - 1) {
        return Ok(());
    }

    {
        let mut guard = bitstream.lock().unwrap();
        let bs = guard.as_mut().expect("bitstream present mid-stream");
        bs.write_bits(mode as u64, 8)?;
        if data_size > 0 {
            let bits = 8 * data_size as u32;
            let value = post_len.wrapping_sub(1) as u64 & mask(bits);
            bs.write_bits(value, bits)?;
        }
        if let Some(c) = checksum {
            bs.write_bits(c as u64, 32)?;
        }
    }

    notify(
        listeners,
        &Event::new(EventKind::BeforeEntropy, id as i64, payload.len() as u64),
    );

    let bs_owned = bitstream.lock().unwrap().take().expect("bitstream owned by exactly one block");
    let mut encoder = new_encoder(entropy_id, bs_owned)?;
    encoder.encode(&payload)?;
    encoder.dispose()?;
    *bitstream.lock().unwrap() = Some(encoder.into_bitstream());

    progress.store(id as i64, Ordering::Release);

    notify(
        listeners,
        &Event::new(EventKind::AfterEntropy, id as i64, payload.len() as u64),
    );

    Ok(())
}

/// Implements `std::io::Write`. Bytes handed to [`write`](Write::write) are
/// accumulated into a batch buffer sized `jobs * block_size`; once full, the
/// batch is sliced into blocks and every block runs through
/// checksum → transform sequence → entropy coder on its own rayon task,
/// landing on the shared bit-stream in block-id order. [`close`](Self::close)
/// flushes any residual bytes as a final (possibly short) batch, writes the
/// terminator frame, and closes the bit-stream. Idempotent.
pub struct CompressingStream<W: Write + Send + 'static> {
    header: StreamHeader,
    bitstream: Arc<Mutex<Option<OutputBitStream<W>>>>,
    progress: Arc<AtomicI64>,
    next_block_id: u64,
    batch: Vec<u8>,
    jobs: usize,
    pool: rayon::ThreadPool,
    listeners: Vec<Arc<dyn Listener>>,
    header_written: bool,
    closed: bool,
    total_in: u64,
}

impl<W: Write + Send + 'static> CompressingStream<W> {
    pub fn new(writer: W, config: StreamConfig) -> Result<Self> {
        config.validate()?;
        let header = StreamHeader::new(
            config.checksum,
            config.entropy,
            config.transform,
            config.block_size,
        )?;
        let pool = super::build_worker_pool(config.jobs)?;
        Ok(CompressingStream {
            header,
            bitstream: Arc::new(Mutex::new(Some(OutputBitStream::new(writer)))),
            progress: Arc::new(AtomicI64::new(0)),
            next_block_id: 1,
            batch: Vec::with_capacity(config.jobs * config.block_size as usize),
            jobs: config.jobs,
            pool,
            listeners: config.listeners,
            header_written: false,
            closed: false,
            total_in: 0,
        })
    }

    pub fn header(&self) -> StreamHeader {
        self.header
    }

    fn ensure_started(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        notify(&self.listeners, &Event::new(EventKind::CompressionStart, -1, 0));
        {
            let mut guard = self.bitstream.lock().unwrap();
            let bs = guard.as_mut().expect("bitstream present before close");
            self.header.write(bs)?;
        }
        self.header_written = true;
        Ok(())
    }

    fn process_batch(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let block_size = self.header.block_size as usize;
        let mut blocks: Vec<(u64, &[u8])> = Vec::new();
        for chunk in data.chunks(block_size) {
            blocks.push((self.next_block_id, chunk));
            self.next_block_id += 1;
        }

        let checksum_enabled = self.header.checksum;
        let transform_id = self.header.transform;
        let entropy_id = self.header.entropy;
        let listeners = &self.listeners;
        let bitstream = &self.bitstream;
        let progress = &self.progress;
        let first_error: Mutex<Option<(u64, KanziError)>> = Mutex::new(None);
        let first_error_ref = &first_error;

        self.pool.scope(|scope| {
            for &(id, block) in &blocks {
                scope.spawn(move |_| {
                    if progress.load(Ordering::Acquire) < 0 {
                        return;
                    }
                    if let Err(e) = encode_block(
                        id,
                        block,
                        checksum_enabled,
                        transform_id,
                        entropy_id,
                        listeners,
                        bitstream,
                        progress,
                    ) {
                        let mut guard = first_error_ref.lock().unwrap();
                        let replace = match guard.as_ref() {
                            Some((existing_id, _)) => id < *existing_id,
                            None => true,
                        };
                        if replace {
                            *guard = Some((id, e));
                        }
                        progress.store(-1, Ordering::Release);
                    }
                });
            }
        });

        if let Some((_, e)) = first_error.into_inner().unwrap() {
            return Err(e);
        }
        self.total_in += data.len() as u64;
        Ok(())
    }

    /// Flushes any batch residue, writes the terminator frame, and closes
    /// the underlying bit-stream. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.ensure_started()?;
        if !self.batch.is_empty() {
            let residue = std::mem::take(&mut self.batch);
            self.process_batch(&residue)?;
        }
        {
            let barrier_target = self.next_block_id as i64 - 1;
            if !spin_until_wait(&self.progress, barrier_target) {
                return Err(KanziError::ProcessBlock("stream cancelled before close".into()));
            }
            let mut guard = self.bitstream.lock().unwrap();
            let bs = guard.as_mut().expect("bitstream present before close");
            bs.write_bits(MODE_TERMINATOR as u64, 8)?;
            bs.close()?;
        }
        notify(
            &self.listeners,
            &Event::new(EventKind::CompressionEnd, -1, self.total_in),
        );
        self.closed = true;
        Ok(())
    }
}

impl<W: Write + Send + 'static> Write for CompressingStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ensure_started().map_err(to_io_error)?;
        self.batch.extend_from_slice(buf);
        let batch_cap = self.jobs * self.header.block_size as usize;
        while self.batch.len() >= batch_cap {
            let residue = self.batch.split_off(batch_cap);
            let full = std::mem::replace(&mut self.batch, residue);
            self.process_batch(&full).map_err(to_io_error)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write + Send + 'static> Drop for CompressingStream<W> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::entropy::EntropyCodecId;

    /// `W` must be `'static` (the entropy factory returns a boxed trait
    /// object), so tests write into an `Arc<Mutex<Vec<u8>>>`-backed sink
    /// instead of borrowing a local `Vec<u8>`.
    #[derive(Clone, Default)]
    pub(crate) struct SharedSink(pub Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn config(block_size: u32, jobs: usize, checksum: bool) -> StreamConfig {
        StreamConfig {
            block_size,
            jobs,
            checksum,
            entropy: EntropyCodecId::None,
            transform: 0,
            listeners: Vec::new(),
        }
    }

    #[test]
    fn writes_header_and_terminator_for_empty_stream() {
        let sink = SharedSink::default();
        {
            let mut stream = CompressingStream::new(sink.clone(), config(1024, 1, false)).unwrap();
            stream.close().unwrap();
        }
        let buf = sink.0.lock().unwrap();
        // 12-byte header + 1-byte terminator frame.
        assert_eq!(buf.len(), 13);
        assert_eq!(buf[12], crate::config::MODE_TERMINATOR);
    }

    #[test]
    fn single_small_block_round_trips_through_write_and_close() {
        let sink = SharedSink::default();
        {
            let mut stream = CompressingStream::new(sink.clone(), config(1024, 1, true)).unwrap();
            stream.write_all(b"hi").unwrap();
            stream.close().unwrap();
        }
        assert!(sink.0.lock().unwrap().len() > 13);
    }

    #[test]
    fn multiple_blocks_with_jobs_greater_than_one_do_not_panic() {
        let sink = SharedSink::default();
        let data = vec![b'x'; 1024 * 5 + 37];
        {
            let mut stream = CompressingStream::new(sink.clone(), config(1024, 4, true)).unwrap();
            stream.write_all(&data).unwrap();
            stream.close().unwrap();
        }
        assert!(!sink.0.lock().unwrap().is_empty());
    }
}
