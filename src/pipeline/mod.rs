//! Block pipeline (§4.H): batches writes/reads into `jobs`-wide groups of
//! `block_size`-byte blocks, running each block's checksum, transform
//! sequence and entropy coder concurrently while a serial barrier keeps the
//! shared bit-stream's frames in strict block-id order.
//!
//! Grounded on the teacher's `io::compress_mt` chunk-batch pipeline
//! (`WriteRegister`'s ordered drain generalises to this crate's literal
//! monotonic-counter barrier) and `threadpool::TPool`'s choice of `rayon` +
//! `crossbeam-channel` as the concurrency primitives.

pub mod decoder;
pub mod encoder;
pub mod header;

pub use decoder::DecompressingStream;
pub use encoder::CompressingStream;
pub use header::StreamHeader;

use std::sync::Arc;

use crate::config::{DEFAULT_BLOCK_SIZE, MAX_JOBS, MIN_JOBS};
use crate::entropy::EntropyCodecId;
use crate::error::{KanziError, Result};
use crate::listener::Listener;

/// Caller-supplied tunables for a [`CompressingStream`]. A
/// [`DecompressingStream`] only honours `jobs` and `listeners` from this —
/// `block_size`, `checksum`, `entropy` and `transform` come from the stream
/// header it reads on first use.
#[derive(Clone)]
pub struct StreamConfig {
    pub block_size: u32,
    pub jobs: usize,
    pub checksum: bool,
    pub entropy: EntropyCodecId,
    pub transform: u16,
    pub listeners: Vec<Arc<dyn Listener>>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            block_size: DEFAULT_BLOCK_SIZE,
            jobs: 1,
            checksum: false,
            entropy: EntropyCodecId::None,
            transform: 0,
            listeners: Vec::new(),
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<()> {
        if self.jobs < MIN_JOBS as usize || self.jobs > MAX_JOBS as usize {
            return Err(KanziError::InvalidParam(format!(
                "jobs {} out of range [{}..={}]",
                self.jobs, MIN_JOBS, MAX_JOBS
            )));
        }
        Ok(())
    }
}

/// Builds a dedicated `rayon` pool sized to at least `jobs` threads.
///
/// The encoder's `spin_until_wait` barrier and the decoder's daisy-chain
/// `recv()` both park a worker until an earlier block's task releases it.
/// The global rayon pool defaults to `num_cpus::get()` threads; if `jobs`
/// exceeds that (or the global pool is simply smaller, e.g. one thread on a
/// single-core box), every worker can end up parked waiting on a
/// predecessor task that is still sitting in the queue with nothing left to
/// steal it — a wedge, outright deadlock in the one-thread case. Sizing a
/// pool to `num_cpus::get().max(jobs)` guarantees a thread is free to run
/// every block's task concurrently.
pub(crate) fn build_worker_pool(jobs: usize) -> Result<rayon::ThreadPool> {
    let threads = num_cpus::get().max(jobs);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| KanziError::CreateStream(format!("failed to size worker pool: {e}")))
}
