//! Lossless, block-structured data compression toolkit with a concurrent
//! codec pipeline.
//!
//! A Kanzi stream is a 96-bit header (`pipeline::StreamHeader`) followed by
//! a sequence of frames, each carrying one block through a checksum, a
//! transform sequence (BWT, BWTS, MTF/rank/timestamp recoders, run-length,
//! LZ4/Snappy-backed slots) and an entropy coder (range, ANS, the binary
//! arithmetic family, Huffman, Golomb), and closed by a single terminator
//! frame. [`CompressingStream`] and [`DecompressingStream`] drive that
//! pipeline across `jobs` concurrent workers while keeping the shared
//! bit-stream's frames in strict block-id order; see `pipeline` for the
//! ordering protocol.

pub mod bitstream;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod entropy;
pub mod error;
pub mod listener;
pub mod logging;
pub mod pipeline;
pub mod transform;

mod block;

pub use error::{KanziError, Result};
pub use listener::{Event, EventKind, Listener, NullListener};
pub use pipeline::{CompressingStream, DecompressingStream, StreamConfig, StreamHeader};
