//! LZ4 block compression and decompression, used as the concrete backing
//! for the `LZ4` and `SNAPPY` transform-sequence slots (`transform::lz4`).
//! Streaming/dictionary entry points are not needed for a single in-memory
//! block and are not carried over; only the one-shot `compress_default` /
//! `decompress_safe` pair and their error types are used.

pub mod compress;
pub mod decompress_api;
pub mod decompress_core;
pub mod types;

pub use compress::{compress_bound, compress_default, Lz4Error};
pub use decompress_api::decompress_safe;
