//! Compile-time and default-configuration constants: a single place for
//! tunables the rest of the crate imports rather than hard-coding inline.

/// Stream magic number, also used as the XXH32 checksum seed.
pub const MAGIC: u32 = 0x4B41_4E5A;

/// Current stream format version written by this crate. Older or newer
/// versions are rejected rather than silently accepted.
pub const STREAM_VERSION: u8 = 4;

/// Smallest permitted block size, in bytes.
pub const MIN_BLOCK_SIZE: u32 = 1024;

/// Largest permitted block size, in bytes.
pub const MAX_BLOCK_SIZE: u32 = 1 << 30;

/// Default block size used when the caller does not specify one.
pub const DEFAULT_BLOCK_SIZE: u32 = 1 << 20;

/// Block size must be a multiple of this value.
pub const BLOCK_SIZE_ALIGNMENT: u32 = 16;

/// Smallest job count.
pub const MIN_JOBS: u32 = 1;

/// Largest job count.
pub const MAX_JOBS: u32 = 16;

/// Blocks at or under this length skip the transform sequence entirely and
/// are copied verbatim into the frame. Kept as one named constant, but
/// never reused as anything other than this threshold — the OR-mask base
/// used when packing `mode` is a separate literal at the call site
/// (`MODE_SMALL_BLOCK_FLAG`).
pub const SMALL_BLOCK_SIZE: usize = 15;

/// High bit of the frame `mode` byte: set when the block was copied through
/// without a transform sequence.
pub const MODE_SMALL_BLOCK_FLAG: u8 = 0x80;

/// `mode` value used for the terminator frame.
pub const MODE_TERMINATOR: u8 = 0x80;

/// Number of primary-index slots reserved in the BWT working state.
/// Only slot 0 is ever populated by this implementation (`chunks` is always
/// 1), but the fixed-size array is sized for the full range the format
/// reserves.
pub const MAX_BWT_CHUNKS: usize = 8;

/// Threshold at which BWT inverse switches from the packed 32-bit `data`
/// buffer to the split `data1`/`data2` representation.
pub const BWT_BIG_BLOCK_THRESHOLD: usize = 1 << 24;

/// Largest block BWT forward will process.
pub const BWT_MAX_BLOCK_SIZE: usize = (1 << 30) - 4;
