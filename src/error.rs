//! Crate-wide error taxonomy.
//!
//! A plain enum with hand-written `Display`/`Error` impls, kept separate
//! from the `anyhow::Error` used at the CLI edge. Library callers match on
//! `KanziError` directly; `src/cli` wraps it alongside `anyhow::Error` in
//! its own `CliError` so `exit_code()` survives to the process exit status.

use core::fmt;

/// Error kinds produced by the stream engine. The discriminants double as
/// the negative CLI exit codes (`-(kind as i32)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KanziError {
    /// A required configuration parameter was not supplied.
    MissingParam(&'static str),
    /// A configuration parameter was supplied but is out of range or malformed.
    InvalidParam(String),
    /// `blockSize` violates `MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE` or the 16-byte
    /// alignment invariant.
    BlockSize(String),
    /// The entropy codec id is unknown or unsupported.
    InvalidCodec(String),
    /// The transform-sequence id decodes to an unknown nibble.
    InvalidTransform(String),
    /// The stream is not a Kanzi stream (bad magic) or is otherwise malformed.
    InvalidStream(String),
    /// The stream header names a format version this crate does not support.
    StreamVersion(u8),
    /// Failure constructing the pipeline (bad jobs count, listener setup, ...).
    CreateStream(String),
    /// Failure constructing a bit-stream over the caller-supplied transport.
    CreateBitstream(String),
    /// Failure constructing an entropy codec instance.
    CreateCodec(String),
    /// Reading from the underlying transport failed.
    ReadFile(String),
    /// Writing to the underlying transport failed.
    WriteFile(String),
    /// A block failed to encode/decode (transform error, checksum mismatch, ...).
    ProcessBlock(String),
    /// Catch-all for conditions that do not fit another kind.
    Unknown(String),
}

impl KanziError {
    /// Stable negative exit-code value for the CLI.
    pub fn exit_code(&self) -> i32 {
        let ordinal = match self {
            KanziError::MissingParam(_) => 1,
            KanziError::InvalidParam(_) => 2,
            KanziError::BlockSize(_) => 3,
            KanziError::InvalidCodec(_) => 4,
            KanziError::InvalidTransform(_) => 5,
            KanziError::InvalidStream(_) => 6,
            KanziError::StreamVersion(_) => 7,
            KanziError::CreateStream(_) => 8,
            KanziError::CreateBitstream(_) => 9,
            KanziError::CreateCodec(_) => 10,
            KanziError::ReadFile(_) => 11,
            KanziError::WriteFile(_) => 12,
            KanziError::ProcessBlock(_) => 13,
            KanziError::Unknown(_) => 14,
        };
        -ordinal
    }
}

impl fmt::Display for KanziError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KanziError::MissingParam(name) => write!(f, "missing parameter: {name}"),
            KanziError::InvalidParam(msg) => write!(f, "invalid parameter: {msg}"),
            KanziError::BlockSize(msg) => write!(f, "invalid block size: {msg}"),
            KanziError::InvalidCodec(msg) => write!(f, "invalid entropy codec: {msg}"),
            KanziError::InvalidTransform(msg) => write!(f, "invalid transform: {msg}"),
            KanziError::InvalidStream(msg) => write!(f, "invalid stream: {msg}"),
            KanziError::StreamVersion(v) => write!(f, "unsupported stream version: {v}"),
            KanziError::CreateStream(msg) => write!(f, "failed to create stream: {msg}"),
            KanziError::CreateBitstream(msg) => write!(f, "failed to create bitstream: {msg}"),
            KanziError::CreateCodec(msg) => write!(f, "failed to create codec: {msg}"),
            KanziError::ReadFile(msg) => write!(f, "read error: {msg}"),
            KanziError::WriteFile(msg) => write!(f, "write error: {msg}"),
            KanziError::ProcessBlock(msg) => write!(f, "block processing error: {msg}"),
            KanziError::Unknown(msg) => write!(f, "unknown error: {msg}"),
        }
    }
}

impl std::error::Error for KanziError {}

impl From<std::io::Error> for KanziError {
    fn from(e: std::io::Error) -> Self {
        // Callers that know the direction (read vs write) construct the
        // specific variant themselves; this blanket conversion is used only
        // where the I/O direction is ambiguous at the call site.
        KanziError::ReadFile(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KanziError>;
