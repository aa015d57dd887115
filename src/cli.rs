//! Command-line surface (§6: "CLI surface (external to the core, summarised
//! for completeness)"). One binary, two subcommands (`compress`/`decompress`)
//! rather than the reference's one-executable-per-direction split, since a
//! single `clap` derive `Cli` covers both without argv[0] alias sniffing.
//!
//! Mirrors the teacher's `cli::args`/`main::run` split in spirit (parse,
//! then a `run` dispatcher returning a process exit code) but trades the
//! teacher's hand-rolled parser and `DISPLAYLEVEL` macros for `clap` derive
//! and `tracing` (`crate::logging`), which is what the rest of the example
//! pack reaches for on both fronts.

use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use crate::config::{DEFAULT_BLOCK_SIZE, MAX_JOBS};
use crate::entropy::EntropyCodecId;
use crate::error::KanziError;
use crate::listener::Listener;
use crate::logging::{init_tracing, LoggingListener};
use crate::pipeline::{CompressingStream, DecompressingStream, StreamConfig};
use crate::transform::TransformId;

/// CLI-edge error: either a library [`KanziError`] (whose ordinal becomes
/// the process exit code, per §7) or any other failure (bad arguments,
/// file-system errors) reported via `anyhow` and exiting 1.
enum CliError {
    Kanzi(KanziError),
    Other(anyhow::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Kanzi(e) => e.exit_code(),
            CliError::Other(_) => 1,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Kanzi(e) => write!(f, "{e}"),
            CliError::Other(e) => write!(f, "{e:#}"),
        }
    }
}

impl From<KanziError> for CliError {
    fn from(e: KanziError) -> Self {
        CliError::Kanzi(e)
    }
}

impl From<anyhow::Error> for CliError {
    fn from(e: anyhow::Error) -> Self {
        CliError::Other(e)
    }
}

#[derive(Parser, Debug)]
#[command(name = "kanzi", version, about = "Block-structured lossless data compression")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compress a file (or stdin) into a Kanzi stream.
    Compress(CompressArgs),
    /// Decompress a Kanzi stream into a file (or stdout).
    Decompress(DecompressArgs),
}

#[derive(clap::Args, Debug)]
pub struct CompressArgs {
    /// Input file; omit or pass `-` to read stdin.
    #[arg(short, long)]
    pub input: Option<PathBuf>,
    /// Output file; omit or pass `-` to write stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Entropy codec: none, huffman, range, ans0, ans1, fpaq, cm, paq, tpaq, expgolomb, ricegolomb.
    #[arg(long, default_value = "fpaq")]
    pub codec: String,
    /// Comma-separated transform stages, applied left to right, up to 4:
    /// bwt, bwts, lz4, snappy, rlt, zrlt, mtft, rank, timestamp, none.
    #[arg(long, default_value = "bwt,mtft,zrlt")]
    pub transform: String,
    /// Block size in bytes (must be a multiple of 16, 1 KiB..=1 GiB).
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block: u32,
    /// Number of concurrent block workers.
    #[arg(short, long, default_value_t = default_jobs())]
    pub jobs: usize,
    /// Append a per-block XXH32 checksum.
    #[arg(long)]
    pub checksum: bool,
    /// Overwrite an existing output file.
    #[arg(long)]
    pub overwrite: bool,
    /// Emit progress/trace logging (repeat for more detail).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(clap::Args, Debug)]
pub struct DecompressArgs {
    /// Input file; omit or pass `-` to read stdin.
    #[arg(short, long)]
    pub input: Option<PathBuf>,
    /// Output file; omit or pass `-` to write stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Number of concurrent block workers.
    #[arg(short, long, default_value_t = default_jobs())]
    pub jobs: usize,
    /// Overwrite an existing output file.
    #[arg(long)]
    pub overwrite: bool,
    /// Emit progress/trace logging (repeat for more detail).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_codec(name: &str) -> anyhow::Result<EntropyCodecId> {
    Ok(match name.to_ascii_lowercase().as_str() {
        "none" => EntropyCodecId::None,
        "huffman" => EntropyCodecId::Huffman,
        "range" => EntropyCodecId::Range,
        "ans0" | "ansrank0" => EntropyCodecId::AnsRank0,
        "ans1" | "ansrank1" => EntropyCodecId::AnsRank1,
        "fpaq" => EntropyCodecId::Fpaq,
        "cm" => EntropyCodecId::Cm,
        "paq" => EntropyCodecId::Paq,
        "tpaq" => EntropyCodecId::Tpaq,
        "expgolomb" => EntropyCodecId::ExpGolomb,
        "ricegolomb" => EntropyCodecId::RiceGolomb,
        other => bail!("unknown --codec '{other}'"),
    })
}

/// Packs up to 4 comma-separated transform names into the header's 16-bit
/// transform-sequence id (high nibble first, matching `TransformSequence`'s
/// decode order).
fn parse_transform(spec: &str) -> anyhow::Result<u16> {
    let names: Vec<&str> = spec.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    if names.len() > 4 {
        bail!("at most 4 transform stages are supported, got {}", names.len());
    }
    let mut id: u16 = 0;
    for name in &names {
        let nibble = match name.to_ascii_lowercase().as_str() {
            "none" => TransformId::None.nibble(),
            "bwt" => TransformId::Bwt.nibble(),
            "bwts" => TransformId::Bwts.nibble(),
            "lz4" => TransformId::Lz4.nibble(),
            "snappy" => TransformId::Snappy.nibble(),
            "rlt" => TransformId::Rlt.nibble(),
            "zrlt" => TransformId::Zrlt.nibble(),
            "mtft" => TransformId::Mtft.nibble(),
            "rank" => TransformId::Rank.nibble(),
            "timestamp" => TransformId::Timestamp.nibble(),
            other => bail!("unknown --transform stage '{other}'"),
        };
        id = (id << 4) | nibble as u16;
    }
    // Left-pad with NULL (identity) nibbles so fewer than 4 stages still
    // decode correctly (NULL nibbles beyond the first are skipped by
    // `TransformSequence::new`).
    for _ in names.len()..4 {
        id <<= 4;
    }
    Ok(id)
}

fn open_input(path: &Option<PathBuf>) -> anyhow::Result<Box<dyn std::io::Read + Send>> {
    match path {
        Some(p) if p.as_os_str() != "-" => {
            let f = std::fs::File::open(p).with_context(|| format!("opening {}", p.display()))?;
            Ok(Box::new(BufReader::new(f)))
        }
        _ => Ok(Box::new(BufReader::new(std::io::stdin()))),
    }
}

fn open_output(path: &Option<PathBuf>, overwrite: bool) -> anyhow::Result<Box<dyn std::io::Write + Send>> {
    match path {
        Some(p) if p.as_os_str() != "-" => {
            if p.exists() && !overwrite {
                bail!("{} already exists (use --overwrite)", p.display());
            }
            let f = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(p)
                .with_context(|| format!("creating {}", p.display()))?;
            Ok(Box::new(BufWriter::new(f)))
        }
        _ => Ok(Box::new(BufWriter::new(std::io::stdout()))),
    }
}

fn verbosity_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn run_compress(args: CompressArgs) -> Result<(), CliError> {
    init_tracing(verbosity_level(args.verbose));
    let codec = parse_codec(&args.codec)?;
    let transform = parse_transform(&args.transform)?;
    let mut input = open_input(&args.input)?;
    let output = open_output(&args.output, args.overwrite)?;

    let listeners: Vec<Arc<dyn Listener>> = vec![Arc::new(LoggingListener)];
    let config = StreamConfig {
        block_size: args.block,
        jobs: args.jobs,
        checksum: args.checksum,
        entropy: codec,
        transform,
        listeners,
    };
    let mut stream = CompressingStream::new(output, config)?;
    std::io::copy(&mut input, &mut stream).context("compressing input")?;
    stream.close()?;
    Ok(())
}

fn run_decompress(args: DecompressArgs) -> Result<(), CliError> {
    init_tracing(verbosity_level(args.verbose));
    let input = open_input(&args.input)?;
    let mut output = open_output(&args.output, args.overwrite)?;

    let listeners: Vec<Arc<dyn Listener>> = vec![Arc::new(LoggingListener)];
    let mut stream = DecompressingStream::new(input, args.jobs.max(1), listeners)?;
    std::io::copy(&mut stream, &mut output).context("decompressing input")?;
    Ok(())
}

/// Parses `std::env::args()` and dispatches, returning the process exit
/// code (0 on success, the negative `KanziError::exit_code()` values from
/// §7 on library failure, 1 for CLI-level failures such as a missing file).
pub fn main() -> i32 {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Compress(args) => run_compress(args),
        Command::Decompress(args) => run_decompress(args),
    };
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("kanzi: {e}");
            e.exit_code()
        }
    }
}
