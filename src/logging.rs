//! `tracing`-backed listener and subscriber init, the idiomatic replacement
//! for the teacher's bespoke `DISPLAYLEVEL`/`displaylevel!` verbosity macros
//! (`cli::constants`). Library code never prints directly; it emits
//! `tracing` events, and the CLI installs a subscriber at start-up.

use tracing::{debug, info, trace};

use crate::listener::{Event, EventKind, Listener};

/// Forwards every pipeline event to the `tracing` facade at a level chosen
/// by its kind: stream-level start/end at `info`, per-block transform/entropy
/// edges at `trace` (they fire once per block per stage, so `debug` would be
/// noisy for anything but the smallest streams).
pub struct LoggingListener;

impl Listener for LoggingListener {
    fn on_event(&self, event: &Event) {
        match event.kind {
            EventKind::CompressionStart => info!(size = event.size, "compression started"),
            EventKind::DecompressionStart => info!("decompression started"),
            EventKind::CompressionEnd => info!(size = event.size, "compression finished"),
            EventKind::DecompressionEnd => info!(size = event.size, "decompression finished"),
            EventKind::AfterHeaderDecoding => debug!(size = event.size, "stream header decoded"),
            EventKind::BeforeTransform => {
                trace!(block = event.id, size = event.size, "before transform")
            }
            EventKind::AfterTransform => {
                trace!(block = event.id, size = event.size, "after transform")
            }
            EventKind::BeforeEntropy => trace!(block = event.id, "before entropy coding"),
            EventKind::AfterEntropy => trace!(block = event.id, "after entropy coding"),
        }
    }
}

/// Installs a global `tracing-subscriber` formatter driven by `RUST_LOG`
/// (or `level` when the environment variable is unset). Idempotent: a
/// second call is a harmless no-op (the `try_init` error is discarded),
/// matching the rest of the crate's close()-is-idempotent convention.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = fmt().with_env_filter(filter).try_init();
}
