//! Progress-notification plumbing fired at the four pipeline edges plus the
//! stream-level start/end events (§4.I). A listener is handed an immutable
//! snapshot of the event list before each batch, mirroring the teacher's
//! general approach of avoiding iterator invalidation by cloning small
//! read-only state (`Prefs` clones) before a parallel section rather than
//! sharing `&mut` across threads.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Kinds of event a [`Listener`] can observe, in the order the pipeline may
/// emit them for a single block (encode: before/after-transform bracket the
/// transform-sequence stage, before/after-entropy bracket the entropy
/// coder). `CompressionStart`/`CompressionEnd` and their decompression
/// counterparts bracket the whole stream; `AfterHeaderDecoding` fires once,
/// right after the decoder parses the stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CompressionStart,
    DecompressionStart,
    BeforeTransform,
    AfterTransform,
    BeforeEntropy,
    AfterEntropy,
    CompressionEnd,
    DecompressionEnd,
    AfterHeaderDecoding,
}

/// A single notification. `id` is the block id for per-block events, or `-1`
/// for the stream-level start/end events. `hash` is populated only when the
/// stream has checksums enabled and the event kind carries one.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub id: i64,
    pub size: u64,
    pub hash: Option<u32>,
    pub hashing: bool,
    pub time: Instant,
}

impl Event {
    pub fn new(kind: EventKind, id: i64, size: u64) -> Self {
        Event {
            kind,
            id,
            size,
            hash: None,
            hashing: false,
            time: Instant::now(),
        }
    }

    pub fn with_hash(mut self, hash: u32) -> Self {
        self.hash = Some(hash);
        self.hashing = true;
        self
    }
}

/// Receives pipeline events. Implementations must not panic across the
/// trait boundary in a way that should stop the pipeline: [`notify`] already
/// swallows panics on the caller's behalf, but a well-behaved listener
/// should still treat its `on_event` as best-effort, fire-and-forget.
pub trait Listener: Send + Sync {
    fn on_event(&self, event: &Event);
}

/// Invokes every listener with `event`, swallowing any panic a listener
/// raises (§4.I: "Exceptions inside listeners are swallowed").
pub fn notify(listeners: &[Arc<dyn Listener>], event: &Event) {
    for l in listeners {
        let l = AssertUnwindSafe(l.as_ref());
        let _ = panic::catch_unwind(|| l.0.on_event(event));
    }
}

/// A listener that discards every event; the default when the caller does
/// not register one.
pub struct NullListener;

impl Listener for NullListener {
    fn on_event(&self, _event: &Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener(AtomicUsize);

    impl Listener for CountingListener {
        fn on_event(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingListener;

    impl Listener for PanickingListener {
        fn on_event(&self, _event: &Event) {
            panic!("listener blew up");
        }
    }

    #[test]
    fn null_listener_ignores_events() {
        let l: Arc<dyn Listener> = Arc::new(NullListener);
        notify(&[l], &Event::new(EventKind::CompressionStart, -1, 0));
    }

    #[test]
    fn panicking_listener_does_not_abort_notification() {
        let counting = Arc::new(CountingListener(AtomicUsize::new(0)));
        let listeners: Vec<Arc<dyn Listener>> = vec![
            Arc::new(PanickingListener),
            counting.clone(),
        ];
        notify(&listeners, &Event::new(EventKind::AfterTransform, 1, 10));
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);
    }
}
