//! Latched cooperative cancellation
//!
//! One invocation shares one [`AbortSignal`] across all of its tasks. The
//! first failing task trips it, or the caller trips it externally; either
//! way it stays tripped for the remainder of the invocation. Tasks observe
//! it before starting real work, so cancellation changes what a task does,
//! never whether the invocation waits for it.

use std::sync::Arc;

use tokio::sync::watch;

/// One-way abort latch shared by an invocation's tasks.
///
/// Built on a watch channel so the first failure wins without races on the
/// flag itself, and so callers can await the latch as a future. Clones
/// share the latch.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Create an untripped signal.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Trip the latch. Idempotent; the latch never resets.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the latch has tripped.
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the latch trips; returns immediately if it already has.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        // wait_for only errs when every sender is gone, and self holds one
        let _ = rx.wait_for(|aborted| *aborted).await;
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}
