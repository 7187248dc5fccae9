//! Cooperative cancellation for long-running pipelines.
//!
//! Aborting mid-operation never cancels an in-flight request (the
//! upstream has no compensation for a delete that was already sent); the
//! flag is only consulted between requests and during the pacing sleeps.

use std::time::Duration;
use tokio::sync::watch;

/// A clonable cancellation flag shared between an operation and its owner.
#[derive(Clone, Debug)]
pub struct CancellationState {
    tx: watch::Sender<bool>,
}

impl Default for CancellationState {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Request cancellation and wake any pacing sleep.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Clear the flag so the next operation can run.
    pub fn reset(&self) {
        let _ = self.tx.send(false);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Sleep for `duration` unless cancellation fires first.
///
/// Returns `true` if the full sleep elapsed, `false` if it was cut short
/// by cancellation.
pub(crate) async fn sleep_unless_cancelled(
    mut cancel_rx: watch::Receiver<bool>,
    duration: Duration,
) -> bool {
    if *cancel_rx.borrow() {
        return false;
    }

    let sleeper = tokio::time::sleep(duration);
    tokio::pin!(sleeper);
    loop {
        tokio::select! {
            _ = &mut sleeper => return true,
            changed = cancel_rx.changed() => {
                if changed.is_err() {
                    // Sender dropped; nothing can cancel us any more.
                    sleeper.await;
                    return true;
                }
                if *cancel_rx.borrow() {
                    return false;
                }
            }
        }
    }
}
