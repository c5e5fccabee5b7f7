use crate::{ResonaError, Result};
use std::time::Duration;
use tokio::sync::watch;

/// Cooperative cancellation support for polling loops and linger pauses.
///
/// This is intentionally simple:
/// - `cancel()` flips a boolean and wakes sleepers.
/// - `reset()` clears the flag so the controller can be reused.
/// - Long sleeps and in-flight requests select on either completion or
///   cancellation.
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

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

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

/// Wait until cancellation is signalled on the receiver.
///
/// Resolves immediately if the flag is already set. A dropped sender is
/// treated as non-cancelable and never resolves.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender dropped; park forever.
            std::future::pending::<()>().await;
        }
    }
}

/// Sleep for `duration`, returning `Err(Cancelled)` if cancellation wins.
pub async fn sleep_with_cancel(
    mut cancel_rx: watch::Receiver<bool>,
    duration: Duration,
) -> Result<()> {
    if *cancel_rx.borrow() {
        return Err(ResonaError::Cancelled);
    }

    let sleeper = tokio::time::sleep(duration);
    tokio::pin!(sleeper);
    tokio::select! {
        _ = &mut sleeper => Ok(()),
        _ = cancelled(&mut cancel_rx) => Err(ResonaError::Cancelled),
    }
}
