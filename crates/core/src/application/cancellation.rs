// Job Cancellation Token

use tokio::sync::watch;

/// Read side, handed to the crawl loop
///
/// Set at most once, never reset. Observed only at cycle boundaries.
#[derive(Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Write side, kept by the registry while the job is not terminal
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Request cancellation (idempotent)
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Create a cancellation channel
pub fn cancel_channel() -> (CancelHandle, CancellationToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancellationToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_observes_cancel() {
        let (handle, token) = cancel_channel();
        assert!(!token.is_cancelled());

        handle.cancel();
        handle.cancel();

        assert!(token.is_cancelled());
        assert!(token.clone().is_cancelled());
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_token_survives_dropped_handle() {
        let (handle, token) = cancel_channel();
        handle.cancel();
        drop(handle);
        assert!(token.is_cancelled());
    }
}
