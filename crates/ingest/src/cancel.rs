use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

/// Holds the cancellation token of the transfer in flight, if any.
///
/// A fresh token is installed when a file starts and cleared when it ends,
/// so cancelling never leaks into the next file.
#[derive(Debug, Default)]
pub(crate) struct CancelSlot {
    current: Mutex<Option<CancellationToken>>,
}

impl CancelSlot {
    /// Installs and returns a fresh token.
    pub(crate) fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut guard) = self.current.lock() {
            *guard = Some(token.clone());
        }
        token
    }

    /// Drops the current token.
    pub(crate) fn clear(&self) {
        if let Ok(mut guard) = self.current.lock() {
            guard.take();
        }
    }

    /// Signals the current token. Returns `false` if nothing was in flight.
    pub(crate) fn cancel(&self) -> bool {
        if let Ok(guard) = self.current.lock()
            && let Some(token) = guard.as_ref()
        {
            token.cancel();
            return true;
        }
        false
    }

    /// Returns `true` while a transfer holds a token.
    pub(crate) fn is_armed(&self) -> bool {
        self.current
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}
