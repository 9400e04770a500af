//! Cooperative cancellation shared between the interrupt handler and the
//! command executor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A clonable cancellation flag for one ratchet run.
///
/// Besides the flag itself the token counts commands currently in flight, so
/// the interrupt path can wait for the executor to finish tearing down a
/// process group before the worktree is removed and the process exits.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    active: Mutex<usize>,
    idle: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Mark a command as in flight until the returned guard is dropped.
    pub(crate) fn enter(&self) -> ActiveCommand {
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *active += 1;
        ActiveCommand {
            token: self.clone(),
        }
    }

    /// Number of commands currently in flight.
    pub fn active_commands(&self) -> usize {
        *self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until no command is in flight or `timeout` elapses.
    ///
    /// Returns `true` if the token went idle within the timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        while *active > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .inner
                .idle
                .wait_timeout(active, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            active = guard;
        }
        true
    }
}

/// Guard returned by [`CancellationToken::enter`].
#[derive(Debug)]
pub(crate) struct ActiveCommand {
    token: CancellationToken,
}

impl Drop for ActiveCommand {
    fn drop(&mut self) {
        let mut active = self
            .token
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *active = active.saturating_sub(1);
        self.token.inner.idle.notify_all();
    }
}
