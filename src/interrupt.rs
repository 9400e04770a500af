//! SIGINT/SIGTERM handling for a ratchet run
//!
//! The OS handler is installed once per process. Each run arms a slot
//! holding its cancellation token and the release handle of its current
//! worktree; on a signal the handler cancels the token, waits briefly for
//! the running command's process group to be torn down, releases the
//! worktree and exits with status 130.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::EXIT_INTERRUPTED;
use crate::git::ReleaseHandle;
use crate::process::CancellationToken;

/// Upper bound on waiting for an in-flight command to be killed
const COMMAND_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(2);

static HANDLER: OnceLock<std::result::Result<(), String>> = OnceLock::new();
static ACTIVE: Mutex<Option<Arc<RunSlot>>> = Mutex::new(None);

#[derive(Debug, Default)]
struct RunSlot {
    token: CancellationToken,
    cleanup: Mutex<Option<ReleaseHandle>>,
}

impl RunSlot {
    fn interrupt(&self) -> bool {
        self.token.cancel();
        if !self.token.wait_idle(COMMAND_TEARDOWN_TIMEOUT) {
            debug!("command still running after interrupt, releasing anyway");
        }

        let cleanup = self
            .cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match cleanup {
            Some(handle) => {
                handle.release();
                true
            }
            None => false,
        }
    }
}

/// Per-run interrupt wiring: a cancellation token plus a single-slot
/// "current cleanup" handle.
#[derive(Debug)]
pub struct InterruptCoordinator {
    slot: Arc<RunSlot>,
    armed: bool,
}

impl Default for InterruptCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptCoordinator {
    /// Coordinator not connected to OS signals. [`Self::interrupt`] can
    /// still be triggered programmatically.
    pub fn new() -> Self {
        Self {
            slot: Arc::new(RunSlot::default()),
            armed: false,
        }
    }

    /// Install the process-wide SIGINT/SIGTERM handler (first call only)
    /// and route signals to this coordinator until it is dropped.
    pub fn install() -> Result<Self> {
        HANDLER
            .get_or_init(|| ctrlc::set_handler(on_signal).map_err(|e| e.to_string()))
            .clone()
            .map_err(anyhow::Error::msg)
            .context("Failed to set interrupt handler")?;

        let mut coordinator = Self::new();
        *ACTIVE.lock().unwrap_or_else(PoisonError::into_inner) = Some(coordinator.slot.clone());
        coordinator.armed = true;
        Ok(coordinator)
    }

    pub fn token(&self) -> CancellationToken {
        self.slot.token.clone()
    }

    /// Make `handle` the cleanup to run on interrupt, replacing any previous one.
    pub fn register_cleanup(&self, handle: ReleaseHandle) {
        *self
            .slot
            .cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    pub fn clear_cleanup(&self) {
        self.slot
            .cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn has_cleanup(&self) -> bool {
        self.slot
            .cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Cancel the run and release the registered worktree, without exiting.
    ///
    /// Returns whether a cleanup handle was registered.
    pub fn interrupt(&self) -> bool {
        self.slot.interrupt()
    }
}

impl Drop for InterruptCoordinator {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
        if active
            .as_ref()
            .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot))
        {
            *active = None;
        }
    }
}

fn on_signal() {
    let slot = ACTIVE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if let Some(slot) = slot {
        slot.interrupt();
    }
    std::process::exit(EXIT_INTERRUPTED);
}
