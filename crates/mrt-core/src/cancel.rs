//! Cooperative cancellation for long-running solves.
//!
//! The iterative index solvers check the token between outer iterations;
//! the Monte-Carlo driver checks it before starting each draw. A cancelled
//! run surfaces [`MrtError::Cancelled`] and discards partial results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{MrtError, MrtResult};

/// Shared cancellation flag. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; visible to all clones.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Err(Cancelled) once cancellation has been requested.
    pub fn check(&self) -> MrtResult<()> {
        if self.is_cancelled() {
            Err(MrtError::Cancelled)
        } else {
            Ok(())
        }
    }
}
