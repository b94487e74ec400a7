//! Shared cancellation flag, one per worker, following the
//! `Arc<AtomicBool>` running-flag pattern used throughout the transport and
//! device layers.

use cell_devices::{CancelPoll, CancelSignal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cleared to request a worker stop. Workers observe it between steps,
/// never mid-motion: the current command always runs to completion.
#[derive(Clone)]
pub struct CancelToken {
    running: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn cancel(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        !self.running.load(Ordering::Acquire)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelPoll for CancelToken {
    fn poll(&self) -> CancelSignal {
        if self.is_cancelled() {
            CancelSignal::Abort
        } else {
            CancelSignal::Continue
        }
    }
}
