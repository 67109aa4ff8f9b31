//! Single-flight execution guard
//!
//! At most one manifest execution may be in flight process-wide. Both the
//! cadence and socket drivers consult the same guard; a trigger arriving
//! while a run is in progress is answered immediately rather than queued.
//! The permit releases on drop, so the flag clears on every exit path.

use std::sync::{Arc, Mutex};

/// Shared busy flag for manifest execution.
#[derive(Debug, Default, Clone)]
pub struct ExecutionGuard {
    executing: Arc<Mutex<bool>>,
}

impl ExecutionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard; `None` means a run is already in flight.
    pub fn try_acquire(&self) -> Option<ExecutionPermit> {
        let mut executing = self.executing.lock().unwrap();
        if *executing {
            return None;
        }
        *executing = true;
        Some(ExecutionPermit {
            executing: Arc::clone(&self.executing),
        })
    }
}

/// Held for the duration of one manifest run.
#[derive(Debug)]
pub struct ExecutionPermit {
    executing: Arc<Mutex<bool>>,
}

impl Drop for ExecutionPermit {
    fn drop(&mut self) {
        *self.executing.lock().unwrap() = false;
    }
}
