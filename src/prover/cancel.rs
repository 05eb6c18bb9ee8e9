//! Cooperative cancellation shared by racing search workers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A clonable stop flag. Searches poll it between steps and unwind when set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
