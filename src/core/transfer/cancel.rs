// snesdump-rs/src/core/transfer/cancel.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::error::{DumpError, DumpResult};

/// Shared cancellation flag, checked between protocol transactions and
/// while a read is waiting on the adapter.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing flag (the SIGINT handler owns one)
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> DumpResult<()> {
        if self.is_cancelled() {
            Err(DumpError::Interrupted)
        } else {
            Ok(())
        }
    }
}
