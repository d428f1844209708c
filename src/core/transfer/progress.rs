// snesdump-rs/src/core/transfer/progress.rs

use crate::core::cartridge::RegionKind;

/// Snapshot reported after every read iteration or written byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub kind: RegionKind,
    /// Index of the current region (bank) within the transfer
    pub region_index: usize,
    pub region_count: usize,
    pub region_done: usize,
    pub region_total: usize,
    /// Cumulative bytes over all regions
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.done == self.total
    }
}

/// Receives progress updates from the transfer loops
pub trait ProgressSink {
    fn on_progress(&mut self, progress: &Progress);

    /// Called once when every region has completed
    fn on_finish(&mut self, _progress: &Progress) {}
}

/// Discards every update
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&mut self, _progress: &Progress) {}
}

impl<F: FnMut(&Progress)> ProgressSink for F {
    fn on_progress(&mut self, progress: &Progress) {
        self(progress)
    }
}
