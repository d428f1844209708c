// snesdump-rs/src/core/transfer/mod.rs

//! Transfer engine
//!
//! Bank-chunked streaming reads (ROM / SRAM dumps) and paced byte-by-byte
//! SRAM writes. The engine never looks at the cartridge layout; it only
//! walks the regions the mapper hands it.

pub mod cancel;
pub mod progress;
pub mod read;
pub mod write;

pub use cancel::CancelToken;
pub use progress::{NullProgress, Progress, ProgressSink};
pub use read::read_regions;
pub use write::write_region;

use std::time::Duration;

use crate::config::DumperConfig;

/// Pacing and timeout knobs for the transfer loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Sleep between polls when the adapter has nothing buffered
    pub poll_interval: Duration,
    /// Pause after each written SRAM byte
    pub write_delay: Duration,
    /// Give up on a region after this long without new bytes.
    /// `None` waits forever.
    pub stall_timeout: Option<Duration>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            write_delay: Duration::from_millis(1),
            stall_timeout: None,
        }
    }
}

impl From<&DumperConfig> for TransferOptions {
    fn from(config: &DumperConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            write_delay: config.write_delay,
            stall_timeout: config.stall_timeout,
        }
    }
}

impl TransferOptions {
    /// No sleeping at all; used against the emulated adapter
    pub fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            write_delay: Duration::ZERO,
            stall_timeout: None,
        }
    }
}
