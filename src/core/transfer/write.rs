// snesdump-rs/src/core/transfer/write.rs

//! Paced SRAM writes.
//!
//! The adapter has no flow control on the write path, so the host sends one
//! byte at a time and pauses `write_delay` after each.

use std::thread;

use log::{debug, info};

use super::{CancelToken, Progress, ProgressSink, TransferOptions};
use crate::core::cartridge::{RegionKind, TransferRegion};
use crate::core::error::{DumpError, DumpResult};
use crate::core::protocol::Command;
use crate::core::transport::Transport;

/// Stream `source` into the SRAM `region`. Returns the number of bytes sent.
///
/// Size and region checks happen before anything reaches the transport.
pub fn write_region<T, P>(
    transport: &mut T,
    region: &TransferRegion,
    source: &[u8],
    options: &TransferOptions,
    progress: &mut P,
    cancel: &CancelToken,
) -> DumpResult<usize>
where
    T: Transport + ?Sized,
    P: ProgressSink + ?Sized,
{
    if region.kind != RegionKind::Sram {
        return Err(DumpError::InvalidState(format!("{} regions are read-only", region.kind)));
    }
    let expected = region.byte_count();
    if source.len() != expected {
        return Err(DumpError::SizeMismatch { expected, actual: source.len() });
    }
    cancel.check()?;

    let ctrl = Command::Ctrl(region.write_lines());
    let write = region.write_command();
    debug!("{} / {}", ctrl, write);
    transport.write_all(&ctrl.encode())?;
    transport.write_all(&write.encode())?;

    let mut snapshot = Progress {
        kind: region.kind,
        region_index: 0,
        region_count: 1,
        region_done: 0,
        region_total: expected,
        done: 0,
        total: expected,
    };

    for &byte in source {
        cancel.check()?;
        transport.write_all(&[byte])?;
        if !options.write_delay.is_zero() {
            thread::sleep(options.write_delay);
        }
        snapshot.region_done += 1;
        snapshot.done += 1;
        progress.on_progress(&snapshot);
    }

    progress.on_finish(&snapshot);
    info!("{} bytes written to {}", snapshot.done, region);
    Ok(snapshot.done)
}
