// snesdump-rs/src/core/transfer/read.rs

//! Streaming section reads.
//!
//! Each region is one CTRL + READSECTION transaction followed by a poll
//! loop that drains whatever the adapter has buffered until exactly
//! `byte_count` bytes have arrived. The loop never reads past the end of a
//! region, so the sink sees every address once and in order.

use std::io::Write;
use std::thread;
use std::time::Instant;

use log::{debug, info, trace};

use super::{CancelToken, Progress, ProgressSink, TransferOptions};
use crate::core::cartridge::{total_bytes, TransferRegion};
use crate::core::error::{DumpError, DumpResult};
use crate::core::protocol::Command;
use crate::core::transport::Transport;

/// Read every region in order into `sink`. Returns the number of bytes written.
pub fn read_regions<T, W, P>(
    transport: &mut T,
    regions: &[TransferRegion],
    sink: &mut W,
    options: &TransferOptions,
    progress: &mut P,
    cancel: &CancelToken,
) -> DumpResult<usize>
where
    T: Transport + ?Sized,
    W: Write + ?Sized,
    P: ProgressSink + ?Sized,
{
    let total = total_bytes(regions);
    let mut done = 0usize;
    let mut buf = Vec::new();
    let mut last = None;

    for (index, region) in regions.iter().enumerate() {
        cancel.check()?;

        let ctrl = Command::Ctrl(region.read_lines());
        let read = region.read_command();
        debug!("{} / {}", ctrl, read);
        transport.write_all(&ctrl.encode())?;
        transport.write_all(&read.encode())?;

        let expected = region.byte_count();
        let mut received = 0usize;
        let mut idle_since = Instant::now();

        while received < expected {
            let available = transport.bytes_available()?;
            if available == 0 {
                cancel.check()?;
                if let Some(timeout) = options.stall_timeout {
                    let idle = idle_since.elapsed();
                    if idle >= timeout {
                        return Err(DumpError::Stalled { received, expected, idle });
                    }
                }
                if !options.poll_interval.is_zero() {
                    thread::sleep(options.poll_interval);
                }
                continue;
            }

            let chunk = available.min(expected - received);
            buf.resize(chunk, 0);
            transport.read_exactly(&mut buf)?;
            sink.write_all(&buf)?;

            received += chunk;
            done += chunk;
            idle_since = Instant::now();
            trace!("{}: {}/{} bytes", region, received, expected);

            let snapshot = Progress {
                kind: region.kind,
                region_index: index,
                region_count: regions.len(),
                region_done: received,
                region_total: expected,
                done,
                total,
            };
            progress.on_progress(&snapshot);
            last = Some(snapshot);
        }
    }

    sink.flush()?;
    if let Some(snapshot) = last {
        progress.on_finish(&snapshot);
    }
    if let Some(first) = regions.first() {
        info!("{} bytes of {} read in {} section(s)", done, first.kind, regions.len());
    }
    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cartridge::{rom_regions, sram_region, Layout, RegionKind};
    use crate::core::transfer::NullProgress;
    use crate::core::transport::EmulatedAdapter;
    use std::time::Duration;

    fn hirom_image(banks: usize) -> Vec<u8> {
        (0..banks * 0x10000).map(|i| (i % 251) as u8).collect()
    }

    fn ready(adapter: &mut EmulatedAdapter) {
        let mut byte = [0u8; 1];
        adapter.read_exactly(&mut byte).unwrap();
    }

    #[test]
    fn test_read_regions_in_bank_order() {
        let image = hirom_image(4);
        let mut adapter = EmulatedAdapter::new(image.clone(), Layout::HiRom, 0).with_chunk(1000);
        ready(&mut adapter);
        let regions = rom_regions(Layout::HiRom, image.len() as u64).unwrap();

        let mut out = Vec::<u8>::new();
        let mut updates = Vec::new();
        let mut progress = |p: &Progress| updates.push(*p);
        let n = read_regions(
            &mut adapter,
            &regions,
            &mut out,
            &TransferOptions::immediate(),
            &mut progress,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(n, image.len());
        assert_eq!(out, image);

        let last = updates.last().unwrap();
        assert!(last.is_complete());
        assert_eq!(last.region_index, 3);
        assert!(updates.windows(2).all(|w| w[0].done < w[1].done));
        assert!(updates.windows(2).all(|w| w[1].done - w[0].done <= 1000));
    }

    #[test]
    fn test_each_region_delivers_exact_count() {
        let image = hirom_image(2);
        let mut adapter = EmulatedAdapter::new(image, Layout::HiRom, 0).with_chunk(4096);
        ready(&mut adapter);
        let regions = rom_regions(Layout::HiRom, 0x20000).unwrap();

        let mut per_region = vec![0usize; regions.len()];
        let mut progress = |p: &Progress| per_region[p.region_index] = p.region_done;
        read_regions(
            &mut adapter,
            &regions,
            &mut std::io::sink(),
            &TransferOptions::immediate(),
            &mut progress,
            &CancelToken::new(),
        )
        .unwrap();

        for (region, done) in regions.iter().zip(per_region) {
            assert_eq!(done, region.byte_count());
        }
    }

    #[test]
    fn test_sram_dump_lorom() {
        let sram: Vec<u8> = (0..2048).map(|i| (i * 7) as u8).collect();
        let mut adapter = EmulatedAdapter::new(vec![0; 0x8000], Layout::LoRom, 2048).with_sram(sram.clone());
        ready(&mut adapter);
        let region = sram_region(Layout::LoRom, 2048).unwrap();

        let mut out = Vec::<u8>::new();
        read_regions(
            &mut adapter,
            &[region],
            &mut out,
            &TransferOptions::immediate(),
            &mut NullProgress,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(out, sram);
        assert_eq!(region.kind, RegionKind::Sram);
    }

    #[test]
    fn test_stall_times_out() {
        let mut adapter = EmulatedAdapter::new(hirom_image(1), Layout::HiRom, 0).with_stall_after(1 + 100);
        ready(&mut adapter);
        let regions = rom_regions(Layout::HiRom, 0x10000).unwrap();
        let options = TransferOptions {
            poll_interval: Duration::from_millis(1),
            write_delay: Duration::ZERO,
            stall_timeout: Some(Duration::from_millis(20)),
        };

        let mut out = Vec::<u8>::new();
        let result = read_regions(&mut adapter, &regions, &mut out, &options, &mut NullProgress, &CancelToken::new());
        match result {
            Err(DumpError::Stalled { received, expected, .. }) => {
                assert_eq!(received, 100);
                assert_eq!(expected, 0x10000);
            }
            other => panic!("expected stall, got {:?}", other),
        }
        assert_eq!(out.len(), 100);
    }

    #[test]
    fn test_cancel_while_waiting() {
        let mut adapter = EmulatedAdapter::new(hirom_image(1), Layout::HiRom, 0).with_stall_after(1);
        ready(&mut adapter);
        let regions = rom_regions(Layout::HiRom, 0x10000).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = read_regions(
            &mut adapter,
            &regions,
            &mut Vec::<u8>::new(),
            &TransferOptions::immediate(),
            &mut NullProgress,
            &cancel,
        );
        assert!(matches!(result, Err(DumpError::Interrupted)));
        assert!(adapter.commands.is_empty());
    }
}
