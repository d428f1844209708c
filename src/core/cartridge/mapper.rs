// snesdump-rs/src/core/cartridge/mapper.rs

//! LoROM / HiROM address mapping
//!
//! Turns the header's layout and sizes into the (bank, start, end) sections
//! the adapter understands. This is the only place that knows where the ROM
//! banks and the battery-backed SRAM sit on the cartridge bus.
//!
//! SRAM uses the bank $20 protocol revision: `start = read_offset | $6000`
//! on HiROM and `read_offset | $0050` on LoROM. The older bank $30 revision
//! (fixed $6000 / $8000 starts) is not supported.

use log::debug;

use crate::core::error::{DumpError, DumpResult};
use crate::core::protocol::{section_len, Command, ControlLines};

/// Size of a full 16-bit bank
pub const FULL_BANK: u32 = 0x10000;
/// Offset of the ROM window inside a LoROM bank
pub const LOROM_READ_OFFSET: u32 = 0x8000;
/// Bank used for every SRAM transfer
pub const SRAM_BANK: u8 = 0x20;
pub const SRAM_START_HIROM: u16 = 0x6000;
pub const SRAM_START_LOROM: u16 = 0x0050;
pub const HEADER_BANK: u8 = 0x00;
pub const HEADER_START: u16 = 0xFFC0;
pub const HEADER_END: u16 = 0xFFDF;

/// Cartridge memory layout, from bit 0 of the map-mode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    LoRom,
    HiRom,
}

impl Layout {
    pub fn from_map_mode(map_mode: u8) -> Self {
        if map_mode & 0x01 == 0 {
            Layout::LoRom
        } else {
            Layout::HiRom
        }
    }

    pub fn is_hirom(&self) -> bool {
        *self == Layout::HiRom
    }

    /// Offset of the ROM window within a bank
    pub fn read_offset(&self) -> u32 {
        match self {
            Layout::HiRom => 0,
            Layout::LoRom => LOROM_READ_OFFSET,
        }
    }

    /// Number of ROM bytes reachable through one bank
    pub fn bank_size(&self) -> u32 {
        FULL_BANK - self.read_offset()
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::LoRom => write!(f, "LoROM"),
            Layout::HiRom => write!(f, "HiROM"),
        }
    }
}

/// What a section belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Header,
    Rom,
    Sram,
}

impl std::fmt::Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionKind::Header => write!(f, "header"),
            RegionKind::Rom => write!(f, "ROM"),
            RegionKind::Sram => write!(f, "SRAM"),
        }
    }
}

/// One contiguous section of a bank, the unit of a single transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRegion {
    pub kind: RegionKind,
    pub layout: Layout,
    pub bank: u8,
    pub start: u16,
    pub end: u16,
}

impl TransferRegion {
    /// `end - start + 1`
    pub fn byte_count(&self) -> usize {
        section_len(self.start, self.end)
    }

    pub fn read_command(&self) -> Command {
        Command::ReadSection { bank: self.bank, start: self.start, end: self.end }
    }

    pub fn write_command(&self) -> Command {
        Command::WriteSection { bank: self.bank, start: self.start, end: self.end }
    }

    /// Control lines asserted before reading this region
    pub fn read_lines(&self) -> ControlLines {
        match self.kind {
            RegionKind::Header => ControlLines::header_read(),
            RegionKind::Rom => ControlLines::rom_read(),
            RegionKind::Sram => ControlLines::sram_read(self.layout.is_hirom()),
        }
    }

    /// Control lines asserted before writing this region
    pub fn write_lines(&self) -> ControlLines {
        ControlLines::sram_write(self.layout.is_hirom())
    }
}

impl std::fmt::Display for TransferRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ${:02X}:{:04X}-{:04X} ({} bytes)",
            self.kind,
            self.bank,
            self.start,
            self.end,
            self.byte_count()
        )
    }
}

/// The header window; identical for both layouts.
pub fn header_region() -> TransferRegion {
    TransferRegion {
        kind: RegionKind::Header,
        layout: Layout::LoRom,
        bank: HEADER_BANK,
        start: HEADER_START,
        end: HEADER_END,
    }
}

/// Split a ROM of `rom_size_bytes` into one region per bank, in bank order.
///
/// When the size is not a multiple of the bank size the last region covers
/// only the remainder, so the regions always add up to the exact ROM size.
pub fn rom_regions(layout: Layout, rom_size_bytes: u64) -> DumpResult<Vec<TransferRegion>> {
    let read_offset = layout.read_offset();
    let bank_size = layout.bank_size() as u64;

    let full_banks = rom_size_bytes / bank_size;
    let remainder = rom_size_bytes % bank_size;
    let bank_count = full_banks + u64::from(remainder != 0);

    if bank_count > u64::from(u8::MAX) + 1 {
        return Err(DumpError::AddressOverflow(format!(
            "{} bytes of {} ROM needs {} banks, the adapter addresses 256",
            rom_size_bytes, layout, bank_count
        )));
    }

    let mut regions = Vec::with_capacity(bank_count as usize);
    for bank in 0..bank_count {
        let len = if bank < full_banks { bank_size } else { remainder };
        let start = read_offset;
        let end = read_offset + len as u32 - 1;
        regions.push(TransferRegion {
            kind: RegionKind::Rom,
            layout,
            bank: bank as u8,
            start: start as u16,
            end: end as u16,
        });
    }

    if remainder != 0 {
        debug!(
            "ROM size {} is not a multiple of {} bytes; last bank reads {} bytes",
            rom_size_bytes, bank_size, remainder
        );
    }
    debug!("{} ROM plan: {} regions of up to {} bytes", layout, regions.len(), bank_size);

    Ok(regions)
}

/// The single SRAM region for a cartridge with `sram_size_bytes` of SRAM.
pub fn sram_region(layout: Layout, sram_size_bytes: u64) -> DumpResult<TransferRegion> {
    if sram_size_bytes == 0 {
        return Err(DumpError::NoSram);
    }

    let base = if layout.is_hirom() { SRAM_START_HIROM } else { SRAM_START_LOROM };
    let start = layout.read_offset() | u32::from(base);
    let end = (start as u64).saturating_add(sram_size_bytes - 1);

    if end > 0xFFFF {
        return Err(DumpError::AddressOverflow(format!(
            "{} bytes of SRAM starting at ${:04X} do not fit in one bank",
            sram_size_bytes, start
        )));
    }

    Ok(TransferRegion {
        kind: RegionKind::Sram,
        layout,
        bank: SRAM_BANK,
        start: start as u16,
        end: end as u16,
    })
}

/// Total bytes covered by a list of regions
pub fn total_bytes(regions: &[TransferRegion]) -> usize {
    regions.iter().map(TransferRegion::byte_count).sum()
}
