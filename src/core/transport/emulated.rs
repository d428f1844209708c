// snesdump-rs/src/core/transport/emulated.rs

//! In-memory stand-in for the cartridge adapter.
//!
//! Decodes CTRL / READSECTION / WRITESECTION the way the firmware does and
//! serves them from a cartridge image, so the whole protocol can run without
//! hardware. It can also be told to stream in small chunks or to stop
//! sending partway through a section.

use std::collections::VecDeque;

use log::{debug, trace};

use super::Transport;
use crate::core::cartridge::mapper::{Layout, SRAM_BANK, SRAM_START_HIROM, SRAM_START_LOROM};
use crate::core::error::{DumpError, DumpResult};
use crate::core::protocol::{Command, ControlLines, OP_WRITE_SECTION};

/// Byte the adapter sends once after power-up
pub const READY_SIGNAL: u8 = b'R';

/// Emulated adapter with a cartridge inserted
pub struct EmulatedAdapter {
    rom: Vec<u8>,
    sram: Vec<u8>,
    layout: Layout,
    lines: ControlLines,
    inbound: Vec<u8>,
    outbound: VecDeque<u8>,
    /// Remaining SRAM bytes expected after a WRITESECTION, and where they go
    pending_write: Option<(usize, usize)>,
    /// Max bytes reported per `bytes_available` call
    chunk: usize,
    /// Stop streaming after this many bytes in total
    stall_after: Option<usize>,
    streamed: usize,
    closed: bool,

    pub commands: Vec<Command>,
    pub bytes_received: usize,
    pub sram_bytes_written: usize,
}

impl EmulatedAdapter {
    /// Cartridge with `rom` and `sram_size` bytes of blank (0xFF) SRAM.
    ///
    /// The ready signal is already queued, as after the adapter resets.
    pub fn new(rom: Vec<u8>, layout: Layout, sram_size: usize) -> Self {
        let mut outbound = VecDeque::new();
        outbound.push_back(READY_SIGNAL);
        Self {
            rom,
            sram: vec![0xFF; sram_size],
            layout,
            lines: ControlLines::empty(),
            inbound: Vec::new(),
            outbound,
            pending_write: None,
            chunk: usize::MAX,
            stall_after: None,
            streamed: 0,
            closed: false,
            commands: Vec::new(),
            bytes_received: 0,
            sram_bytes_written: 0,
        }
    }

    /// Adapter with nothing in the slot: every read returns zeroes
    pub fn empty_slot() -> Self {
        Self::new(Vec::new(), Layout::LoRom, 0)
    }

    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    pub fn with_stall_after(mut self, bytes: usize) -> Self {
        self.stall_after = Some(bytes);
        self
    }

    pub fn with_sram(mut self, sram: Vec<u8>) -> Self {
        self.sram = sram;
        self
    }

    pub fn sram(&self) -> &[u8] {
        &self.sram
    }

    pub fn lines(&self) -> ControlLines {
        self.lines
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn sram_start(&self) -> usize {
        let base = if self.layout.is_hirom() { SRAM_START_HIROM } else { SRAM_START_LOROM };
        (self.layout.read_offset() as usize) | base as usize
    }

    fn rom_reaches_bank(&self, bank: u8) -> bool {
        (bank as usize) * (self.layout.bank_size() as usize) < self.rom.len()
    }

    /// SRAM answers when cart-select or write-enable is asserted, or when the
    /// ROM is too small to occupy the SRAM bank.
    fn targets_sram(&self, bank: u8) -> bool {
        self.lines.intersects(ControlLines::CART_SELECT | ControlLines::WRITE_ENABLE)
            || (bank == SRAM_BANK && !self.rom_reaches_bank(bank))
    }

    fn read_byte(&self, bank: u8, addr: u16) -> u8 {
        if self.rom.is_empty() && self.sram.is_empty() {
            return 0x00;
        }
        if self.targets_sram(bank) {
            let start = self.sram_start();
            return (addr as usize)
                .checked_sub(start)
                .and_then(|offset| self.sram.get(offset).copied())
                .unwrap_or(0xFF);
        }
        let offset = (addr as usize).checked_sub(self.layout.read_offset() as usize);
        offset
            .map(|offset| bank as usize * self.layout.bank_size() as usize + offset)
            .and_then(|index| self.rom.get(index).copied())
            .unwrap_or(0xFF)
    }

    fn execute(&mut self, command: Command) {
        debug!("adaptador: {}", command);
        self.commands.push(command);
        match command {
            Command::Ctrl(lines) => self.lines = lines,
            Command::ReadSection { bank, start, end } => {
                for addr in start..=end {
                    let byte = self.read_byte(bank, addr);
                    self.outbound.push_back(byte);
                }
            }
            Command::WriteSection { start, .. } => {
                let remaining = command.payload_len();
                let offset = (start as usize).saturating_sub(self.sram_start());
                if remaining > 0 {
                    self.pending_write = Some((remaining, offset));
                }
            }
        }
    }

    fn feed(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            if let Some((remaining, offset)) = self.pending_write {
                let byte = bytes[0];
                bytes = &bytes[1..];
                if let Some(slot) = self.sram.get_mut(offset) {
                    *slot = byte;
                }
                self.sram_bytes_written += 1;
                self.pending_write = if remaining > 1 { Some((remaining - 1, offset + 1)) } else { None };
                continue;
            }

            self.inbound.push(bytes[0]);
            bytes = &bytes[1..];
            if let Some((command, used)) = Command::decode(&self.inbound) {
                self.inbound.drain(..used);
                self.execute(command);
            } else if self.inbound[0] > OP_WRITE_SECTION {
                trace!("adaptador: opcode desconhecido {:02X} ignorado", self.inbound[0]);
                self.inbound.remove(0);
            }
        }
    }

    fn streamable(&self) -> usize {
        let queued = self.outbound.len();
        let budget = match self.stall_after {
            Some(limit) => limit.saturating_sub(self.streamed),
            None => usize::MAX,
        };
        queued.min(budget)
    }

    fn ensure_open(&self) -> DumpResult<()> {
        if self.closed {
            Err(DumpError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "emulated adapter is closed",
            )))
        } else {
            Ok(())
        }
    }
}

impl Transport for EmulatedAdapter {
    fn write_all(&mut self, bytes: &[u8]) -> DumpResult<()> {
        self.ensure_open()?;
        self.bytes_received += bytes.len();
        self.feed(bytes);
        Ok(())
    }

    fn read_exactly(&mut self, buf: &mut [u8]) -> DumpResult<()> {
        self.ensure_open()?;
        if self.streamable() < buf.len() {
            // Real hardware would block forever here
            return Err(DumpError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "adapter has no more data",
            )));
        }
        for slot in buf.iter_mut() {
            *slot = self.outbound.pop_front().unwrap_or(0);
        }
        self.streamed += buf.len();
        Ok(())
    }

    fn bytes_available(&mut self) -> DumpResult<usize> {
        self.ensure_open()?;
        let available = self.streamable().min(self.chunk);
        trace!("adaptador: {} bytes disponíveis", available);
        Ok(available)
    }

    fn close(&mut self) -> DumpResult<()> {
        self.closed = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "emulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lorom_image(banks: usize) -> Vec<u8> {
        (0..banks * 0x8000).map(|i| (i / 0x8000) as u8 ^ (i as u8)).collect()
    }

    #[test]
    fn test_ready_signal_queued() {
        let mut adapter = EmulatedAdapter::new(lorom_image(1), Layout::LoRom, 0);
        let mut ready = [0u8; 1];
        adapter.read_exactly(&mut ready).unwrap();
        assert_eq!(ready[0], READY_SIGNAL);
        assert_eq!(adapter.bytes_available().unwrap(), 0);
    }

    #[test]
    fn test_lorom_header_window() {
        let mut rom = lorom_image(2);
        rom[0x7FC0] = b'Z';
        let mut adapter = EmulatedAdapter::new(rom, Layout::LoRom, 0);
        let mut ready = [0u8; 1];
        adapter.read_exactly(&mut ready).unwrap();

        adapter.write_all(&Command::Ctrl(ControlLines::header_read()).encode()).unwrap();
        adapter
            .write_all(&Command::ReadSection { bank: 0, start: 0xFFC0, end: 0xFFDF }.encode())
            .unwrap();
        assert_eq!(adapter.bytes_available().unwrap(), 32);

        let mut header = [0u8; 32];
        adapter.read_exactly(&mut header).unwrap();
        assert_eq!(header[0], b'Z');
        assert_eq!(adapter.lines(), ControlLines::header_read());
    }

    #[test]
    fn test_frames_split_across_writes() {
        let mut adapter = EmulatedAdapter::new(lorom_image(1), Layout::LoRom, 0);
        let frame = Command::ReadSection { bank: 0, start: 0x8000, end: 0x8003 }.encode();
        adapter.write_all(&frame[..3]).unwrap();
        assert!(adapter.commands.is_empty());
        adapter.write_all(&frame[3..]).unwrap();
        assert_eq!(adapter.commands.len(), 1);
        assert_eq!(adapter.bytes_available().unwrap(), 1 + 4);
    }

    #[test]
    fn test_sram_write_then_read_hirom() {
        let mut adapter = EmulatedAdapter::new(vec![0; 0x10000], Layout::HiRom, 4);
        adapter.write_all(&Command::Ctrl(ControlLines::sram_write(true)).encode()).unwrap();
        adapter
            .write_all(&Command::WriteSection { bank: 0x20, start: 0x6000, end: 0x6003 }.encode())
            .unwrap();
        adapter.write_all(&[1, 2, 3, 4]).unwrap();
        assert_eq!(adapter.sram(), &[1, 2, 3, 4]);
        assert_eq!(adapter.sram_bytes_written, 4);
    }

    #[test]
    fn test_chunk_and_stall() {
        let mut adapter = EmulatedAdapter::new(lorom_image(1), Layout::LoRom, 0)
            .with_chunk(3)
            .with_stall_after(6);
        adapter
            .write_all(&Command::ReadSection { bank: 0, start: 0x8000, end: 0x80FF }.encode())
            .unwrap();
        assert_eq!(adapter.bytes_available().unwrap(), 3);
        let mut buf = [0u8; 3];
        adapter.read_exactly(&mut buf).unwrap();
        adapter.read_exactly(&mut buf[..2]).unwrap();
        assert_eq!(adapter.bytes_available().unwrap(), 1);
        adapter.read_exactly(&mut buf[..1]).unwrap();
        assert_eq!(adapter.bytes_available().unwrap(), 0);
    }

    #[test]
    fn test_closed_adapter_rejects_io() {
        let mut adapter = EmulatedAdapter::empty_slot();
        adapter.close().unwrap();
        assert!(adapter.is_closed());
        assert!(adapter.write_all(&[0x00, 0x00]).is_err());
    }
}
