// snesdump-rs/src/core/session/mod.rs

//! Session state machine
//!
//! `Disconnected -> Ready -> Busy(action) -> Ready -> ... -> Closed`.
//!
//! The session owns the transport for its whole lifetime and closes it on
//! every exit path, including drop. Every action starts with a fresh header
//! read because the cartridge may have been swapped since the last one.
//! Nothing is sent to the adapter on the way to `Closed`; it keeps whatever
//! control lines the last transaction set.

pub mod action;

pub use action::{Action, MENU};

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

use log::{debug, error, info, warn};

use crate::core::cartridge::{
    fetch_header, rom_regions, sram_region, CartridgeHeader, RegionKind, TransferRegion,
};
use crate::core::error::{DumpError, DumpResult};
use crate::core::transfer::{read_regions, write_region, CancelToken, ProgressSink, TransferOptions};
use crate::core::transport::Transport;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Ready,
    Busy(Action),
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "Disconnected"),
            SessionState::Ready => write!(f, "Ready"),
            SessionState::Busy(action) => write!(f, "Busy({})", action),
            SessionState::Closed => write!(f, "Closed"),
        }
    }
}

/// Outcome of a completed dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpReport {
    pub header: CartridgeHeader,
    pub bytes: usize,
    pub sections: usize,
}

/// A connection to one adapter
pub struct Session<T: Transport> {
    transport: T,
    state: SessionState,
    options: TransferOptions,
    cancel: CancelToken,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, options: TransferOptions, cancel: CancelToken) -> Self {
        Self {
            transport,
            state: SessionState::Disconnected,
            options,
            cancel,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Wait for the adapter's one-byte ready signal and enter `Ready`.
    pub fn connect(&mut self) -> DumpResult<()> {
        if self.state != SessionState::Disconnected {
            return Err(DumpError::InvalidState(self.state.to_string()));
        }
        let mut signal = [0u8; 1];
        if let Err(e) = self.transport.read_exactly(&mut signal) {
            error!("Adapter never signalled ready: {}", e);
            self.shutdown();
            return Err(e);
        }
        debug!("Ready signal {:02X} from {}", signal[0], self.transport.name());
        info!("Adapter ready on {}", self.transport.name());
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Read and return the cartridge header.
    pub fn info(&mut self) -> DumpResult<CartridgeHeader> {
        self.run(Action::Info, |session| fetch_header(&mut session.transport))
    }

    /// Dump the whole ROM into the sink opened by `open_sink`.
    ///
    /// The sink is only opened once the header is valid and the bank plan
    /// is known, so a failed header read leaves nothing behind.
    pub fn dump_rom<W, F, P>(&mut self, open_sink: F, progress: &mut P) -> DumpResult<DumpReport>
    where
        W: Write,
        F: FnOnce(&CartridgeHeader) -> DumpResult<W>,
        P: ProgressSink + ?Sized,
    {
        self.run(Action::DumpRom, |session| {
            session.dump_with(
                |header| rom_regions(header.layout(), header.rom_size_bytes()),
                open_sink,
                progress,
            )
        })
    }

    /// Dump the battery-backed SRAM into the sink opened by `open_sink`.
    pub fn dump_sram<W, F, P>(&mut self, open_sink: F, progress: &mut P) -> DumpResult<DumpReport>
    where
        W: Write,
        F: FnOnce(&CartridgeHeader) -> DumpResult<W>,
        P: ProgressSink + ?Sized,
    {
        self.run(Action::DumpSram, |session| {
            session.dump_with(
                |header| Ok(vec![sram_region(header.layout(), header.sram_size_bytes())?]),
                open_sink,
                progress,
            )
        })
    }

    /// Write `data` into SRAM. `NoSram` and `SizeMismatch` are raised before
    /// any SRAM transaction starts.
    pub fn write_sram<P>(&mut self, data: &[u8], progress: &mut P) -> DumpResult<usize>
    where
        P: ProgressSink + ?Sized,
    {
        self.run(Action::WriteSram, |session| {
            let header = fetch_header(&mut session.transport)?;
            let region = sram_region(header.layout(), header.sram_size_bytes())?;
            write_region(
                &mut session.transport,
                &region,
                data,
                &session.options,
                progress,
                &session.cancel,
            )
        })
    }

    /// `dump_rom` into a file, removing the partial file if the transfer fails.
    pub fn dump_rom_to_file<P>(&mut self, path: &Path, progress: &mut P) -> DumpResult<DumpReport>
    where
        P: ProgressSink + ?Sized,
    {
        let mut created = false;
        let result = self.dump_rom(|_| create_sink(path, &mut created), progress);
        cleanup_partial(path, created, &result);
        result
    }

    /// `dump_sram` into a file, removing the partial file if the transfer fails.
    pub fn dump_sram_to_file<P>(&mut self, path: &Path, progress: &mut P) -> DumpResult<DumpReport>
    where
        P: ProgressSink + ?Sized,
    {
        let mut created = false;
        let result = self.dump_sram(|_| create_sink(path, &mut created), progress);
        cleanup_partial(path, created, &result);
        result
    }

    /// Write the contents of a file into SRAM.
    pub fn write_sram_from_file<P>(&mut self, path: &Path, progress: &mut P) -> DumpResult<usize>
    where
        P: ProgressSink + ?Sized,
    {
        let data = read_input(path)?;
        self.write_sram(&data, progress)
    }

    /// Close the transport and enter `Closed`. Safe to call more than once.
    pub fn close(&mut self) -> DumpResult<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        info!("Closing {}", self.transport.name());
        self.transport.close()
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close {}: {}", self.transport.name(), e);
        }
    }

    /// Run one action: `Ready -> Busy(action) -> Ready`, or `Closed` on a
    /// fatal error or cancellation.
    fn run<R, F>(&mut self, action: Action, body: F) -> DumpResult<R>
    where
        F: FnOnce(&mut Self) -> DumpResult<R>,
    {
        if self.state != SessionState::Ready {
            return Err(DumpError::InvalidState(self.state.to_string()));
        }
        if let Err(e) = self.cancel.check() {
            self.shutdown();
            return Err(e);
        }

        self.state = SessionState::Busy(action);
        debug!("Session {}", self.state);
        let result = body(self);

        match &result {
            Ok(_) => self.state = SessionState::Ready,
            Err(e) if e.is_recoverable() => {
                warn!("{} aborted: {}", action, e);
                self.state = SessionState::Ready;
            }
            Err(e) => {
                error!("{} failed: {}", action, e);
                self.shutdown();
            }
        }
        result
    }

    fn dump_with<W, F, G, P>(&mut self, plan: G, open_sink: F, progress: &mut P) -> DumpResult<DumpReport>
    where
        W: Write,
        F: FnOnce(&CartridgeHeader) -> DumpResult<W>,
        G: FnOnce(&CartridgeHeader) -> DumpResult<Vec<TransferRegion>>,
        P: ProgressSink + ?Sized,
    {
        let header = fetch_header(&mut self.transport)?;
        let regions = plan(&header)?;
        let mut sink = open_sink(&header)?;
        let bytes = read_regions(
            &mut self.transport,
            &regions,
            &mut sink,
            &self.options,
            progress,
            &self.cancel,
        )?;

        let kind = regions.first().map(|r| r.kind).unwrap_or(RegionKind::Rom);
        info!("Dumped {} bytes of {} from \"{}\"", bytes, kind, header.title());
        Ok(DumpReport {
            header,
            bytes,
            sections: regions.len(),
        })
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn create_sink(path: &Path, created: &mut bool) -> DumpResult<BufWriter<File>> {
    let file = File::create(path).map_err(|source| DumpError::OutputFile {
        path: path.display().to_string(),
        source,
    })?;
    *created = true;
    Ok(BufWriter::new(file))
}

fn cleanup_partial<R>(path: &Path, created: bool, result: &DumpResult<R>) {
    if created && result.is_err() {
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed partial dump {}", path.display()),
            Err(e) => warn!("Could not remove partial dump {}: {}", path.display(), e),
        }
    }
}

/// Read an input file; a missing file is reported as `InputFileMissing`.
pub fn read_input(path: &Path) -> DumpResult<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DumpError::InputFileMissing(path.display().to_string()),
        _ => DumpError::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cartridge::Layout;
    use crate::core::transfer::NullProgress;
    use crate::core::transport::EmulatedAdapter;

    fn lorom_with_header() -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x7FC0..0x7FC4].copy_from_slice(b"TEST");
        rom[0x7FD5] = 0x20;
        rom[0x7FD7] = 0x05; // 32 KB
        rom[0x7FD8] = 0x01; // 2 KB SRAM
        rom
    }

    fn session(adapter: EmulatedAdapter) -> Session<EmulatedAdapter> {
        Session::new(adapter, TransferOptions::immediate(), CancelToken::new())
    }

    #[test]
    fn test_actions_need_ready() {
        let mut session = session(EmulatedAdapter::new(lorom_with_header(), Layout::LoRom, 2048));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(matches!(session.info(), Err(DumpError::InvalidState(_))));
        assert_eq!(session.transport().bytes_received, 0);

        session.connect().unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert!(matches!(session.connect(), Err(DumpError::InvalidState(_))));
    }

    #[test]
    fn test_info_returns_to_ready() {
        let mut session = session(EmulatedAdapter::new(lorom_with_header(), Layout::LoRom, 2048));
        session.connect().unwrap();
        let header = session.info().unwrap();
        assert_eq!(header.title(), "TEST");
        assert_eq!(header.sram_size_bytes(), 2048);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_dump_rom_into_memory() {
        let rom = lorom_with_header();
        let mut session = session(EmulatedAdapter::new(rom.clone(), Layout::LoRom, 0));
        session.connect().unwrap();

        let mut out = Vec::<u8>::new();
        let report = session.dump_rom(|_| Ok(&mut out), &mut NullProgress).unwrap();
        assert_eq!(report.bytes, 0x8000);
        assert_eq!(report.sections, 1);
        assert_eq!(out, rom);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = session(EmulatedAdapter::empty_slot());
        session.connect().unwrap();
        session.close().unwrap();
        session.close().unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.transport().is_closed());
        assert!(matches!(session.info(), Err(DumpError::InvalidState(_))));
    }

    #[test]
    fn test_missing_connect_byte_closes() {
        let mut adapter = EmulatedAdapter::empty_slot();
        let mut ready = [0u8; 1];
        adapter.read_exactly(&mut ready).unwrap();

        let mut session = session(adapter);
        assert!(session.connect().is_err());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_read_input_missing() {
        let path = std::env::temp_dir().join("snesdump-session-missing-input.srm");
        let _ = fs::remove_file(&path);
        assert!(matches!(read_input(&path), Err(DumpError::InputFileMissing(_))));
    }
}
