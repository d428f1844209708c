// snesdump-rs/src/core/cartridge/header.rs

//! SNES cartridge header (the 32 bytes at $00:FFC0-$00:FFDF).
//!
//! Only the all-zero pattern is rejected. Every other byte pattern is taken
//! as-is, even when the fields contradict each other.

use bytemuck::{Pod, Zeroable};
use log::{debug, info, warn};

use super::mapper::{header_region, Layout};
use crate::core::error::{DumpError, DumpResult};
use crate::core::protocol::{Command, ControlLines};
use crate::core::transport::Transport;

/// Size of the header window on the wire
pub const HEADER_LEN: usize = 32;
/// Length of the title field
pub const TITLE_LEN: usize = 21;

/// Country names indexed by the country-code byte
pub const COUNTRIES: [&str; 14] = [
    "Japan (NTSC)",
    "USA (NTSC)",
    "Europe, Oceania and Asia (PAL)",
    "Sweden (PAL)",
    "Finland (PAL)",
    "Denmark (PAL)",
    "France (PAL)",
    "Holland (PAL)",
    "Spain (PAL)",
    "Germany, Austria and Switzerland (PAL)",
    "Italy (PAL)",
    "Hong Kong and China (PAL)",
    "Indonesia (PAL)",
    "Korea (NTSC)",
];

/// Byte layout of the header window, field by field
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct RawHeader {
    pub title: [u8; TITLE_LEN],
    pub map_mode: u8,
    pub cart_type: u8,
    pub rom_size: u8,
    pub sram_size: u8,
    pub country: u8,
    pub licensee: u8,
    pub version: u8,
    pub complement: [u8; 2],
    pub checksum: [u8; 2],
}

/// Parsed cartridge header. Built fresh on every header read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    raw: RawHeader,
}

impl CartridgeHeader {
    /// Parse the 32-byte header window.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> DumpResult<Self> {
        let raw: RawHeader = bytemuck::pod_read_unaligned(bytes);
        if raw == RawHeader::zeroed() {
            return Err(DumpError::HeaderInvalid);
        }
        Ok(Self { raw })
    }

    pub fn raw(&self) -> &RawHeader {
        &self.raw
    }

    /// Title bytes exactly as stored in the cartridge
    pub fn title_bytes(&self) -> &[u8; TITLE_LEN] {
        &self.raw.title
    }

    /// Title for display. Trailing spaces and NUL padding are dropped, other
    /// non-printable bytes become '?'.
    pub fn title(&self) -> String {
        let title = &self.raw.title;
        let len = title
            .iter()
            .rposition(|&b| b != 0x00 && b != b' ')
            .map_or(0, |last| last + 1);
        title[..len]
            .iter()
            .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { '?' })
            .collect()
    }

    pub fn layout(&self) -> Layout {
        Layout::from_map_mode(self.raw.map_mode)
    }

    pub fn map_mode(&self) -> u8 {
        self.raw.map_mode
    }

    /// `1 << rom_size` kilobytes. Exponents past 63 saturate.
    pub fn rom_size_kb(&self) -> u64 {
        pow2(self.raw.rom_size)
    }

    pub fn rom_size_bytes(&self) -> u64 {
        self.rom_size_kb().saturating_mul(1024)
    }

    /// `(1 << sram_size) * 1024` bytes; a zero byte means no SRAM.
    pub fn sram_size_bytes(&self) -> u64 {
        if self.raw.sram_size == 0 {
            0
        } else {
            pow2(self.raw.sram_size).saturating_mul(1024)
        }
    }

    pub fn has_sram(&self) -> bool {
        self.sram_size_bytes() > 0
    }

    pub fn country_code(&self) -> u8 {
        self.raw.country
    }

    /// Country name, or the raw code when it is outside the table
    pub fn country(&self) -> String {
        country_name(self.raw.country)
    }

    pub fn version(&self) -> u8 {
        self.raw.version
    }

    /// Checksum word, big-endian: $1E is the high byte, $1F the low byte
    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes(self.raw.checksum)
    }

    /// Complement word, read in the same order from $1C/$1D
    pub fn checksum_complement(&self) -> u16 {
        u16::from_be_bytes(self.raw.complement)
    }

    /// Whether checksum and complement add up to $FFFF (display only)
    pub fn complement_matches(&self) -> bool {
        self.checksum() ^ self.checksum_complement() == 0xFFFF
    }
}

fn pow2(exponent: u8) -> u64 {
    1u64.checked_shl(exponent as u32).unwrap_or(u64::MAX)
}

pub fn country_name(code: u8) -> String {
    COUNTRIES
        .get(code as usize)
        .map(|name| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Issue a header read on the transport and parse the reply.
pub fn fetch_header<T: Transport + ?Sized>(transport: &mut T) -> DumpResult<CartridgeHeader> {
    let region = header_region();
    let ctrl = Command::Ctrl(ControlLines::header_read());
    let read = region.read_command();

    debug!("{}", ctrl);
    transport.write_all(&ctrl.encode())?;
    debug!("{}", read);
    transport.write_all(&read.encode())?;

    let mut bytes = [0u8; HEADER_LEN];
    transport.read_exactly(&mut bytes)?;

    match CartridgeHeader::parse(&bytes) {
        Ok(header) => {
            info!(
                "Header: \"{}\" {} {} KB ROM, {} bytes SRAM",
                header.title(),
                header.layout(),
                header.rom_size_kb(),
                header.sram_size_bytes()
            );
            Ok(header)
        }
        Err(e) => {
            warn!("Header window read back as all zeroes");
            Err(e)
        }
    }
}

/// Human-readable summary of a header. Pure function of the header bytes.
pub fn render_summary(header: &CartridgeHeader) -> String {
    let sram = if header.has_sram() {
        format!("{} KB", header.sram_size_bytes() / 1024)
    } else {
        "None".to_string()
    };
    let complement = if header.complement_matches() { "ok" } else { "mismatch" };

    let mut out = String::new();
    out.push_str(&format!(" Title:    {}\n", header.title()));
    out.push_str(&format!(" Layout:   {} (map mode ${:02X})\n", header.layout(), header.map_mode()));
    out.push_str(&format!(" ROM:      {} KB\n", header.rom_size_kb()));
    out.push_str(&format!(" SRAM:     {}\n", sram));
    out.push_str(&format!(" Country:  {}\n", header.country()));
    out.push_str(&format!(" Version:  {}\n", header.version()));
    out.push_str(&format!(
        " Checksum: ${:04X} (complement ${:04X}, {})",
        header.checksum(),
        header.checksum_complement(),
        complement
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[..TITLE_LEN].copy_from_slice(b"SUPER MARIO WORLD    ");
        bytes[21] = 0x20; // LoROM
        bytes[22] = 0x02;
        bytes[23] = 0x09; // 512 KB
        bytes[24] = 0x01; // 2 KB
        bytes[25] = 0x01; // USA
        bytes[26] = 0x01;
        bytes[27] = 0x00;
        bytes[28] = 0x25;
        bytes[29] = 0x5F;
        bytes[30] = 0xDA;
        bytes[31] = 0xA0;
        bytes
    }

    #[test]
    fn test_raw_header_is_32_bytes() {
        assert_eq!(std::mem::size_of::<RawHeader>(), HEADER_LEN);
    }

    #[test]
    fn test_parse_fields() {
        let header = CartridgeHeader::parse(&sample_bytes()).unwrap();
        assert_eq!(header.title(), "SUPER MARIO WORLD");
        assert_eq!(&header.title_bytes()[17..], b"    ");
        assert_eq!(header.layout(), Layout::LoRom);
        assert_eq!(header.rom_size_kb(), 512);
        assert_eq!(header.rom_size_bytes(), 512 * 1024);
        assert_eq!(header.sram_size_bytes(), 2048);
        assert_eq!(header.country(), "USA (NTSC)");
        assert_eq!(header.version(), 0);
        assert_eq!(header.checksum(), 0xDAA0);
        assert_eq!(header.checksum_complement(), 0x255F);
        assert!(header.complement_matches());
    }

    #[test]
    fn test_all_zero_is_invalid() {
        let result = CartridgeHeader::parse(&[0u8; HEADER_LEN]);
        assert!(matches!(result, Err(DumpError::HeaderInvalid)));
    }

    #[test]
    fn test_any_single_nonzero_byte_is_valid() {
        for i in 0..HEADER_LEN {
            let mut bytes = [0u8; HEADER_LEN];
            bytes[i] = 0x01;
            assert!(CartridgeHeader::parse(&bytes).is_ok(), "byte {} set", i);
        }
    }

    #[test]
    fn test_blank_title_with_checksum_is_valid() {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[31] = 0x12;
        let header = CartridgeHeader::parse(&bytes).unwrap();
        assert_eq!(header.title(), "");
        assert_eq!(header.checksum(), 0x0012);
    }

    #[test]
    fn test_title_padding() {
        let mut bytes = sample_bytes();
        bytes[..TITLE_LEN].fill(0x00);
        bytes[..4].copy_from_slice(b"TEST");
        assert_eq!(CartridgeHeader::parse(&bytes).unwrap().title(), "TEST");

        bytes[4..8].copy_from_slice(&[b' ', 0x00, b' ', 0x00]);
        assert_eq!(CartridgeHeader::parse(&bytes).unwrap().title(), "TEST");

        bytes[1] = 0x00;
        assert_eq!(CartridgeHeader::parse(&bytes).unwrap().title(), "T?ST");
    }

    #[test]
    fn test_checksum_byte_order() {
        let mut bytes = sample_bytes();
        bytes[28] = 0xED;
        bytes[29] = 0xCB;
        bytes[30] = 0x12;
        bytes[31] = 0x34;
        let header = CartridgeHeader::parse(&bytes).unwrap();
        assert_eq!(header.checksum(), 0x1234);
        assert_eq!(header.checksum_complement(), 0xEDCB);
        assert!(header.complement_matches());
    }

    #[test]
    fn test_country_lookup() {
        assert_eq!(country_name(0), "Japan (NTSC)");
        assert_eq!(country_name(1), "USA (NTSC)");
        assert_eq!(country_name(13), "Korea (NTSC)");
        assert_eq!(country_name(14), "14");
        assert_eq!(country_name(99), "99");
    }

    #[test]
    fn test_hirom_bit() {
        let mut bytes = sample_bytes();
        bytes[21] = 0x21;
        assert_eq!(CartridgeHeader::parse(&bytes).unwrap().layout(), Layout::HiRom);
        bytes[21] = 0x31;
        assert_eq!(CartridgeHeader::parse(&bytes).unwrap().layout(), Layout::HiRom);
        bytes[21] = 0x30;
        assert_eq!(CartridgeHeader::parse(&bytes).unwrap().layout(), Layout::LoRom);
    }

    #[test]
    fn test_absurd_sizes_saturate() {
        let mut bytes = sample_bytes();
        bytes[23] = 0xFF;
        bytes[24] = 0xFF;
        let header = CartridgeHeader::parse(&bytes).unwrap();
        assert_eq!(header.rom_size_kb(), u64::MAX);
        assert_eq!(header.sram_size_bytes(), u64::MAX);
    }

    #[test]
    fn test_no_sram() {
        let mut bytes = sample_bytes();
        bytes[24] = 0x00;
        let header = CartridgeHeader::parse(&bytes).unwrap();
        assert!(!header.has_sram());
        assert!(render_summary(&header).contains(" SRAM:     None\n"));
    }

    #[test]
    fn test_render_summary() {
        let header = CartridgeHeader::parse(&sample_bytes()).unwrap();
        let expected = " Title:    SUPER MARIO WORLD\n \
                        Layout:   LoROM (map mode $20)\n \
                        ROM:      512 KB\n \
                        SRAM:     2 KB\n \
                        Country:  USA (NTSC)\n \
                        Version:  0\n \
                        Checksum: $DAA0 (complement $255F, ok)";
        assert_eq!(render_summary(&header), expected);
    }

    #[test]
    fn test_render_summary_is_pure() {
        let first = CartridgeHeader::parse(&sample_bytes()).unwrap();
        let mut other = sample_bytes();
        other[25] = 0x00;
        let second = CartridgeHeader::parse(&other).unwrap();

        let a = render_summary(&first);
        let _ = render_summary(&second);
        let b = render_summary(&first);
        assert_eq!(a, b);
        assert_ne!(a, render_summary(&second));
    }
}
