// snesdump-rs/src/core/cartridge/mod.rs

//! Cartridge module
//!
//! Header parsing and the LoROM/HiROM address mapper.

pub mod header;
pub mod mapper;

// Re-export types and functions
pub use header::{
    country_name, fetch_header, render_summary, CartridgeHeader, RawHeader, COUNTRIES, HEADER_LEN,
    TITLE_LEN,
};
pub use mapper::{
    header_region, rom_regions, sram_region, total_bytes, Layout, RegionKind, TransferRegion,
};
