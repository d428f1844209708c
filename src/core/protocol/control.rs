// snesdump-rs/src/core/protocol/control.rs

//! Control line nibble sent with the CTRL opcode.

use bitflags::bitflags;

bitflags! {
    /// The four cartridge bus control lines, packed bit 3 -> bit 0.
    ///
    /// The byte carries the booleans as-is; any active-low interpretation
    /// happens on the adapter side.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlLines: u8 {
        const READ_ENABLE  = 0b1000;
        const WRITE_ENABLE = 0b0100;
        const CART_SELECT  = 0b0010;
        const RESET        = 0b0001;
    }
}

impl ControlLines {
    /// Build the nibble from the four independent lines.
    pub fn from_lines(read: bool, write: bool, cart_select: bool, reset: bool) -> Self {
        let mut lines = ControlLines::empty();
        lines.set(ControlLines::READ_ENABLE, read);
        lines.set(ControlLines::WRITE_ENABLE, write);
        lines.set(ControlLines::CART_SELECT, cart_select);
        lines.set(ControlLines::RESET, reset);
        lines
    }

    /// Lines used for the header window read.
    pub fn header_read() -> Self {
        ControlLines::READ_ENABLE | ControlLines::RESET
    }

    /// Lines used for every ROM bank read.
    pub fn rom_read() -> Self {
        ControlLines::READ_ENABLE
    }

    /// Lines used for an SRAM dump; HiROM boards also need cart-select.
    pub fn sram_read(hirom: bool) -> Self {
        Self::from_lines(true, false, hirom, false)
    }

    /// Lines used for an SRAM write.
    pub fn sram_write(hirom: bool) -> Self {
        Self::from_lines(false, true, hirom, false)
    }
}

impl std::fmt::Display for ControlLines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = |line: ControlLines, name: &str| {
            if self.contains(line) {
                name.to_string()
            } else {
                format!("!{}", name)
            }
        };
        write!(
            f,
            "{} {} {} {}",
            flag(ControlLines::READ_ENABLE, "RD"),
            flag(ControlLines::WRITE_ENABLE, "WR"),
            flag(ControlLines::CART_SELECT, "CS"),
            flag(ControlLines::RESET, "RST"),
        )
    }
}
