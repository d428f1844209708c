// snesdump-rs/src/core/protocol/codec.rs

//! Command framing for the three adapter opcodes.
//!
//! There is no length prefix, acknowledgment or checksum on the wire: the
//! adapter knows each parameter layout from the opcode alone, and both sides
//! derive the streamed byte count from `end - start + 1`.

use super::control::ControlLines;

pub const OP_CTRL: u8 = 0x00;
pub const OP_READ_SECTION: u8 = 0x01;
pub const OP_WRITE_SECTION: u8 = 0x02;

/// Length of a CTRL frame (opcode + nibble)
pub const CTRL_FRAME_LEN: usize = 2;
/// Length of a READSECTION / WRITESECTION frame (opcode + bank + 2x u16)
pub const SECTION_FRAME_LEN: usize = 6;

/// A single host -> adapter command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Set the four control lines
    Ctrl(ControlLines),
    /// Adapter streams `end - start + 1` bytes back
    ReadSection { bank: u8, start: u16, end: u16 },
    /// Adapter expects `end - start + 1` bytes to follow
    WriteSection { bank: u8, start: u16, end: u16 },
}

impl Command {
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Ctrl(_) => OP_CTRL,
            Command::ReadSection { .. } => OP_READ_SECTION,
            Command::WriteSection { .. } => OP_WRITE_SECTION,
        }
    }

    /// Number of payload bytes that travel after the frame (either direction).
    pub fn payload_len(&self) -> usize {
        match *self {
            Command::Ctrl(_) => 0,
            Command::ReadSection { start, end, .. } | Command::WriteSection { start, end, .. } => {
                section_len(start, end)
            }
        }
    }

    /// Encode the frame. Addresses are big-endian.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Command::Ctrl(lines) => vec![OP_CTRL, lines.bits()],
            Command::ReadSection { bank, start, end } | Command::WriteSection { bank, start, end } => {
                let mut frame = Vec::with_capacity(SECTION_FRAME_LEN);
                frame.push(self.opcode());
                frame.push(bank);
                frame.extend_from_slice(&start.to_be_bytes());
                frame.extend_from_slice(&end.to_be_bytes());
                frame
            }
        }
    }

    /// Decode one frame from the front of `bytes`.
    ///
    /// Returns the command and the number of bytes consumed, or `None` when
    /// the buffer does not yet hold a complete frame or the opcode is unknown.
    pub fn decode(bytes: &[u8]) -> Option<(Command, usize)> {
        let opcode = *bytes.first()?;
        match opcode {
            OP_CTRL => {
                let nibble = *bytes.get(1)?;
                Some((
                    Command::Ctrl(ControlLines::from_bits_truncate(nibble)),
                    CTRL_FRAME_LEN,
                ))
            }
            OP_READ_SECTION | OP_WRITE_SECTION => {
                if bytes.len() < SECTION_FRAME_LEN {
                    return None;
                }
                let bank = bytes[1];
                let start = u16::from_be_bytes([bytes[2], bytes[3]]);
                let end = u16::from_be_bytes([bytes[4], bytes[5]]);
                let command = if opcode == OP_READ_SECTION {
                    Command::ReadSection { bank, start, end }
                } else {
                    Command::WriteSection { bank, start, end }
                };
                Some((command, SECTION_FRAME_LEN))
            }
            _ => None,
        }
    }
}

/// Bytes covered by an inclusive `start..=end` window; empty when reversed.
pub fn section_len(start: u16, end: u16) -> usize {
    if end < start {
        0
    } else {
        end as usize - start as usize + 1
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Ctrl(lines) => write!(f, "CTRL [{}]", lines),
            Command::ReadSection { bank, start, end } => {
                write!(f, "READSECTION ${:02X}:{:04X}-{:04X}", bank, start, end)
            }
            Command::WriteSection { bank, start, end } => {
                write!(f, "WRITESECTION ${:02X}:{:04X}-{:04X}", bank, start, end)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_ctrl() {
        let frame = Command::Ctrl(ControlLines::header_read()).encode();
        assert_eq!(frame, vec![0x00, 0x09]);
    }

    #[test]
    fn test_encode_sections_big_endian() {
        let read = Command::ReadSection { bank: 0x00, start: 0xFFC0, end: 0xFFDF };
        assert_eq!(read.encode(), vec![0x01, 0x00, 0xFF, 0xC0, 0xFF, 0xDF]);
        assert_eq!(read.payload_len(), 32);

        let write = Command::WriteSection { bank: 0x20, start: 0x6000, end: 0x7FFF };
        assert_eq!(write.encode(), vec![0x02, 0x20, 0x60, 0x00, 0x7F, 0xFF]);
        assert_eq!(write.payload_len(), 0x2000);
    }

    #[test]
    fn test_decode_partial_and_unknown() {
        assert_eq!(Command::decode(&[]), None);
        assert_eq!(Command::decode(&[0x00]), None);
        assert_eq!(Command::decode(&[0x01, 0x00, 0x80]), None);
        assert_eq!(Command::decode(&[0x7F, 0x00]), None);
    }

    #[test]
    fn test_decode_stream() {
        let mut stream = Command::Ctrl(ControlLines::rom_read()).encode();
        stream.extend(Command::ReadSection { bank: 3, start: 0x8000, end: 0xFFFF }.encode());

        let (first, used) = Command::decode(&stream).unwrap();
        assert_eq!(first, Command::Ctrl(ControlLines::READ_ENABLE));
        let (second, rest) = Command::decode(&stream[used..]).unwrap();
        assert_eq!(second, Command::ReadSection { bank: 3, start: 0x8000, end: 0xFFFF });
        assert_eq!(used + rest, stream.len());
    }

    #[test]
    fn test_full_bank_len() {
        assert_eq!(section_len(0x0000, 0xFFFF), 0x10000);
        assert_eq!(section_len(0x10, 0x0F), 0);
    }
}
