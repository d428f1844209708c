// snesdump-rs/src/core/protocol/mod.rs

//! Wire protocol module
//!
//! Command codec and control-line packing for the cartridge adapter.

pub mod codec;
pub mod control;

pub use codec::{section_len, Command, OP_CTRL, OP_READ_SECTION, OP_WRITE_SECTION};
pub use control::ControlLines;
