//! Núcleo do dumper: protocolo, mapeamento de endereços, cabeçalho,
//! transporte e o motor de transferência.

pub mod cartridge;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transfer;
pub mod transport;
