//! Transporte de bytes entre o host e o adaptador.
//! O núcleo só conhece este trait; a porta serial real e o adaptador
//! emulado são intercambiáveis.

pub mod emulated;
pub mod serial;

// Re-exportações para facilitar o uso
pub use emulated::EmulatedAdapter;
pub use serial::{list_ports, SerialTransport};

use crate::core::error::DumpResult;

/// Baud rate padrão do adaptador
pub const DEFAULT_BAUD: u32 = 1_000_000;

/// Fluxo duplex de bytes consumido pelo protocolo
pub trait Transport {
    /// Escreve todos os bytes, sem buffer intermediário
    fn write_all(&mut self, bytes: &[u8]) -> DumpResult<()>;

    /// Bloqueia até preencher `buf` por completo (ou o transporte fechar)
    fn read_exactly(&mut self, buf: &mut [u8]) -> DumpResult<()>;

    /// Quantos bytes podem ser lidos agora sem bloquear
    fn bytes_available(&mut self) -> DumpResult<usize>;

    /// Fecha o transporte; chamadas repetidas não fazem nada
    fn close(&mut self) -> DumpResult<()>;

    /// Nome para logs
    fn name(&self) -> &str {
        "transport"
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> DumpResult<()> {
        (**self).write_all(bytes)
    }

    fn read_exactly(&mut self, buf: &mut [u8]) -> DumpResult<()> {
        (**self).read_exactly(buf)
    }

    fn bytes_available(&mut self) -> DumpResult<usize> {
        (**self).bytes_available()
    }

    fn close(&mut self) -> DumpResult<()> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
