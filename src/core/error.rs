//! Erros do dumper.
//! Todas as falhas detectáveis são verificações do lado do host; o
//! dispositivo não tem NACK nem checksum.

use std::time::Duration;

/// Erros do protocolo, do transporte e das ações da sessão
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Could not open serial port {port}: {reason}")]
    TransportUnavailable { port: String, reason: String },
    #[error("Cartridge header is empty (no cartridge inserted or read failure)")]
    HeaderInvalid,
    #[error("Cartridge reports no SRAM")]
    NoSram,
    #[error("File size does not match cartridge SRAM size (expected {expected} bytes, got {actual})")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("No such file: {0}")]
    InputFileMissing(String),
    #[error("Could not create {path}: {source}")]
    OutputFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Region does not fit the adapter address space: {0}")]
    AddressOverflow(String),
    #[error("Device stopped sending after {received}/{expected} bytes (no data for {idle:?}); reset the adapter and reconnect")]
    Stalled {
        received: usize,
        expected: usize,
        idle: Duration,
    },
    #[error("Interrupted")]
    Interrupted,
    #[error("Action not allowed while session is {0}")]
    InvalidState(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DumpError {
    /// Erros recuperáveis devolvem a sessão a `Ready`; os demais a encerram.
    pub fn is_recoverable(&self) -> bool {
        match self {
            DumpError::HeaderInvalid
            | DumpError::NoSram
            | DumpError::SizeMismatch { .. }
            | DumpError::InputFileMissing(_)
            | DumpError::OutputFile { .. }
            | DumpError::AddressOverflow(_)
            | DumpError::InvalidState(_) => true,
            // O adaptador pode voltar a transmitir o resto da seção a qualquer
            // momento; o fluxo de bytes não é mais confiável.
            DumpError::Stalled { .. }
            | DumpError::TransportUnavailable { .. }
            | DumpError::Interrupted
            | DumpError::Config(_)
            | DumpError::Io(_) => false,
        }
    }
}

/// Tipo de resultado para operações do dumper
pub type DumpResult<T> = Result<T, DumpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(DumpError::HeaderInvalid.is_recoverable());
        assert!(DumpError::NoSram.is_recoverable());
        assert!(DumpError::SizeMismatch { expected: 8192, actual: 10 }.is_recoverable());
        assert!(DumpError::InputFileMissing("save.srm".into()).is_recoverable());
        assert!(DumpError::OutputFile {
            path: "/nope/rom.sfc".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .is_recoverable());

        assert!(!DumpError::Interrupted.is_recoverable());
        assert!(!DumpError::TransportUnavailable {
            port: "/dev/ttyUSB0".into(),
            reason: "busy".into()
        }
        .is_recoverable());
        assert!(!DumpError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).is_recoverable());
        assert!(!DumpError::Stalled {
            received: 0,
            expected: 0x10000,
            idle: std::time::Duration::from_millis(5),
        }
        .is_recoverable());
    }

    #[test]
    fn test_size_mismatch_message() {
        let err = DumpError::SizeMismatch { expected: 8192, actual: 4096 };
        assert_eq!(
            err.to_string(),
            "File size does not match cartridge SRAM size (expected 8192 bytes, got 4096)"
        );
    }
}
