// Este é o ponto de entrada principal da biblioteca.
// O binário `snesdump` só cuida do menu, da seleção da porta e do SIGINT;
// todo o protocolo vive aqui.

// Módulos principais do projeto.
pub mod config;
pub mod core;

// Re-exportações para facilitar o uso.
pub use crate::config::DumperConfig;
pub use crate::core::cartridge::{CartridgeHeader, Layout, RegionKind, TransferRegion};
pub use crate::core::error::{DumpError, DumpResult};
pub use crate::core::session::{Action, DumpReport, Session, SessionState};
pub use crate::core::transport::Transport;

/// Versão da ferramenta.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
