//! Configuração do dumper.
//! Padrões, depois variáveis de ambiente `SNESDUMP_*`, depois a linha de comando.

use std::time::Duration;

use log::debug;

use crate::core::error::{DumpError, DumpResult};
use crate::core::transport::DEFAULT_BAUD;

pub const ENV_PORT: &str = "SNESDUMP_PORT";
pub const ENV_BAUD: &str = "SNESDUMP_BAUD";
pub const ENV_POLL_MS: &str = "SNESDUMP_POLL_MS";
pub const ENV_WRITE_DELAY_MS: &str = "SNESDUMP_WRITE_DELAY_MS";
pub const ENV_TIMEOUT_MS: &str = "SNESDUMP_TIMEOUT_MS";

pub const USAGE: &str = "\
Usage: snesdump [options]

Options:
  --port <path>           Serial device (skips the selection menu)
  --baud <n>              Baud rate [default: 1000000]
  --poll-ms <n>           Sleep between polls while dumping [default: 1]
  --write-delay-ms <n>    Pause after each SRAM byte written [default: 1]
  --timeout-ms <n>        Abort a dump after n ms without data [default: wait forever]
  -h, --help              Show this help

Each option can also be set with SNESDUMP_PORT, SNESDUMP_BAUD, SNESDUMP_POLL_MS,
SNESDUMP_WRITE_DELAY_MS and SNESDUMP_TIMEOUT_MS. Logging is controlled by RUST_LOG.";

/// Configuração de execução
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumperConfig {
    pub port: Option<String>,
    pub baud: u32,
    pub poll_interval: Duration,
    pub write_delay: Duration,
    /// `None` espera para sempre
    pub stall_timeout: Option<Duration>,
}

impl Default for DumperConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: DEFAULT_BAUD,
            poll_interval: Duration::from_millis(1),
            write_delay: Duration::from_millis(1),
            stall_timeout: None,
        }
    }
}

/// O que a linha de comando pediu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliRequest {
    Run(DumperConfig),
    Help,
}

impl DumperConfig {
    /// Carrega a configuração do ambiente e de `std::env::args`
    pub fn load() -> DumpResult<CliRequest> {
        let mut config = DumperConfig::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        let args: Vec<String> = std::env::args().skip(1).collect();
        config.apply_args(&args)
    }

    /// Aplica variáveis de ambiente obtidas por `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> DumpResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT).filter(|p| !p.is_empty()) {
            self.port = Some(port);
        }
        if let Some(value) = lookup(ENV_BAUD) {
            self.baud = parse_number(ENV_BAUD, &value)?;
        }
        if let Some(value) = lookup(ENV_POLL_MS) {
            self.poll_interval = parse_millis(ENV_POLL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_WRITE_DELAY_MS) {
            self.write_delay = parse_millis(ENV_WRITE_DELAY_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.stall_timeout = parse_timeout(ENV_TIMEOUT_MS, &value)?;
        }
        Ok(())
    }

    /// Aplica os argumentos (sem o nome do programa)
    pub fn apply_args(mut self, args: &[String]) -> DumpResult<CliRequest> {
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            if flag == "-h" || flag == "--help" {
                return Ok(CliRequest::Help);
            }

            let value = args
                .get(i + 1)
                .ok_or_else(|| DumpError::Config(format!("{} needs a value", flag)))?;
            match flag {
                "--port" => self.port = Some(value.clone()),
                "--baud" => self.baud = parse_number(flag, value)?,
                "--poll-ms" => self.poll_interval = parse_millis(flag, value)?,
                "--write-delay-ms" => self.write_delay = parse_millis(flag, value)?,
                "--timeout-ms" => self.stall_timeout = parse_timeout(flag, value)?,
                _ => return Err(DumpError::Config(format!("unknown option {}", flag))),
            }
            i += 2;
        }

        debug!("Configuração: {:?}", self);
        Ok(CliRequest::Run(self))
    }
}

fn parse_number(name: &str, value: &str) -> DumpResult<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| DumpError::Config(format!("{} expects a number, got {:?}", name, value)))
}

fn parse_millis(name: &str, value: &str) -> DumpResult<Duration> {
    parse_number(name, value).map(|ms| Duration::from_millis(ms as u64))
}

/// Zero desliga o timeout
fn parse_timeout(name: &str, value: &str) -> DumpResult<Option<Duration>> {
    parse_millis(name, value).map(|d| if d.is_zero() { None } else { Some(d) })
}
