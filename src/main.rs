// snesdump-rs/src/main.rs

//! Menu interativo: escolhe a porta, espera o adaptador e despacha as ações.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use log::{error, info};

use snesdump::config::{CliRequest, USAGE};
use snesdump::core::cartridge::render_summary;
use snesdump::core::session::MENU;
use snesdump::core::transfer::{CancelToken, Progress, ProgressSink, TransferOptions};
use snesdump::core::transport::{list_ports, SerialTransport};
use snesdump::{Action, DumpError, DumpResult, DumperConfig, Session, Transport};

/// Flag compartilhada com o handler de SIGINT
static INTERRUPTED: OnceLock<Arc<AtomicBool>> = OnceLock::new();

fn install_interrupt_handler(flag: Arc<AtomicBool>) {
    if INTERRUPTED.set(flag).is_err() {
        return;
    }

    #[cfg(unix)]
    {
        // Primeiro Ctrl-C: pede o cancelamento e devolve o SIGINT ao padrão,
        // então um segundo Ctrl-C encerra o processo mesmo com o host
        // bloqueado numa leitura.
        extern "C" fn on_sigint(_signal: libc::c_int) {
            if let Some(flag) = INTERRUPTED.get() {
                flag.store(true, Ordering::SeqCst);
            }
            const HINT: &[u8] = b"\nInterrupting... press Ctrl-C again to quit now.\n";
            // SAFETY: write(2) and signal(2) are async-signal-safe.
            unsafe {
                libc::write(libc::STDERR_FILENO, HINT.as_ptr() as *const libc::c_void, HINT.len());
                libc::signal(libc::SIGINT, libc::SIG_DFL);
            }
        }

        // SAFETY: the handler only touches an atomic and async-signal-safe calls.
        unsafe {
            libc::signal(
                libc::SIGINT,
                on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t,
            );
        }
    }
}

/// Progress line on stdout with a running bytes/second rate
struct ConsoleProgress {
    label: &'static str,
    started: Instant,
}

impl ConsoleProgress {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&mut self, progress: &Progress) {
        let secs = self.started.elapsed().as_secs_f64();
        let rate = if secs > 0.0 { progress.done as f64 / secs } else { 0.0 };
        print!(
            "\r {} {}/{} bytes ({:.0} B/s)",
            self.label, progress.done, progress.total, rate
        );
        let _ = io::stdout().flush();
    }

    fn on_finish(&mut self, _progress: &Progress) {
        println!();
    }
}

fn prompt<R: BufRead>(input: &mut R, text: &str) -> DumpResult<Option<String>> {
    print!("{}", text);
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask for a file name until a non-empty one is given. `None` on end of input.
fn ask_path<R: BufRead>(input: &mut R, text: &str) -> DumpResult<Option<PathBuf>> {
    loop {
        match prompt(input, text)? {
            None => return Ok(None),
            Some(line) if line.is_empty() => continue,
            Some(line) => return Ok(Some(PathBuf::from(line))),
        }
    }
}

fn select_port<R: BufRead>(input: &mut R) -> DumpResult<String> {
    let ports = list_ports();
    if ports.is_empty() {
        return Err(DumpError::TransportUnavailable {
            port: "(none)".to_string(),
            reason: "no serial devices found".to_string(),
        });
    }

    println!("Available ports:");
    for (index, port) in ports.iter().enumerate() {
        println!(" {}: {}", index, port);
    }
    loop {
        let Some(line) = prompt(input, "Select port: ")? else {
            return Err(DumpError::Interrupted);
        };
        match line.parse::<usize>().ok().and_then(|index| ports.get(index)) {
            Some(port) => return Ok(port.clone()),
            None => println!("Invalid selection."),
        }
    }
}

fn perform<T, R>(session: &mut Session<T>, action: Action, input: &mut R) -> DumpResult<()>
where
    T: Transport,
    R: BufRead,
{
    match action {
        Action::Info => {
            let header = session.info()?;
            println!("{}", render_summary(&header));
        }
        Action::DumpRom => {
            let Some(path) = ask_path(input, "Save ROM as: ")? else {
                return Ok(());
            };
            let mut progress = ConsoleProgress::new("Dumping ROM");
            let report = session.dump_rom_to_file(&path, &mut progress)?;
            println!("Done. {} bytes written to {}", report.bytes, path.display());
        }
        Action::DumpSram => {
            let Some(path) = ask_path(input, "Save SRAM as: ")? else {
                return Ok(());
            };
            let mut progress = ConsoleProgress::new("Dumping SRAM");
            let report = session.dump_sram_to_file(&path, &mut progress)?;
            println!("Done. {} bytes written to {}", report.bytes, path.display());
        }
        Action::WriteSram => loop {
            let Some(path) = ask_path(input, "SRAM file to write: ")? else {
                return Ok(());
            };
            let mut progress = ConsoleProgress::new("Writing SRAM");
            match session.write_sram_from_file(&path, &mut progress) {
                Err(DumpError::InputFileMissing(_)) => println!("No such file."),
                Err(e) => return Err(e),
                Ok(_) => {
                    println!("Done.");
                    break;
                }
            }
        },
        Action::Help | Action::Quit => {}
    }
    Ok(())
}

fn run(config: DumperConfig) -> DumpResult<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let port = match config.port.clone() {
        Some(port) => port,
        None => select_port(&mut input)?,
    };
    let transport = SerialTransport::open(&port, config.baud)?;

    let flag = Arc::new(AtomicBool::new(false));
    let cancel = CancelToken::from_flag(flag.clone());
    let mut session = Session::new(transport, TransferOptions::from(&config), cancel.clone());
    install_interrupt_handler(flag);

    println!("Waiting for adapter on {}...", port);
    session.connect()?;
    println!("{}", MENU);

    loop {
        let Some(line) = prompt(&mut input, "> ")? else {
            break;
        };
        if cancel.is_cancelled() {
            println!("Interrupted.");
            break;
        }
        let Some(action) = Action::parse(&line) else {
            println!("Invalid selection. Type \"h\" for help");
            continue;
        };

        match action {
            Action::Help => println!("{}", MENU),
            Action::Quit => break,
            _ => match perform(&mut session, action, &mut input) {
                Ok(()) => {}
                Err(DumpError::Interrupted) => {
                    println!();
                    println!("Interrupted.");
                    break;
                }
                Err(e) if e.is_recoverable() => println!("{}", e),
                Err(e) => return Err(e),
            },
        }
    }

    info!("Leaving");
    session.close()
}

fn main() -> ExitCode {
    env_logger::init();

    let config = match DumperConfig::load() {
        Ok(CliRequest::Run(config)) => config,
        Ok(CliRequest::Help) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
