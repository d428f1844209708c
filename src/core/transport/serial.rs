//! Porta serial (tty) configurada direto via termios.
//! A porta é fechada no `Drop`, então qualquer saída da sessão a libera.

use log::{debug, info, warn};

use super::Transport;
use crate::core::error::{DumpError, DumpResult};

/// Lista as portas seriais candidatas (`/dev/tty[A-Za-z]*`, ou `/dev/tty.*` no macOS)
pub fn list_ports() -> Vec<String> {
    let pattern = if cfg!(target_os = "macos") {
        "/dev/tty.*"
    } else {
        "/dev/tty[A-Za-z]*"
    };

    match glob::glob(pattern) {
        Ok(paths) => paths
            .filter_map(Result::ok)
            .map(|path| path.to_string_lossy().into_owned())
            .collect(),
        Err(e) => {
            warn!("Padrão de portas inválido {}: {}", pattern, e);
            Vec::new()
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use std::fs::{File, OpenOptions};
        use std::io::{Read, Write};
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::io::AsRawFd;

        /// Porta serial aberta
        pub struct SerialTransport {
            file: Option<File>,
            path: String,
        }

        impl SerialTransport {
            /// Abre e configura a porta (8N1, modo raw, sem controle de fluxo)
            pub fn open(path: &str, baud: u32) -> DumpResult<Self> {
                let unavailable = |reason: String| DumpError::TransportUnavailable {
                    port: path.to_string(),
                    reason,
                };

                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .custom_flags(libc::O_NOCTTY)
                    .open(path)
                    .map_err(|e| unavailable(e.to_string()))?;

                configure(&file, baud).map_err(|e| unavailable(e.to_string()))?;
                info!("Porta {} aberta a {} baud", path, baud);

                Ok(Self {
                    file: Some(file),
                    path: path.to_string(),
                })
            }

            fn file(&mut self) -> DumpResult<&mut File> {
                self.file.as_mut().ok_or_else(|| {
                    DumpError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotConnected,
                        "serial port is closed",
                    ))
                })
            }
        }

        fn configure(file: &File, baud: u32) -> std::io::Result<()> {
            let fd = file.as_raw_fd();
            let speed = speed_for(baud)?;

            // SAFETY: `fd` é um descritor válido enquanto `file` existir e
            // `termios` é totalmente preenchido por tcgetattr.
            unsafe {
                let mut termios: libc::termios = std::mem::zeroed();
                if libc::tcgetattr(fd, &mut termios) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                libc::cfmakeraw(&mut termios);
                termios.c_cflag |= libc::CLOCAL | libc::CREAD;
                termios.c_cflag &= !(libc::CSTOPB | libc::PARENB | libc::CRTSCTS);
                termios.c_cc[libc::VMIN] = 1;
                termios.c_cc[libc::VTIME] = 0;
                if libc::cfsetispeed(&mut termios, speed) != 0
                    || libc::cfsetospeed(&mut termios, speed) != 0
                {
                    return Err(std::io::Error::last_os_error());
                }
                if libc::tcsetattr(fd, libc::TCSANOW, &termios) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                // Descarta lixo recebido antes da abertura
                libc::tcflush(fd, libc::TCIFLUSH);
            }
            Ok(())
        }

        cfg_if::cfg_if! {
            if #[cfg(any(target_os = "linux", target_os = "android"))] {
                fn speed_for(baud: u32) -> std::io::Result<libc::speed_t> {
                    let speed = match baud {
                        9_600 => libc::B9600,
                        19_200 => libc::B19200,
                        38_400 => libc::B38400,
                        57_600 => libc::B57600,
                        115_200 => libc::B115200,
                        230_400 => libc::B230400,
                        460_800 => libc::B460800,
                        500_000 => libc::B500000,
                        921_600 => libc::B921600,
                        1_000_000 => libc::B1000000,
                        2_000_000 => libc::B2000000,
                        _ => {
                            return Err(std::io::Error::new(
                                std::io::ErrorKind::InvalidInput,
                                format!("unsupported baud rate {}", baud),
                            ))
                        }
                    };
                    Ok(speed)
                }
            } else {
                // BSD/macOS aceitam o valor numérico direto
                fn speed_for(baud: u32) -> std::io::Result<libc::speed_t> {
                    Ok(baud as libc::speed_t)
                }
            }
        }

        impl Transport for SerialTransport {
            fn write_all(&mut self, bytes: &[u8]) -> DumpResult<()> {
                let file = self.file()?;
                file.write_all(bytes)?;
                file.flush()?;
                Ok(())
            }

            fn read_exactly(&mut self, buf: &mut [u8]) -> DumpResult<()> {
                self.file()?.read_exact(buf)?;
                Ok(())
            }

            fn bytes_available(&mut self) -> DumpResult<usize> {
                let fd = self.file()?.as_raw_fd();
                let mut count: libc::c_int = 0;
                // SAFETY: FIONREAD escreve um único int em `count`.
                let rc = unsafe { libc::ioctl(fd, libc::FIONREAD, &mut count) };
                if rc != 0 {
                    return Err(std::io::Error::last_os_error().into());
                }
                Ok(count.max(0) as usize)
            }

            fn close(&mut self) -> DumpResult<()> {
                if self.file.take().is_some() {
                    debug!("Porta {} fechada", self.path);
                }
                Ok(())
            }

            fn name(&self) -> &str {
                &self.path
            }
        }

        impl Drop for SerialTransport {
            fn drop(&mut self) {
                let _ = self.close();
            }
        }
    } else {
        /// Porta serial (indisponível nesta plataforma)
        pub struct SerialTransport {
            path: String,
        }

        impl SerialTransport {
            pub fn open(path: &str, _baud: u32) -> DumpResult<Self> {
                Err(DumpError::TransportUnavailable {
                    port: path.to_string(),
                    reason: "serial ports are only supported on unix hosts".to_string(),
                })
            }
        }

        impl Transport for SerialTransport {
            fn write_all(&mut self, _bytes: &[u8]) -> DumpResult<()> {
                Err(DumpError::TransportUnavailable { port: self.path.clone(), reason: "closed".into() })
            }

            fn read_exactly(&mut self, _buf: &mut [u8]) -> DumpResult<()> {
                Err(DumpError::TransportUnavailable { port: self.path.clone(), reason: "closed".into() })
            }

            fn bytes_available(&mut self) -> DumpResult<usize> {
                Ok(0)
            }

            fn close(&mut self) -> DumpResult<()> {
                Ok(())
            }
        }
    }
}
