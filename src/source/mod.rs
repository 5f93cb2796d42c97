//! Byte sources the decoder reads from.
//!
//! A source hands out two kinds of reads: newline-delimited lines for headers and
//! text payloads, and raw chunks for binary payloads. Both return `Ok(0)` when nothing
//! arrived within the source's read timeout; end of stream and disconnects are
//! reported as [`SourceError`].

mod config;
mod reader;
mod scripted;

pub use config::{SourceConfig, SourceKind};
pub use reader::{EofPolicy, ReaderSource};
pub use scripted::ScriptedSource;

use crate::cancel::CancelToken;
use crate::error::SourceError;
use anyhow::{Context, Result};
use log::info;
use serialport::SerialPort;
use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::net::TcpStream;
use std::path::Path;
use std::time::Duration;

pub trait ByteSource: Send {
    /// Replaces `line` with the next line, including its trailing `\n` when one was seen.
    ///
    /// Returns the number of bytes placed in `line`; zero means no complete line
    /// arrived in time and the caller should try again.
    fn read_line(&mut self, line: &mut Vec<u8>) -> std::result::Result<usize, SourceError>;

    /// Reads at most `buf.len()` bytes. Zero means no data arrived in time.
    fn read_some(&mut self, buf: &mut [u8]) -> std::result::Result<usize, SourceError>;

    /// Human readable description used in logs.
    fn name(&self) -> &str;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_line(&mut self, line: &mut Vec<u8>) -> std::result::Result<usize, SourceError> {
        (**self).read_line(line)
    }

    fn read_some(&mut self, buf: &mut [u8]) -> std::result::Result<usize, SourceError> {
        (**self).read_some(buf)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Opens a serial port in raw mode. Reads give up after `read_timeout`, so a silent
/// device still lets the session observe cancellation.
pub fn open_device(
    path: &Path,
    baud_rate: u32,
    read_timeout: Duration,
    cancel: CancelToken,
) -> io::Result<ReaderSource<Box<dyn SerialPort>>> {
    let port = serialport::new(path.to_string_lossy(), baud_rate)
        .timeout(read_timeout)
        .open()?;
    Ok(ReaderSource::new(port, path.display().to_string()).with_cancel(cancel))
}

/// Connects to a TCP bridge exposing the device stream (e.g. a socat PTY relay).
pub fn connect_tcp(
    address: &str,
    read_timeout: Duration,
    cancel: CancelToken,
) -> io::Result<ReaderSource<TcpStream>> {
    let stream = TcpStream::connect(address)?;
    stream.set_read_timeout(Some(read_timeout))?;
    stream.set_nodelay(true)?;
    Ok(ReaderSource::new(stream, format!("tcp://{}", address)).with_cancel(cancel))
}

/// Follows a file that another process keeps appending to, such as the buffer a BLE
/// notification handler writes into. Reading starts at the current end of the file.
pub fn follow_file(
    path: &Path,
    poll_interval: Duration,
    cancel: CancelToken,
) -> io::Result<ReaderSource<File>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::End(0))?;
    Ok(ReaderSource::new(file, format!("follow:{}", path.display()))
        .with_cancel(cancel)
        .with_eof_policy(EofPolicy::Wait(poll_interval)))
}

/// Replays a captured stream from the start; the session ends at end of file.
pub fn open_capture(path: &Path, cancel: CancelToken) -> io::Result<ReaderSource<File>> {
    let file = File::open(path)?;
    Ok(ReaderSource::new(file, format!("file:{}", path.display())).with_cancel(cancel))
}

/// Builds the source described by the configuration.
pub fn from_config(
    config: &SourceConfig,
    max_line_len: usize,
    cancel: CancelToken,
) -> Result<Box<dyn ByteSource>> {
    let source: Box<dyn ByteSource> = match config.kind {
        SourceKind::Device => {
            let path = config.require_path()?;
            Box::new(
                open_device(path, config.baud_rate, config.read_timeout(), cancel)
                    .with_context(|| format!("Failed to open device {}", path.display()))?
                    .with_max_line_len(max_line_len),
            )
        }
        SourceKind::Tcp => {
            let address = config.require_address()?;
            Box::new(
                connect_tcp(address, config.read_timeout(), cancel)
                    .with_context(|| format!("Failed to connect to {}", address))?
                    .with_max_line_len(max_line_len),
            )
        }
        SourceKind::Follow => {
            let path = config.require_path()?;
            Box::new(
                follow_file(path, config.poll_interval(), cancel)
                    .with_context(|| format!("Failed to follow {}", path.display()))?
                    .with_max_line_len(max_line_len),
            )
        }
        SourceKind::File => {
            let path = config.require_path()?;
            Box::new(
                open_capture(path, cancel)
                    .with_context(|| format!("Failed to open capture {}", path.display()))?
                    .with_max_line_len(max_line_len),
            )
        }
    };
    info!("Opened byte source {}", source.name());
    Ok(source)
}
