use super::ByteSource;
use crate::cancel::CancelToken;
use crate::error::SourceError;
use log::{trace, warn};
use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::thread;
use std::time::Duration;

pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// What a [`ReaderSource`] does when the underlying reader reports end of stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EofPolicy {
    /// End of stream is a disconnect.
    Close,
    /// More data may be appended later; sleep for the interval and report no data.
    Wait(Duration),
}

/// Adapts any blocking [`Read`] (serial node, TCP stream, file, in-memory cursor)
/// into a [`ByteSource`].
///
/// A line that is still incomplete when a read times out is kept and continued on
/// the next call. Lines longer than the configured maximum are handed out in pieces
/// so that a desynchronized binary stream cannot grow the buffer without bound.
pub struct ReaderSource<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    max_line_len: usize,
    eof_policy: EofPolicy,
    cancel: CancelToken,
    name: String,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            eof_policy: EofPolicy::Close,
            cancel: CancelToken::new(),
            name: name.into(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len.max(1);
        self
    }

    pub fn with_eof_policy(mut self, eof_policy: EofPolicy) -> Self {
        self.eof_policy = eof_policy;
        self
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    fn check_cancelled(&self) -> Result<(), SourceError> {
        if self.cancel.is_cancelled() {
            Err(SourceError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn take_pending(&mut self, line: &mut Vec<u8>) -> usize {
        line.clear();
        line.append(&mut self.pending);
        line.len()
    }

    /// Returns `Ok(0)` under the waiting policy, `Closed` otherwise.
    fn end_of_stream(&self) -> Result<usize, SourceError> {
        match self.eof_policy {
            EofPolicy::Close => Err(SourceError::Closed),
            EofPolicy::Wait(interval) => {
                thread::sleep(interval);
                Ok(0)
            }
        }
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

impl<R: Read + Send> ByteSource for ReaderSource<R> {
    fn read_line(&mut self, line: &mut Vec<u8>) -> Result<usize, SourceError> {
        self.check_cancelled()?;
        loop {
            let (consumed, complete) = {
                let available = match self.reader.fill_buf() {
                    Ok(available) => available,
                    Err(e) if is_timeout(&e) => return Ok(0),
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                };

                if available.is_empty() {
                    if !self.pending.is_empty() && self.eof_policy == EofPolicy::Close {
                        trace!("{}: returning unterminated final line", self.name);
                        return Ok(self.take_pending(line));
                    }
                    return self.end_of_stream();
                }

                let room = self.max_line_len.saturating_sub(self.pending.len());
                let window = &available[..available.len().min(room)];
                match window.iter().position(|&b| b == b'\n') {
                    Some(idx) => {
                        self.pending.extend_from_slice(&window[..=idx]);
                        (idx + 1, true)
                    }
                    None => {
                        self.pending.extend_from_slice(window);
                        (window.len(), false)
                    }
                }
            };
            self.reader.consume(consumed);

            if complete {
                return Ok(self.take_pending(line));
            }
            if self.pending.len() >= self.max_line_len {
                warn!(
                    "{}: line exceeded {} bytes without a newline, splitting it",
                    self.name, self.max_line_len
                );
                return Ok(self.take_pending(line));
            }
        }
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, SourceError> {
        self.check_cancelled()?;
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.pending.is_empty() {
            let n = self.pending.len().min(buf.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            return Ok(n);
        }
        loop {
            match self.reader.read(buf) {
                Ok(0) => return self.end_of_stream(),
                Ok(n) => return Ok(n),
                Err(e) if is_timeout(&e) => return Ok(0),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
