use super::ByteSource;
use crate::cancel::CancelToken;
use crate::error::SourceError;
use std::collections::VecDeque;

enum Step {
    Bytes(Vec<u8>, usize),
    Idle,
}

/// In-memory source that replays a script of byte chunks and read timeouts.
///
/// Useful as a stand-in for a device: `idle()` makes the next read report no data,
/// `with_max_chunk` fragments binary reads the way a slow link does.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    pending: Vec<u8>,
    max_chunk: usize,
    idle_when_exhausted: bool,
    cancel: CancelToken,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            pending: Vec::new(),
            max_chunk: usize::MAX,
            idle_when_exhausted: false,
            cancel: CancelToken::new(),
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new().bytes(bytes)
    }

    pub fn bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        if !bytes.is_empty() {
            self.steps.push_back(Step::Bytes(bytes, 0));
        }
        self
    }

    pub fn idle(mut self) -> Self {
        self.steps.push_back(Step::Idle);
        self
    }

    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk.max(1);
        self
    }

    /// Report no data forever once the script runs out instead of closing.
    pub fn idle_when_exhausted(mut self) -> Self {
        self.idle_when_exhausted = true;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.steps.is_empty() && self.pending.is_empty()
    }

    fn exhausted(&self) -> Result<usize, SourceError> {
        if self.idle_when_exhausted {
            Ok(0)
        } else {
            Err(SourceError::Closed)
        }
    }
}

impl ByteSource for ScriptedSource {
    fn read_line(&mut self, line: &mut Vec<u8>) -> Result<usize, SourceError> {
        if self.cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }
        loop {
            match self.steps.front_mut() {
                None => {
                    if self.pending.is_empty() || self.idle_when_exhausted {
                        return self.exhausted();
                    }
                    line.clear();
                    line.append(&mut self.pending);
                    return Ok(line.len());
                }
                Some(Step::Idle) => {
                    self.steps.pop_front();
                    return Ok(0);
                }
                Some(Step::Bytes(bytes, pos)) => {
                    let rest = &bytes[*pos..];
                    match rest.iter().position(|&b| b == b'\n') {
                        Some(idx) => {
                            self.pending.extend_from_slice(&rest[..=idx]);
                            *pos += idx + 1;
                            if *pos == bytes.len() {
                                self.steps.pop_front();
                            }
                            line.clear();
                            line.append(&mut self.pending);
                            return Ok(line.len());
                        }
                        None => {
                            self.pending.extend_from_slice(rest);
                            self.steps.pop_front();
                        }
                    }
                }
            }
        }
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, SourceError> {
        if self.cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }
        let limit = buf.len().min(self.max_chunk);
        if !self.pending.is_empty() {
            let n = self.pending.len().min(limit);
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            return Ok(n);
        }
        match self.steps.front_mut() {
            None => self.exhausted(),
            Some(Step::Idle) => {
                self.steps.pop_front();
                Ok(0)
            }
            Some(Step::Bytes(bytes, pos)) => {
                let n = (bytes.len() - *pos).min(limit);
                buf[..n].copy_from_slice(&bytes[*pos..*pos + n]);
                *pos += n;
                if *pos == bytes.len() {
                    self.steps.pop_front();
                }
                Ok(n)
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_step_reports_no_data() {
        let mut src = ScriptedSource::new().bytes("ab").idle().bytes("c\n");
        let mut line = Vec::new();
        assert_eq!(src.read_line(&mut line).unwrap(), 0);
        assert_eq!(src.read_line(&mut line).unwrap(), 4);
        assert_eq!(line, b"abc\n");
        assert!(matches!(src.read_line(&mut line), Err(SourceError::Closed)));
    }

    #[test]
    fn test_max_chunk_fragments_reads() {
        let mut src = ScriptedSource::from_bytes(vec![1u8, 2, 3, 4, 5]).with_max_chunk(2);
        let mut buf = [0u8; 5];
        assert_eq!(src.read_some(&mut buf).unwrap(), 2);
        assert_eq!(src.read_some(&mut buf[2..]).unwrap(), 2);
        assert_eq!(src.read_some(&mut buf[4..]).unwrap(), 1);
        assert_eq!(buf, [1, 2, 3, 4, 5]);
        assert!(src.is_exhausted());
    }

    #[test]
    fn test_idle_when_exhausted() {
        let mut src = ScriptedSource::new().idle_when_exhausted();
        let mut line = Vec::new();
        assert_eq!(src.read_line(&mut line).unwrap(), 0);
        assert_eq!(src.read_some(&mut [0u8; 1]).unwrap(), 0);
    }
}
