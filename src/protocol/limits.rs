use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Caps applied to every declared size before anything is allocated, so a
/// desynchronized or misbehaving device cannot exhaust memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_width: usize,
    pub max_height: usize,
    pub max_depth: usize,
    pub max_payload_bytes: usize,
    pub max_bboxes: usize,
    pub max_centroids: usize,
    pub max_line_len: usize,
    /// Give up on a payload after this long without a single byte. Zero waits forever.
    pub payload_stall_timeout_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_width: 1024,
            max_height: 1024,
            max_depth: 16,
            max_payload_bytes: 16 * 1024 * 1024,
            max_bboxes: 256,
            max_centroids: 256,
            max_line_len: 4096,
            payload_stall_timeout_ms: 5000,
        }
    }
}

impl Limits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_dimensions(mut self, width: usize, height: usize, depth: usize) -> Self {
        self.max_width = width;
        self.max_height = height;
        self.max_depth = depth;
        self
    }

    pub fn with_max_payload_bytes(mut self, max_payload_bytes: usize) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }

    pub fn with_max_counts(mut self, bboxes: usize, centroids: usize) -> Self {
        self.max_bboxes = bboxes;
        self.max_centroids = centroids;
        self
    }

    pub fn with_payload_stall_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.payload_stall_timeout_ms = timeout_ms;
        self
    }

    pub fn payload_stall_timeout(&self) -> Option<Duration> {
        match self.payload_stall_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let caps = [
            ("max_width", self.max_width),
            ("max_height", self.max_height),
            ("max_depth", self.max_depth),
            ("max_payload_bytes", self.max_payload_bytes),
            ("max_line_len", self.max_line_len),
        ];
        for (name, value) in caps {
            if value == 0 {
                return Err(format!("{} must be greater than 0", name));
            }
        }
        Ok(())
    }
}
