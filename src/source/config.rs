use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Device,
    Tcp,
    Follow,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub path: Option<PathBuf>,
    pub address: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Device,
            path: Some(PathBuf::from("/dev/ttyACM0")),
            address: None,
            baud_rate: 115_200,
            read_timeout_ms: 100,
            poll_interval_ms: 10,
        }
    }
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: SourceKind::Device,
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn tcp(address: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Tcp,
            path: None,
            address: Some(address.into()),
            ..Self::default()
        }
    }

    pub fn follow(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: SourceKind::Follow,
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: SourceKind::File,
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_read_timeout_ms(mut self, read_timeout_ms: u64) -> Self {
        self.read_timeout_ms = read_timeout_ms;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn require_path(&self) -> Result<&Path> {
        self.path
            .as_deref()
            .ok_or_else(|| anyhow!("source kind {:?} requires a path", self.kind))
    }

    pub fn require_address(&self) -> Result<&str> {
        self.address
            .as_deref()
            .ok_or_else(|| anyhow!("source kind {:?} requires an address", self.kind))
    }

    pub fn validate(&self) -> Result<(), String> {
        match self.kind {
            SourceKind::Tcp if self.address.as_deref().map_or(true, str::is_empty) => {
                return Err("TCP source requires an address".to_string());
            }
            SourceKind::Device | SourceKind::Follow | SourceKind::File
                if self.path.as_ref().map_or(true, |p| p.as_os_str().is_empty()) =>
            {
                return Err(format!("{:?} source requires a path", self.kind));
            }
            _ => {}
        }
        if self.kind == SourceKind::Device && self.baud_rate == 0 {
            return Err("Baud rate must be greater than 0".to_string());
        }
        if self.read_timeout_ms == 0 {
            return Err("Read timeout must be greater than 0".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("Poll interval must be greater than 0".to_string());
        }
        Ok(())
    }
}
