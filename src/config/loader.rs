use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::CliArgs;
use crate::error::AppError;
use crate::protocol::Limits;
use crate::source::{SourceConfig, SourceKind};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub limits: Limits,
    pub output: OutputConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv: Option<PathBuf>,
    pub jsonl: Option<PathBuf>,
    pub video: Option<PathBuf>,
    pub video_fps: u32,
    pub snapshot_dir: Option<PathBuf>,
    pub snapshot_every: u64,
    /// `[min, max]` mapped onto 0..=255 when rendering the camera image.
    pub value_range: Option<[f32; 2]>,
    /// Heatmap channels multiplied together when rendering the heatmap.
    pub heatmap_channels: Option<[usize; 2]>,
    /// Frames queued for file-backed sinks; 0 runs them on the session thread.
    pub channel_capacity: usize,
    pub max_frames: Option<u64>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv: None,
            jsonl: None,
            video: None,
            video_fps: 8,
            snapshot_dir: None,
            snapshot_every: 1,
            value_range: None,
            heatmap_channels: None,
            channel_capacity: 8,
            max_frames: None,
        }
    }
}

impl OutputConfig {
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.value_range.map(|[min, max]| (min, max))
    }

    pub fn heatmap_channels(&self) -> Option<(usize, usize)> {
        self.heatmap_channels.map(|[a, b]| (a, b))
    }

    fn validate(&self) -> Result<(), String> {
        let paths = [
            ("csv", self.csv.as_deref()),
            ("jsonl", self.jsonl.as_deref()),
            ("video", self.video.as_deref()),
            ("snapshot_dir", self.snapshot_dir.as_deref()),
        ];
        for (name, path) in paths {
            if path.map_or(false, |p| p.as_os_str().is_empty()) {
                return Err(format!("Output {} path cannot be empty", name));
            }
        }
        if self.video_fps == 0 {
            return Err("Video fps must be greater than 0".to_string());
        }
        if self.snapshot_every == 0 {
            return Err("snapshot_every must be greater than 0".to_string());
        }
        if let Some([min, max]) = self.value_range {
            if !(min < max) {
                return Err(format!("Invalid value range [{}, {}]", min, max));
            }
        }
        if self.max_frames == Some(0) {
            return Err("max_frames must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Where frame summaries are published when built with `zmq-publish`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub endpoint: Option<String>,
}

impl Config {
    /// Loads the file named on the command line, or the default file if it exists,
    /// then applies command-line overrides and validates the result.
    pub fn load(cli_args: &CliArgs) -> Result<Self> {
        let mut config = match &cli_args.config {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                info!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.override_with_cli_args(cli_args);
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn override_with_cli_args(&mut self, args: &CliArgs) {
        if let Some(path) = &args.device {
            self.source.kind = SourceKind::Device;
            self.source.path = Some(path.clone());
        }
        if let Some(address) = &args.tcp {
            self.source.kind = SourceKind::Tcp;
            self.source.address = Some(address.clone());
        }
        if let Some(path) = &args.follow {
            self.source.kind = SourceKind::Follow;
            self.source.path = Some(path.clone());
        }
        if let Some(path) = &args.file {
            self.source.kind = SourceKind::File;
            self.source.path = Some(path.clone());
        }
        if let Some(timeout) = args.read_timeout_ms {
            self.source.read_timeout_ms = timeout;
        }

        if let Some(path) = &args.csv {
            self.output.csv = Some(path.clone());
        }
        if let Some(path) = &args.jsonl {
            self.output.jsonl = Some(path.clone());
        }
        if let Some(path) = &args.video {
            self.output.video = Some(path.clone());
        }
        if let Some(dir) = &args.snapshot_dir {
            self.output.snapshot_dir = Some(dir.clone());
        }
        if args.max_frames.is_some() {
            self.output.max_frames = args.max_frames;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.source
            .validate()
            .map_err(AppError::Config)
            .context("Invalid source configuration")?;
        self.limits
            .validate()
            .map_err(AppError::Config)
            .context("Invalid limits")?;
        self.output
            .validate()
            .map_err(AppError::Config)
            .context("Invalid output configuration")?;

        if let Some(endpoint) = &self.publish.endpoint {
            if endpoint.is_empty() {
                return Err(AppError::config("Publish endpoint cannot be empty").into());
            }
            if !cfg!(feature = "zmq-publish") {
                warn!(
                    "Publish endpoint {} ignored: built without the zmq-publish feature",
                    endpoint
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [source]
            kind = "tcp"
            address = "127.0.0.1:5000"

            [limits]
            max_width = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.source.kind, SourceKind::Tcp);
        assert_eq!(config.source.read_timeout_ms, 100);
        assert_eq!(config.limits.max_width, 64);
        assert_eq!(config.limits.max_height, 1024);
        assert_eq!(config.output.video_fps, 8);
        assert_eq!(config.output.channel_capacity, 8);
        config.validate().unwrap();
    }

    #[test]
    fn test_output_ranges() {
        let config = Config::from_toml(
            r#"
            [output]
            value_range = [25.0, 32.0]
            heatmap_channels = [4, 5]
            "#,
        )
        .unwrap();
        assert_eq!(config.output.value_range(), Some((25.0, 32.0)));
        assert_eq!(config.output.heatmap_channels(), Some((4, 5)));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config = Config::from_toml("[source]\nread_timeout_ms = 250\n").unwrap();
        let args = CliArgs {
            file: Some(PathBuf::from("capture.bin")),
            csv: Some(PathBuf::from("out.csv")),
            max_frames: Some(5),
            ..CliArgs::default()
        };
        config.override_with_cli_args(&args);

        assert_eq!(config.source.kind, SourceKind::File);
        assert_eq!(config.source.path, Some(PathBuf::from("capture.bin")));
        assert_eq!(config.source.read_timeout_ms, 250);
        assert_eq!(config.output.csv, Some(PathBuf::from("out.csv")));
        assert_eq!(config.output.max_frames, Some(5));
    }

    #[test]
    fn test_cli_source_keeps_file_settings() {
        let mut config = Config::from_toml(
            "[source]\nkind = \"tcp\"\naddress = \"10.0.0.2:7000\"\npoll_interval_ms = 50\nbaud_rate = 921600\n",
        )
        .unwrap();
        let args = CliArgs {
            follow: Some(PathBuf::from("vusb")),
            ..CliArgs::default()
        };
        config.override_with_cli_args(&args);

        assert_eq!(config.source.kind, SourceKind::Follow);
        assert_eq!(config.source.path, Some(PathBuf::from("vusb")));
        assert_eq!(config.source.poll_interval_ms, 50);
        assert_eq!(config.source.baud_rate, 921_600);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.limits.max_width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.source = SourceConfig::tcp("");
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.value_range = Some([32.0, 25.0]);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.csv = Some(PathBuf::new());
        let err = config.validate().unwrap_err();
        assert!(err.downcast_ref::<AppError>().is_some());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[source]\nkind = \"file\"\npath = \"capture.bin\"").unwrap();
        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            ..CliArgs::default()
        };
        let config = Config::load(&args).unwrap();
        assert_eq!(config.source.kind, SourceKind::File);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let args = CliArgs {
            config: Some(PathBuf::from("/nonexistent/sensor_stream.toml")),
            ..CliArgs::default()
        };
        assert!(Config::load(&args).is_err());
    }
}
