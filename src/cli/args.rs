use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Receive and decode the image, heatmap, bounding-box and centroid stream of an
/// embedded vision sensor.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("source").args(["device", "tcp", "follow", "file"])))]
pub struct CliArgs {
    /// TOML configuration file [default: config/default.toml if present]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Read from a serial device, e.g. /dev/ttyACM0
    #[arg(long)]
    pub device: Option<PathBuf>,

    /// Read from a TCP bridge, e.g. 127.0.0.1:5000
    #[arg(long)]
    pub tcp: Option<String>,

    /// Follow a file another process appends to, starting at its current end
    #[arg(long)]
    pub follow: Option<PathBuf>,

    /// Replay a recorded capture file
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Give up on a read after this many milliseconds so cancellation is noticed
    #[arg(long)]
    pub read_timeout_ms: Option<u64>,

    /// Append flattened camera images to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Write per-frame JSON summaries
    #[arg(long)]
    pub jsonl: Option<PathBuf>,

    /// Record the camera image stream to a video file (requires ffmpeg)
    #[arg(long)]
    pub video: Option<PathBuf>,

    /// Save PNG snapshots of each frame into this directory
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Enable debug logging (same as -v)
    #[arg(long)]
    pub debug: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl CliArgs {
    pub fn verbosity(&self) -> u8 {
        self.verbose.max(self.debug as u8)
    }
}
