use anyhow::Result;
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use log::{debug, info, LevelFilter};
use std::io;
use std::path::Path;

use crate::config::Config;
use crate::source::SourceKind;

/// Target used for free-form text the device prints between frames.
pub const DEVICE_TARGET: &str = "device";

pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn setup_logging(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let mut base_config = fern::Dispatch::new().level(level_for(verbosity));

    // File logs carry the full date
    let file_config = fern::Dispatch::new().format(|out, message, record| {
        out.finish(format_args!(
            "{}[{}][{}] {}",
            Local::now().format("[%Y-%m-%d][%H:%M:%S%.3f]"),
            record.target(),
            record.level(),
            message
        ))
    });

    let stdout_config = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                Local::now().format("[%H:%M:%S%.3f]"),
                record.target(),
                colors.color(record.level()),
                message
            ))
        })
        .chain(io::stdout());

    base_config = base_config.chain(stdout_config);

    if let Some(log_file) = log_file {
        base_config = base_config.chain(file_config.chain(fern::log_file(log_file)?));
    }

    base_config.apply()?;

    debug!("Logging initialized at {}", level_for(verbosity));

    Ok(())
}

pub fn log_app_start(version: &str) {
    info!("Starting sensor stream receiver v{}", version);
}

pub fn log_app_config(config: &Config) {
    info!("Application configured with:");
    info!("  Source:");
    info!("    Kind: {:?}", config.source.kind);
    if let Some(path) = &config.source.path {
        info!("    Path: {}", path.display());
    }
    if let Some(address) = &config.source.address {
        info!("    Address: {}", address);
    }
    if config.source.kind == SourceKind::Device {
        info!("    Baud rate: {}", config.source.baud_rate);
    }
    info!("    Read timeout: {} ms", config.source.read_timeout_ms);
    info!("  Limits:");
    info!(
        "    Max image: {}x{}x{}, {} bytes",
        config.limits.max_width,
        config.limits.max_height,
        config.limits.max_depth,
        config.limits.max_payload_bytes
    );
    info!(
        "    Max bboxes/centroids: {}/{}",
        config.limits.max_bboxes, config.limits.max_centroids
    );
    info!("    Payload stall timeout: {} ms", config.limits.payload_stall_timeout_ms);
    info!("  Output:");
    let outputs = [
        ("CSV", config.output.csv.as_deref()),
        ("JSON lines", config.output.jsonl.as_deref()),
        ("Video", config.output.video.as_deref()),
        ("Snapshots", config.output.snapshot_dir.as_deref()),
    ];
    for (label, path) in outputs {
        if let Some(path) = path {
            info!("    {}: {}", label, path.display());
        }
    }
    if let Some(max_frames) = config.output.max_frames {
        info!("    Max frames: {}", max_frames);
    }
}
