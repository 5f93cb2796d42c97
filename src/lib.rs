//! Host-side receiver for an embedded vision sensor that streams camera images,
//! detection heatmaps, bounding boxes and tracked centroids over one byte stream.
//!
//! This library provides:
//! - Byte sources for serial devices, TCP bridges, followed files and captures
//! - A resynchronizing decoder for the sensor's mixed text/binary wire format
//! - Assembly of the four streams into time-aligned frames
//! - Sinks that log, save, record or publish assembled frames

pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod frame;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod source;

pub use cancel::CancelToken;
pub use config::Config;
pub use error::{AppError, DecodeError, Result, SourceError};
pub use frame::{ArcFrame, BoundingBox, Centroid, CentroidPoint, Frame, ImageFrame, Samples};
pub use protocol::Limits;
pub use session::{Session, SessionOutcome, SessionSummary};
pub use sink::{FrameSink, SinkSet};
pub use source::ByteSource;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sets up logging at the given verbosity (0 info, 1 debug, 2+ trace) and logs
/// the application banner.
///
/// # Arguments
///
/// * `verbosity` - Log level selector
/// * `log_file` - Optional path to a log file. If None, logs only go to stdout.
pub fn initialize(verbosity: u8, log_file: Option<&std::path::Path>) -> anyhow::Result<()> {
    logging::setup_logging(verbosity, log_file)?;
    logging::log_app_start(VERSION);
    Ok(())
}
