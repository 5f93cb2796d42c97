//! Consumers of assembled frames.
//!
//! A sink is called once per frame, in sequence order, from a single thread. It
//! receives shared ownership of the frame and may keep it.

mod channel;
mod csv;
mod jsonl;
mod snapshot;
mod summary;
mod video;
#[cfg(feature = "zmq-publish")]
mod zmq;

pub use self::csv::CsvSink;
pub use channel::ChannelSink;
pub use jsonl::JsonLinesSink;
pub use snapshot::SnapshotSink;
pub use summary::{FrameSummary, ImageSummary};
pub use video::VideoRecorder;
#[cfg(feature = "zmq-publish")]
pub use self::zmq::ZmqPublisher;

use crate::config::Config;
use crate::frame::{ArcFrame, FrameBuffer};
use anyhow::{Context, Result};
use log::{error, info};

pub trait FrameSink: Send {
    fn on_frame(&mut self, frame: ArcFrame) -> Result<()>;

    /// Flushes and releases resources once the session is over.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn on_frame(&mut self, frame: ArcFrame) -> Result<()> {
        (**self).on_frame(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Fans every frame out to several sinks in registration order.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn FrameSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: impl FrameSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }
}

impl FrameSink for SinkSet {
    fn on_frame(&mut self, frame: ArcFrame) -> Result<()> {
        for sink in &mut self.sinks {
            let name = sink.name().to_string();
            sink.on_frame(frame.clone())
                .with_context(|| format!("Sink {} failed on frame {}", name, frame.sequence))?;
        }
        Ok(())
    }

    /// Finishes every sink even if one fails; the first failure is returned.
    fn finish(&mut self) -> Result<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.finish() {
                error!("Failed to finish sink {}: {:#}", sink.name(), e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn name(&self) -> &str {
        "sinks"
    }
}

/// Logs a one-line description of every frame.
#[derive(Default)]
pub struct LogSink;

impl FrameSink for LogSink {
    fn on_frame(&mut self, frame: ArcFrame) -> Result<()> {
        let tracked = frame.centroids.iter().filter(|c| c.is_tracked()).count();
        info!(
            "Frame {}: image {}x{}x{}, heatmap {}x{}x{}, {} bboxes, {} centroids ({} tracked) | {}",
            frame.sequence,
            frame.image.width,
            frame.image.height,
            frame.image.depth,
            frame.heatmap.width,
            frame.heatmap.height,
            frame.heatmap.depth,
            frame.bboxes.len(),
            frame.centroids.len(),
            tracked,
            frame.image.meta
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Keeps the most recent frames in memory for a consumer that polls them.
pub struct MemorySink {
    buffer: FrameBuffer,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: FrameBuffer::new(capacity),
        }
    }

    pub fn frames(&self) -> &FrameBuffer {
        &self.buffer
    }
}

impl FrameSink for MemorySink {
    fn on_frame(&mut self, frame: ArcFrame) -> Result<()> {
        self.buffer.push(frame);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Builds the sinks the configuration asks for.
///
/// File-backed sinks run behind a bounded channel when `channel_capacity` is
/// non-zero, so disk latency is absorbed by a worker thread until the channel fills.
pub fn build_sinks(config: &Config) -> Result<SinkSet> {
    let output = &config.output;
    let mut writers = SinkSet::new();
    if let Some(path) = &output.csv {
        writers.push(CsvSink::create(path)?);
    }
    if let Some(path) = &output.jsonl {
        writers.push(JsonLinesSink::create(path)?);
    }
    if let Some(dir) = &output.snapshot_dir {
        writers.push(
            SnapshotSink::new(dir, output.snapshot_every)?
                .with_value_range(output.value_range())
                .with_heatmap_channels(output.heatmap_channels()),
        );
    }
    if let Some(path) = &output.video {
        writers.push(
            VideoRecorder::new(path, output.video_fps).with_value_range(output.value_range()),
        );
    }

    let mut sinks = SinkSet::new();
    sinks.push(LogSink);
    if !writers.is_empty() {
        info!("Output sinks: {}", writers.names().join(", "));
        if output.channel_capacity > 0 {
            sinks.push(ChannelSink::spawn(writers, output.channel_capacity)?);
        } else {
            sinks.push(writers);
        }
    }
    push_publisher(&mut sinks, config)?;
    Ok(sinks)
}

#[cfg(feature = "zmq-publish")]
fn push_publisher(sinks: &mut SinkSet, config: &Config) -> Result<()> {
    if let Some(endpoint) = &config.publish.endpoint {
        sinks.push(ZmqPublisher::bind(endpoint)?);
    }
    Ok(())
}

#[cfg(not(feature = "zmq-publish"))]
fn push_publisher(_sinks: &mut SinkSet, _config: &Config) -> Result<()> {
    Ok(())
}
