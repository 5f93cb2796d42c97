//! One acquisition run against one device.
//!
//! A [`Session`] owns its byte source for its whole lifetime and drives the scanner,
//! decoder and assembler on the calling thread. Several sessions can run side by
//! side, one per device, since none of them share state.

mod assembler;

pub use assembler::{FrameAssembler, SubFrame};

use crate::cancel::CancelToken;
use crate::error::{DecodeError, Result, ScanError, SourceError};
use crate::frame::Frame;
use crate::protocol::{FrameScanner, HeaderTag, Limits, PayloadDecoder, RawHeader};
use crate::sink::FrameSink;
use crate::source::ByteSource;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Cancelled,
    SourceClosed,
    FrameLimit,
}

/// What a call to [`Session::next_frame`] produced.
#[derive(Debug)]
pub enum Acquired {
    Frame(Frame),
    End(SessionOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub frames: u64,
    pub advisory_lines: u64,
    pub resyncs: u64,
    pub skipped_images: u64,
    pub overwritten_slots: u64,
    pub elapsed: Duration,
    pub outcome: SessionOutcome,
}

impl SessionSummary {
    /// Mean frames per second over the session.
    pub fn frame_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }

    pub fn log(&self) {
        info!("Acquisition ended: {:?}", self.outcome);
        info!("  Frames: {} ({:.3} fps)", self.frames, self.frame_rate());
        info!("  Device log lines: {}", self.advisory_lines);
        info!("  Resyncs: {}", self.resyncs);
        info!("  Skipped images: {}", self.skipped_images);
        info!("  Overwritten slots: {}", self.overwritten_slots);
    }
}

pub struct Session<S> {
    source: S,
    scanner: FrameScanner,
    decoder: PayloadDecoder,
    assembler: FrameAssembler,
    cancel: CancelToken,
    max_frames: Option<u64>,
    frames: u64,
    skipped_images: u64,
}

impl<S: ByteSource> Session<S> {
    /// The token should be the one the source was built with, so that a blocked read
    /// observes cancellation too.
    pub fn new(source: S, limits: Limits, cancel: CancelToken) -> Self {
        Self {
            source,
            scanner: FrameScanner::new(),
            decoder: PayloadDecoder::new(limits),
            assembler: FrameAssembler::new(),
            cancel,
            max_frames: None,
            frames: 0,
            skipped_images: 0,
        }
    }

    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Blocks until a frame is complete or the session ends.
    ///
    /// Fatal decode and source errors are returned as errors; cancellation and a
    /// clean close between headers end the session normally.
    pub fn next_frame(&mut self) -> Result<Acquired> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(Acquired::End(SessionOutcome::Cancelled));
            }

            let header = match self.scanner.next_header(&mut self.source) {
                Ok(header) => header,
                Err(ScanError::NoData | ScanError::Resync) => continue,
                Err(ScanError::Source(SourceError::Cancelled)) => {
                    return Ok(Acquired::End(SessionOutcome::Cancelled));
                }
                Err(ScanError::Source(SourceError::Closed)) => {
                    if !self.assembler.is_empty() {
                        warn!(
                            "Source closed with {} of 4 slots filled, dropping partial frame",
                            self.assembler.filled_slots()
                        );
                        self.assembler.reset();
                    }
                    return Ok(Acquired::End(SessionOutcome::SourceClosed));
                }
                Err(ScanError::Source(e)) => {
                    error!("Byte source {} failed: {}", self.source.name(), e);
                    return Err(e.into());
                }
            };

            let part = match self.decode(&header) {
                Ok(Some(part)) => part,
                Ok(None) => continue,
                Err(e) if !e.is_fatal() => return Ok(Acquired::End(SessionOutcome::Cancelled)),
                Err(e) => {
                    error!("Failed to decode {} payload: {}", header.tag, e);
                    return Err(e.into());
                }
            };

            if let Some(frame) = self.assembler.offer(part) {
                debug!("Assembled frame {}", frame.sequence);
                return Ok(Acquired::Frame(frame));
            }
        }
    }

    fn decode(&mut self, header: &RawHeader) -> std::result::Result<Option<SubFrame>, DecodeError> {
        let source = &mut self.source;
        let part = match &header.tag {
            HeaderTag::Image => SubFrame::Image(self.decoder.decode_image(header, source)?),
            HeaderTag::Heatmap => SubFrame::Heatmap(self.decoder.decode_image(header, source)?),
            HeaderTag::BoundingBoxes => {
                SubFrame::BoundingBoxes(self.decoder.decode_bounding_boxes(header, source)?)
            }
            HeaderTag::Centroids => {
                SubFrame::Centroids(self.decoder.decode_centroids(header, source)?)
            }
            HeaderTag::OtherImage(title) => {
                let image = self.decoder.decode_image(header, source)?;
                debug!(
                    "Skipping {}x{}x{} image titled {:?}",
                    image.width, image.height, image.depth, title
                );
                self.skipped_images += 1;
                return Ok(None);
            }
        };
        Ok(Some(part))
    }

    /// Feeds frames to `sink` until the session ends, then finishes the sink.
    ///
    /// The sink is called on this thread in sequence order; a slow sink slows the
    /// loop down rather than losing frames.
    pub fn run(&mut self, sink: &mut dyn FrameSink) -> Result<SessionSummary> {
        let started = Instant::now();
        info!("Starting acquisition from {}", self.source.name());

        let pumped = self.pump(sink);
        let finished = sink.finish();
        if let Err(e) = &finished {
            error!("Failed to finish sink {}: {:#}", sink.name(), e);
        }
        let outcome = pumped?;
        finished?;

        let summary = self.summary(outcome, started.elapsed());
        summary.log();
        Ok(summary)
    }

    fn pump(&mut self, sink: &mut dyn FrameSink) -> Result<SessionOutcome> {
        loop {
            if let Some(max) = self.max_frames {
                if self.frames >= max {
                    return Ok(SessionOutcome::FrameLimit);
                }
            }
            match self.next_frame()? {
                Acquired::Frame(frame) => {
                    self.frames += 1;
                    sink.on_frame(Arc::new(frame))?;
                }
                Acquired::End(outcome) => return Ok(outcome),
            }
        }
    }

    pub fn summary(&self, outcome: SessionOutcome, elapsed: Duration) -> SessionSummary {
        let stats = self.scanner.stats();
        SessionSummary {
            frames: self.frames,
            advisory_lines: stats.advisory_lines,
            resyncs: stats.resyncs,
            skipped_images: self.skipped_images,
            overwritten_slots: self.assembler.overwritten(),
            elapsed,
            outcome,
        }
    }
}
