use super::{FrameSink, FrameSummary};
use crate::frame::ArcFrame;
use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes a [`FrameSummary`] per frame as newline-delimited JSON.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    written: u64,
}

impl JsonLinesSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create JSON lines file at {}", path.display()))?;
        info!("Saving frame summaries to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> FrameSink for JsonLinesSink<W> {
    fn on_frame(&mut self, frame: ArcFrame) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &FrameSummary::from(&*frame))
            .context("Failed to serialize frame summary")?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush JSON lines output")?;
        info!("Saved {} frame summaries", self.written);
        Ok(())
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}
