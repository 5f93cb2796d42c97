use super::FrameSink;
use crate::frame::{ArcFrame, Samples};
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Appends one row per frame: the running row index followed by the flattened
/// camera image, row-major.
pub struct CsvSink<W: Write + Send> {
    writer: W,
    rows: u64,
    label: String,
}

impl CsvSink<BufWriter<std::fs::File>> {
    /// Opens `path` for appending so successive captures accumulate in one file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open CSV file at {}", path.display()))?;
        info!("Saving image samples to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            rows: 0,
            label: path.display().to_string(),
        })
    }
}

impl<W: Write + Send> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            rows: 0,
            label: "writer".to_string(),
        }
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_row(&mut self, samples: &Samples) -> Result<()> {
        write!(self.writer, "{}", self.rows)?;
        match samples {
            Samples::UInt8(a) => {
                for v in a.iter() {
                    write!(self.writer, ",{}", v)?;
                }
            }
            Samples::Float32(a) => {
                for v in a.iter() {
                    write!(self.writer, ",{}", v)?;
                }
            }
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

impl<W: Write + Send> FrameSink for CsvSink<W> {
    fn on_frame(&mut self, frame: ArcFrame) -> Result<()> {
        self.write_row(&frame.image.samples)
            .with_context(|| format!("Failed to write CSV row for frame {}", frame.sequence))?;
        self.rows += 1;
        debug!("Wrote CSV row {} for frame {}", self.rows, frame.sequence);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush CSV output")?;
        info!("Saved {} image rows to {}", self.rows, self.label);
        Ok(())
    }

    fn name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::test_support::sample_frame;
    use std::fs;

    #[test]
    fn test_rows_are_indexed_and_flattened() {
        let mut sink = CsvSink::new(Vec::new());
        sink.on_frame(sample_frame(1)).unwrap();
        sink.on_frame(sample_frame(2)).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.rows(), 2);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["0,25,26.5,28,29,30.5,32", "1,25,26.5,28,29,30.5,32"]);
    }

    #[test]
    fn test_create_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.csv");
        for _ in 0..2 {
            let mut sink = CsvSink::create(&path).unwrap();
            sink.on_frame(sample_frame(1)).unwrap();
            sink.finish().unwrap();
        }
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
