use super::FrameSink;
use crate::frame::{ArcFrame, FrameProcessor};
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Saves the camera image and heatmap of every Nth frame as greyscale PNGs.
pub struct SnapshotSink {
    dir: PathBuf,
    every: u64,
    value_range: Option<(f32, f32)>,
    heatmap_channels: Option<(usize, usize)>,
    saved: u64,
}

impl SnapshotSink {
    pub fn new(dir: &Path, every: u64) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create snapshot directory {}", dir.display()))?;
        info!("Saving snapshots to {} every {} frame(s)", dir.display(), every.max(1));
        Ok(Self {
            dir: dir.to_path_buf(),
            every: every.max(1),
            value_range: None,
            heatmap_channels: None,
            saved: 0,
        })
    }

    /// Fixed mapping for the camera image instead of per-frame stretching.
    pub fn with_value_range(mut self, range: Option<(f32, f32)>) -> Self {
        self.value_range = range;
        self
    }

    /// Renders the product of two heatmap channels, in `[0, 1]`, instead of channel 0.
    pub fn with_heatmap_channels(mut self, channels: Option<(usize, usize)>) -> Self {
        self.heatmap_channels = channels;
        self
    }

    pub fn saved(&self) -> u64 {
        self.saved
    }

    pub fn image_path(&self, sequence: u64, slot: &str) -> PathBuf {
        self.dir.join(format!("frame_{:06}_{}.png", sequence, slot))
    }
}

impl FrameSink for SnapshotSink {
    fn on_frame(&mut self, frame: ArcFrame) -> Result<()> {
        if (frame.sequence.saturating_sub(1)) % self.every != 0 {
            return Ok(());
        }

        let image = FrameProcessor::to_luma8(&frame.image, self.value_range)?;
        let image_path = self.image_path(frame.sequence, "image");
        image
            .save(&image_path)
            .with_context(|| format!("Failed to save {}", image_path.display()))?;

        let heatmap = match self.heatmap_channels {
            Some((a, b)) => {
                let product = FrameProcessor::channel_product(&frame.heatmap, a, b)?;
                FrameProcessor::to_luma8(&product, Some((0.0, 1.0)))?
            }
            None => FrameProcessor::to_luma8(&frame.heatmap, None)?,
        };
        let heatmap_path = self.image_path(frame.sequence, "heatmap");
        heatmap
            .save(&heatmap_path)
            .with_context(|| format!("Failed to save {}", heatmap_path.display()))?;

        self.saved += 1;
        debug!("Saved snapshot for frame {}", frame.sequence);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        info!("Saved {} snapshot(s) to {}", self.saved, self.dir.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::test_support::sample_frame;

    #[test]
    fn test_saves_every_nth_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = SnapshotSink::new(dir.path(), 2).unwrap();
        for seq in 1..=4 {
            sink.on_frame(sample_frame(seq)).unwrap();
        }
        assert_eq!(sink.saved(), 2);
        assert!(sink.image_path(1, "image").exists());
        assert!(sink.image_path(1, "heatmap").exists());
        assert!(!sink.image_path(2, "image").exists());
        assert!(sink.image_path(3, "image").exists());
    }

    #[test]
    fn test_heatmap_channel_product() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = SnapshotSink::new(dir.path(), 1)
            .unwrap()
            .with_heatmap_channels(Some((0, 1)));
        sink.on_frame(sample_frame(1)).unwrap();

        let saved = image::open(sink.image_path(1, "heatmap")).unwrap().to_luma8();
        assert_eq!(saved.dimensions(), (3, 2));
        // 0.5 * 0.5 over [0, 1]
        assert_eq!(saved.get_pixel(0, 0)[0], 64);
    }

    #[test]
    fn test_bad_heatmap_channels_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = SnapshotSink::new(dir.path(), 1)
            .unwrap()
            .with_heatmap_channels(Some((4, 5)));
        assert!(sink.on_frame(sample_frame(1)).is_err());
    }
}
