use super::FrameSink;
use crate::frame::{ArcFrame, FrameProcessor};
use anyhow::{bail, Context, Result};
use log::{debug, error, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Encodes the camera image stream to a video file through an `ffmpeg` child process.
///
/// The encoder is started on the first frame, once the image size is known. Frames
/// whose size differs from the first one are rejected.
pub struct VideoRecorder {
    program: String,
    output_path: PathBuf,
    fps: u32,
    value_range: Option<(f32, f32)>,
    ffmpeg: Option<Child>,
    size: Option<(u32, u32)>,
    written: u64,
}

impl VideoRecorder {
    pub fn new(output_path: &Path, fps: u32) -> Self {
        Self {
            program: "ffmpeg".to_string(),
            output_path: output_path.to_path_buf(),
            fps: fps.max(1),
            value_range: None,
            ffmpeg: None,
            size: None,
            written: 0,
        }
    }

    pub fn with_value_range(mut self, range: Option<(f32, f32)>) -> Self {
        self.value_range = range;
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn frames_written(&self) -> u64 {
        self.written
    }

    pub fn ffmpeg_args(&self, width: u32, height: u32) -> Vec<String> {
        vec![
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            "gray".into(),
            "-video_size".into(),
            format!("{}x{}", width, height),
            "-framerate".into(),
            self.fps.to_string(),
            "-i".into(),
            "-".into(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "ultrafast".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-y".into(),
            self.output_path.display().to_string(),
        ]
    }

    fn start(&mut self, width: u32, height: u32) -> Result<()> {
        let child = Command::new(&self.program)
            .args(self.ffmpeg_args(width, height))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {} process", self.program))?;
        info!(
            "Started {} for {}x{} video at {} fps to {}",
            self.program,
            width,
            height,
            self.fps,
            self.output_path.display()
        );
        self.ffmpeg = Some(child);
        self.size = Some((width, height));
        Ok(())
    }
}

impl FrameSink for VideoRecorder {
    fn on_frame(&mut self, frame: ArcFrame) -> Result<()> {
        let gray = FrameProcessor::to_luma8(&frame.image, self.value_range)?;
        let dimensions = gray.dimensions();
        match self.size {
            None => self.start(dimensions.0, dimensions.1)?,
            Some(size) if size != dimensions => bail!(
                "Frame {} is {}x{}, video was started at {}x{}",
                frame.sequence,
                dimensions.0,
                dimensions.1,
                size.0,
                size.1
            ),
            Some(_) => {}
        }

        let stdin = self
            .ffmpeg
            .as_mut()
            .and_then(|child| child.stdin.as_mut())
            .context("Failed to get stdin of ffmpeg process")?;
        stdin
            .write_all(gray.as_raw())
            .context("Failed to write frame data to ffmpeg")?;

        self.written += 1;
        debug!("Wrote frame {} to video", frame.sequence);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut child) = self.ffmpeg.take() else {
            info!("No frames recorded, skipping video {}", self.output_path.display());
            return Ok(());
        };
        // Closing stdin ends the input stream.
        drop(child.stdin.take());

        let output = child
            .wait_with_output()
            .context("Failed to wait for ffmpeg process")?;
        if output.status.success() {
            info!(
                "Saved {} frames of video to {}",
                self.written,
                self.output_path.display()
            );
            Ok(())
        } else {
            error!("FFmpeg error: {}", String::from_utf8_lossy(&output.stderr));
            bail!("FFmpeg process failed with {}", output.status)
        }
    }

    fn name(&self) -> &str {
        "video"
    }
}

impl Drop for VideoRecorder {
    fn drop(&mut self) {
        if let Some(mut child) = self.ffmpeg.take() {
            if let Err(e) = child.kill() {
                error!("Failed to kill ffmpeg process: {}", e);
            }
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::test_support::sample_frame;

    #[test]
    fn test_ffmpeg_args_describe_gray_input() {
        let recorder = VideoRecorder::new(Path::new("out.mp4"), 8);
        let args = recorder.ffmpeg_args(32, 24);
        let joined = args.join(" ");
        assert!(joined.starts_with("-f rawvideo -pixel_format gray -video_size 32x24 -framerate 8"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_finish_without_frames_is_noop() {
        let mut recorder = VideoRecorder::new(Path::new("unused.mp4"), 8);
        recorder.finish().unwrap();
        assert_eq!(recorder.frames_written(), 0);
    }

    #[test]
    fn test_missing_encoder_fails_on_first_frame() {
        let mut recorder = VideoRecorder::new(Path::new("unused.mp4"), 8)
            .with_program("definitely-not-an-encoder-binary");
        assert!(recorder.on_frame(sample_frame(1)).is_err());
    }
}
