//! Conversions from decoded frames to what renderers and recorders consume.

use super::types::{ImageFrame, Samples};
use anyhow::{anyhow, bail, Result};
use image::{GrayImage, ImageBuffer};
use log::trace;
use ndarray::{Array3, Axis};

pub struct FrameProcessor;

impl FrameProcessor {
    /// Renders channel 0 as an 8-bit greyscale image.
    ///
    /// With a `value_range` the samples are mapped linearly from `[min, max]` onto
    /// `[0, 255]` and clamped. Without one, 8-bit frames pass through unchanged and
    /// float frames are stretched over their own min/max.
    pub fn to_luma8(image: &ImageFrame, value_range: Option<(f32, f32)>) -> Result<GrayImage> {
        let (height, width, _) = image.samples.dim();
        let channel: Vec<f32> = match &image.samples {
            Samples::UInt8(a) => {
                if value_range.is_none() {
                    let raw = a.index_axis(Axis(2), 0).iter().copied().collect();
                    return Self::gray_buffer(width, height, raw);
                }
                a.index_axis(Axis(2), 0).iter().map(|&v| v as f32).collect()
            }
            Samples::Float32(a) => a.index_axis(Axis(2), 0).iter().copied().collect(),
        };

        let (min, max) = value_range.unwrap_or_else(|| min_max(&channel));
        trace!("Normalizing {} over [{}, {}]", image.title, min, max);
        let span = max - min;
        let pixels = channel
            .iter()
            .map(|&v| {
                if span <= f32::EPSILON || !v.is_finite() {
                    0
                } else {
                    (((v - min) / span).clamp(0.0, 1.0) * 255.0).round() as u8
                }
            })
            .collect();
        Self::gray_buffer(width, height, pixels)
    }

    /// Per-pixel product of two channels as a single-channel float image.
    ///
    /// The device's heatmap carries per-cell scores in separate channels; their product
    /// is the objectness map shown next to the camera image.
    pub fn channel_product(image: &ImageFrame, a: usize, b: usize) -> Result<ImageFrame> {
        if a >= image.depth || b >= image.depth {
            bail!(
                "channels ({}, {}) out of range for {} with depth {}",
                a,
                b,
                image.title,
                image.depth
            );
        }
        let values: Array3<f32> = match &image.samples {
            Samples::UInt8(arr) => arr.mapv(|v| v as f32),
            Samples::Float32(arr) => arr.clone(),
        };
        let product = &values.index_axis(Axis(2), a) * &values.index_axis(Axis(2), b);

        Ok(ImageFrame {
            title: image.title.clone(),
            width: image.width,
            height: image.height,
            depth: 1,
            samples: Samples::Float32(product.insert_axis(Axis(2))),
            meta: image.meta.clone(),
        })
    }

    fn gray_buffer(width: usize, height: usize, pixels: Vec<u8>) -> Result<GrayImage> {
        ImageBuffer::from_raw(width as u32, height as u32, pixels)
            .ok_or_else(|| anyhow!("Failed to create {}x{} ImageBuffer", width, height))
    }
}

fn min_max(values: &[f32]) -> (f32, f32) {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}
