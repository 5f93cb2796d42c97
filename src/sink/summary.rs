use crate::frame::{BoundingBox, Centroid, Frame, ImageFrame, SampleType};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Serializable view of a frame without the sample payloads.
#[derive(Debug, Serialize)]
pub struct FrameSummary<'a> {
    pub sequence: u64,
    pub received_at: DateTime<Utc>,
    pub image: ImageSummary<'a>,
    pub heatmap: ImageSummary<'a>,
    pub bboxes: &'a [BoundingBox],
    pub centroids: &'a [Centroid],
}

#[derive(Debug, Serialize)]
pub struct ImageSummary<'a> {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub sample_type: SampleType,
    pub meta: &'a str,
}

impl<'a> From<&'a ImageFrame> for ImageSummary<'a> {
    fn from(image: &'a ImageFrame) -> Self {
        Self {
            width: image.width,
            height: image.height,
            depth: image.depth,
            sample_type: image.sample_type(),
            meta: &image.meta,
        }
    }
}

impl<'a> From<&'a Frame> for FrameSummary<'a> {
    fn from(frame: &'a Frame) -> Self {
        Self {
            sequence: frame.sequence,
            received_at: frame.received_at,
            image: ImageSummary::from(&frame.image),
            heatmap: ImageSummary::from(&frame.heatmap),
            bboxes: &frame.bboxes,
            centroids: &frame.centroids,
        }
    }
}
