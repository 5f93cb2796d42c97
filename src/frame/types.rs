use chrono::{DateTime, Utc};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Numeric type of the samples in an image payload. The wire carries it as an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleType {
    UInt8,
    Float32,
}

impl SampleType {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(SampleType::UInt8),
            1 => Some(SampleType::Float32),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            SampleType::UInt8 => 0,
            SampleType::Float32 => 1,
        }
    }

    /// Bytes per sample on the wire.
    pub fn width(self) -> usize {
        match self {
            SampleType::UInt8 => 1,
            SampleType::Float32 => 4,
        }
    }
}

/// Row-major samples shaped `(height, width, depth)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    UInt8(Array3<u8>),
    Float32(Array3<f32>),
}

impl Samples {
    pub fn sample_type(&self) -> SampleType {
        match self {
            Samples::UInt8(_) => SampleType::UInt8,
            Samples::Float32(_) => SampleType::Float32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Samples::UInt8(a) => a.len(),
            Samples::Float32(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(height, width, depth)`
    pub fn dim(&self) -> (usize, usize, usize) {
        match self {
            Samples::UInt8(a) => a.dim(),
            Samples::Float32(a) => a.dim(),
        }
    }

    /// Sample at `(row, column, channel)`, widened to `f32`.
    pub fn get(&self, row: usize, col: usize, channel: usize) -> Option<f32> {
        match self {
            Samples::UInt8(a) => a.get((row, col, channel)).map(|&v| v as f32),
            Samples::Float32(a) => a.get((row, col, channel)).copied(),
        }
    }

    /// All samples in row-major order, widened to `f32`.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            Samples::UInt8(a) => a.iter().map(|&v| v as f32).collect(),
            Samples::Float32(a) => a.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    /// The title from the header, `image` or `heatmap` for slot images.
    pub title: String,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub samples: Samples,
    /// Header fields following the fixed ones, joined by commas.
    pub meta: String,
}

impl ImageFrame {
    pub fn sample_type(&self) -> SampleType {
        self.samples.sample_type()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn byte_len(&self) -> usize {
        self.sample_count() * self.sample_type().width()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Positional on the wire after `confidence`; only meaningful when a confidence is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            confidence: None,
            class_id: None,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CentroidPoint {
    pub x: f32,
    pub y: f32,
    pub count: u32,
}

impl CentroidPoint {
    pub fn new(x: f32, y: f32, count: u32) -> Self {
        Self { x, y, count }
    }
}

/// A tracked object's position, optionally linked to where it was on the previous frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Centroid {
    Bare(CentroidPoint),
    Tracked {
        current: CentroidPoint,
        previous: CentroidPoint,
        dist_squared: f32,
    },
}

impl Centroid {
    pub fn current(&self) -> &CentroidPoint {
        match self {
            Centroid::Bare(point) => point,
            Centroid::Tracked { current, .. } => current,
        }
    }

    pub fn previous(&self) -> Option<&CentroidPoint> {
        match self {
            Centroid::Bare(_) => None,
            Centroid::Tracked { previous, .. } => Some(previous),
        }
    }

    pub fn is_tracked(&self) -> bool {
        matches!(self, Centroid::Tracked { .. })
    }

    pub fn displacement(&self) -> Option<f32> {
        match self {
            Centroid::Bare(_) => None,
            Centroid::Tracked { dist_squared, .. } => Some(dist_squared.sqrt()),
        }
    }

    /// Tracked and displaced by at least `min_distance` pixels.
    pub fn is_moving(&self, min_distance: f32) -> bool {
        self.displacement().map_or(false, |d| d >= min_distance)
    }
}

/// One time-aligned bundle handed to sinks.
#[derive(Debug, Clone)]
pub struct Frame {
    pub sequence: u64,
    pub received_at: DateTime<Utc>,
    pub image: ImageFrame,
    pub heatmap: ImageFrame,
    pub bboxes: Vec<BoundingBox>,
    pub centroids: Vec<Centroid>,
}

pub type ArcFrame = Arc<Frame>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_type_indices() {
        assert_eq!(SampleType::from_index(0), Some(SampleType::UInt8));
        assert_eq!(SampleType::from_index(1), Some(SampleType::Float32));
        assert_eq!(SampleType::from_index(2), None);
        assert_eq!(SampleType::Float32.width(), 4);
        assert_eq!(SampleType::UInt8.index(), 0);
    }

    #[test]
    fn test_samples_are_row_major() {
        let array = Array3::from_shape_vec((2, 3, 1), vec![0u8, 1, 2, 3, 4, 5]).unwrap();
        let samples = Samples::UInt8(array);
        assert_eq!(samples.dim(), (2, 3, 1));
        assert_eq!(samples.get(1, 0, 0), Some(3.0));
        assert_eq!(samples.get(0, 2, 0), Some(2.0));
        assert_eq!(samples.get(2, 0, 0), None);
        assert_eq!(samples.to_f32_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_centroid_shapes() {
        let bare = Centroid::Bare(CentroidPoint::new(3.0, 4.0, 1));
        assert!(!bare.is_tracked());
        assert_eq!(bare.previous(), None);
        assert_eq!(bare.displacement(), None);
        assert!(!bare.is_moving(0.0));

        let tracked = Centroid::Tracked {
            current: CentroidPoint::new(3.0, 4.0, 1),
            previous: CentroidPoint::new(1.0, 2.0, 1),
            dist_squared: 2.25,
        };
        assert_eq!(tracked.current().x, 3.0);
        assert_eq!(tracked.previous().map(|p| p.y), Some(2.0));
        assert_eq!(tracked.displacement(), Some(1.5));
        assert!(tracked.is_moving(1.0));
        assert!(!tracked.is_moving(2.0));
    }

    #[test]
    fn test_bbox_center() {
        let bbox = BoundingBox::new(5.0, 5.0, 10.0, 4.0);
        assert_eq!(bbox.center(), (10.0, 7.0));
    }
}
