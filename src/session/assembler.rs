use crate::frame::{BoundingBox, Centroid, Frame, ImageFrame};
use chrono::Utc;
use log::debug;

/// One decoded piece of an assembly cycle.
#[derive(Debug, Clone)]
pub enum SubFrame {
    Image(ImageFrame),
    Heatmap(ImageFrame),
    BoundingBoxes(Vec<BoundingBox>),
    Centroids(Vec<Centroid>),
}

impl SubFrame {
    pub fn slot_name(&self) -> &'static str {
        match self {
            SubFrame::Image(_) => "image",
            SubFrame::Heatmap(_) => "heatmap",
            SubFrame::BoundingBoxes(_) => "bboxes",
            SubFrame::Centroids(_) => "centroids",
        }
    }
}

/// Collects one value per slot and emits a [`Frame`] once all four are present.
///
/// A slot that is written again before the frame completes keeps only the newest
/// value. Emitting empties every slot and advances the sequence number.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    image: Option<ImageFrame>,
    heatmap: Option<ImageFrame>,
    bboxes: Option<Vec<BoundingBox>>,
    centroids: Option<Vec<Centroid>>,
    sequence: u64,
    overwritten: u64,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the last emitted frame, zero before the first.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Slot values replaced before their frame completed.
    pub fn overwritten(&self) -> u64 {
        self.overwritten
    }

    pub fn filled_slots(&self) -> usize {
        [
            self.image.is_some(),
            self.heatmap.is_some(),
            self.bboxes.is_some(),
            self.centroids.is_some(),
        ]
        .iter()
        .filter(|&&filled| filled)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.filled_slots() == 0
    }

    pub fn offer(&mut self, part: SubFrame) -> Option<Frame> {
        let slot = part.slot_name();
        let replaced = match part {
            SubFrame::Image(image) => self.image.replace(image).is_some(),
            SubFrame::Heatmap(heatmap) => self.heatmap.replace(heatmap).is_some(),
            SubFrame::BoundingBoxes(bboxes) => self.bboxes.replace(bboxes).is_some(),
            SubFrame::Centroids(centroids) => self.centroids.replace(centroids).is_some(),
        };
        if replaced {
            self.overwritten += 1;
            debug!("Replaced stale {} slot before frame completed", slot);
        }
        self.try_emit()
    }

    /// Drops whatever the current cycle has collected.
    pub fn reset(&mut self) {
        self.image = None;
        self.heatmap = None;
        self.bboxes = None;
        self.centroids = None;
    }

    fn try_emit(&mut self) -> Option<Frame> {
        match (
            self.image.take(),
            self.heatmap.take(),
            self.bboxes.take(),
            self.centroids.take(),
        ) {
            (Some(image), Some(heatmap), Some(bboxes), Some(centroids)) => {
                self.sequence += 1;
                Some(Frame {
                    sequence: self.sequence,
                    received_at: Utc::now(),
                    image,
                    heatmap,
                    bboxes,
                    centroids,
                })
            }
            (image, heatmap, bboxes, centroids) => {
                self.image = image;
                self.heatmap = heatmap;
                self.bboxes = bboxes;
                self.centroids = centroids;
                None
            }
        }
    }
}
