use super::types::ArcFrame;
use std::collections::VecDeque;

/// Fixed-capacity history of the most recent frames; the oldest frame is evicted first.
pub struct FrameBuffer {
    buffer: VecDeque<ArcFrame>,
    capacity: usize,
    total_pushed: u64,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            total_pushed: 0,
        }
    }

    pub fn push(&mut self, frame: ArcFrame) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(frame);
        self.total_pushed += 1;
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames pushed over the buffer's lifetime, including evicted ones.
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    pub fn latest(&self) -> Option<&ArcFrame> {
        self.buffer.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArcFrame> {
        self.buffer.iter()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, ImageFrame, Samples};
    use chrono::Utc;
    use ndarray::Array3;
    use std::sync::Arc;

    fn frame(sequence: u64) -> ArcFrame {
        let image = ImageFrame {
            title: "image".to_string(),
            width: 1,
            height: 1,
            depth: 1,
            samples: Samples::UInt8(Array3::zeros((1, 1, 1))),
            meta: String::new(),
        };
        Arc::new(Frame {
            sequence,
            received_at: Utc::now(),
            heatmap: image.clone(),
            image,
            bboxes: Vec::new(),
            centroids: Vec::new(),
        })
    }

    #[test]
    fn test_evicts_oldest() {
        let mut buffer = FrameBuffer::new(2);
        for seq in 1..=3 {
            buffer.push(frame(seq));
        }
        let kept: Vec<u64> = buffer.iter().map(|f| f.sequence).collect();
        assert_eq!(kept, vec![2, 3]);
        assert_eq!(buffer.latest().map(|f| f.sequence), Some(3));
        assert_eq!(buffer.total_pushed(), 3);
    }

    #[test]
    fn test_clear() {
        let mut buffer = FrameBuffer::new(4);
        buffer.push(frame(1));
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 4);
    }
}
