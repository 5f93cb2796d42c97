mod buffer;
pub mod processor;
mod types;

pub use buffer::FrameBuffer;
pub use processor::FrameProcessor;
pub use types::{
    ArcFrame, BoundingBox, Centroid, CentroidPoint, Frame, ImageFrame, SampleType, Samples,
};
