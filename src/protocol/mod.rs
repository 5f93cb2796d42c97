//! The device's wire format: line-oriented ASCII headers with binary or line
//! payloads inline in the same stream.
//!
//! ```text
//! image:image,<w>,<h>,<d>,<sampleTypeIndex>,<misc...>\n<w*h*d*sampleWidth bytes>
//! image:heatmap,<w>,<h>,<d>,<sampleTypeIndex>,<misc...>\n<payload>
//! bboxes:<N>\n    then N lines  x,y,w,h[,confidence[,class_id]]
//! centroids:<N>\n then N lines  x,y,count  or  x,y,count-x_prev,y_prev,count_prev,distSquared
//! ```

pub mod decoder;
pub mod encoder;
mod limits;
pub mod scanner;

pub use decoder::{ImageHeader, PayloadDecoder};
pub use limits::Limits;
pub use scanner::{FrameScanner, HeaderTag, RawHeader, ScanStats};
