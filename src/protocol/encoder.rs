//! Device-side encoding of the wire format.
//!
//! Produces the byte stream the firmware emits, which makes it possible to replay
//! recorded frames into a decoder or to stand in for a device in tests.

use super::scanner::{BBOXES_PREFIX, CENTROIDS_PREFIX, IMAGE_PREFIX};
use crate::frame::{BoundingBox, Centroid, CentroidPoint, Frame, ImageFrame, Samples};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt::Write;

/// Decimal places the firmware prints for coordinates.
pub const DEFAULT_PRECISION: usize = 2;

/// Little-endian payload bytes in row-major order.
pub fn encode_samples(samples: &Samples) -> Vec<u8> {
    match samples {
        Samples::UInt8(a) => a.iter().copied().collect(),
        Samples::Float32(a) => {
            let values: Vec<f32> = a.iter().copied().collect();
            let mut bytes = vec![0u8; values.len() * 4];
            LittleEndian::write_f32_into(&values, &mut bytes);
            bytes
        }
    }
}

/// Header line, binary payload, and the newline the firmware prints after it.
pub fn encode_image(image: &ImageFrame) -> Vec<u8> {
    let header = format!(
        "{}{},{},{},{},{},{}\n",
        IMAGE_PREFIX,
        image.title,
        image.width,
        image.height,
        image.depth,
        image.sample_type().index(),
        image.meta
    );
    let mut bytes = header.into_bytes();
    bytes.extend(encode_samples(&image.samples));
    bytes.push(b'\n');
    bytes
}

/// Trailing fields are positional, so `class_id` is written only after a
/// `confidence`. A box carrying a class id without a confidence loses the class id.
pub fn encode_bounding_boxes(bboxes: &[BoundingBox], precision: usize) -> String {
    let mut out = format!("{}{}\n", BBOXES_PREFIX, bboxes.len());
    for bbox in bboxes {
        let _ = write!(
            out,
            "{:.p$},{:.p$},{:.p$},{:.p$}",
            bbox.x,
            bbox.y,
            bbox.w,
            bbox.h,
            p = precision
        );
        if let Some(confidence) = bbox.confidence {
            let _ = write!(out, ",{:.p$}", confidence, p = precision);
            if let Some(class_id) = bbox.class_id {
                let _ = write!(out, ",{}", class_id);
            }
        }
        out.push('\n');
    }
    out
}

fn write_point(out: &mut String, point: &CentroidPoint, precision: usize) {
    let _ = write!(
        out,
        "{:.p$},{:.p$},{}",
        point.x,
        point.y,
        point.count,
        p = precision
    );
}

pub fn encode_centroids(centroids: &[Centroid], precision: usize) -> String {
    let mut out = format!("{}{}\n", CENTROIDS_PREFIX, centroids.len());
    for centroid in centroids {
        match centroid {
            Centroid::Bare(point) => write_point(&mut out, point, precision),
            Centroid::Tracked {
                current,
                previous,
                dist_squared,
            } => {
                write_point(&mut out, current, precision);
                out.push('-');
                write_point(&mut out, previous, precision);
                let _ = write!(out, ",{:.p$}", dist_squared, p = precision);
            }
        }
        out.push('\n');
    }
    out
}

/// One assembly cycle in the order the firmware sends it.
pub fn encode_frame(frame: &Frame, precision: usize) -> Vec<u8> {
    let mut bytes = encode_image(&frame.image);
    bytes.extend(encode_image(&frame.heatmap));
    bytes.extend(encode_bounding_boxes(&frame.bboxes, precision).into_bytes());
    bytes.extend(encode_centroids(&frame.centroids, precision).into_bytes());
    bytes
}
