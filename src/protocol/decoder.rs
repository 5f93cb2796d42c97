//! Reads the payload that follows a header and turns it into typed values.
//!
//! Once a header has been accepted the payload must match it exactly. Any shape
//! violation is reported instead of skipped, since dropping bytes would shift every
//! later header out of alignment.

use super::limits::Limits;
use super::scanner::{HeaderTag, RawHeader};
use crate::error::{DecodeError, SourceError};
use crate::frame::{BoundingBox, Centroid, CentroidPoint, ImageFrame, SampleType, Samples};
use crate::source::ByteSource;
use byteorder::{ByteOrder, LittleEndian};
use log::{trace, warn};
use ndarray::Array3;
use std::str::FromStr;
use std::time::Instant;

/// Number of fixed fields after the title of an image header.
const IMAGE_FIXED_FIELDS: usize = 4;

/// Typed view of an image header's fields: `w,h,d,sampleTypeIndex,misc...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub sample_type: SampleType,
    pub meta: String,
}

impl ImageHeader {
    pub fn from_raw(header: &RawHeader) -> Result<Self, DecodeError> {
        if !header.tag.is_image() {
            return Err(DecodeError::malformed(format!(
                "expected an image header, got {}",
                header.tag
            )));
        }
        if header.fields.len() < IMAGE_FIXED_FIELDS {
            return Err(DecodeError::malformed(format!(
                "{} header has {} fields, expected at least {}",
                header.tag,
                header.fields.len(),
                IMAGE_FIXED_FIELDS
            )));
        }
        let index: u8 = parse_field(&header.fields[3], "sample type")?;
        let sample_type = SampleType::from_index(index)
            .ok_or_else(|| DecodeError::malformed(format!("unknown sample type index {}", index)))?;

        Ok(Self {
            width: parse_field(&header.fields[0], "width")?,
            height: parse_field(&header.fields[1], "height")?,
            depth: parse_field(&header.fields[2], "depth")?,
            sample_type,
            meta: header.fields[IMAGE_FIXED_FIELDS..].join(","),
        })
    }

    pub fn sample_count(&self) -> Option<usize> {
        self.width.checked_mul(self.height)?.checked_mul(self.depth)
    }

    /// Payload length in bytes, `None` on overflow.
    pub fn byte_len(&self) -> Option<usize> {
        self.sample_count()?.checked_mul(self.sample_type.width())
    }
}

/// Parses the element count of a `bboxes:` or `centroids:` header.
pub fn parse_count(header: &RawHeader) -> Result<usize, DecodeError> {
    match header.fields.as_slice() {
        [count] => parse_field(count, "count"),
        other => Err(DecodeError::malformed(format!(
            "{} header has {} fields, expected 1",
            header.tag,
            other.len()
        ))),
    }
}

fn parse_field<T: FromStr>(field: &str, name: &str) -> Result<T, DecodeError> {
    field
        .trim()
        .parse()
        .map_err(|_| DecodeError::malformed(format!("invalid {} field {:?}", name, field)))
}

/// Parses `x,y,w,h` with the optional `confidence,class_id` the device appends.
pub fn parse_bounding_box(line: &str) -> Result<BoundingBox, DecodeError> {
    let fields: Vec<&str> = line.split(',').collect();
    if !(4..=6).contains(&fields.len()) {
        return Err(DecodeError::malformed(format!(
            "bounding box {:?} has {} fields, expected 4 to 6",
            line,
            fields.len()
        )));
    }
    Ok(BoundingBox {
        x: parse_field(fields[0], "x")?,
        y: parse_field(fields[1], "y")?,
        w: parse_field(fields[2], "w")?,
        h: parse_field(fields[3], "h")?,
        confidence: fields
            .get(4)
            .map(|f| parse_field(f, "confidence"))
            .transpose()?,
        class_id: fields.get(5).map(|f| parse_field(f, "class id")).transpose()?,
    })
}

/// Position of the `-` separating the current and previous halves of a tracked
/// centroid line. A minus sign opening a number is not a separator.
fn track_delimiter(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    (1..bytes.len())
        .find(|&i| bytes[i] == b'-' && (bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.'))
}

fn parse_point(fields: &[&str]) -> Result<CentroidPoint, DecodeError> {
    Ok(CentroidPoint {
        x: parse_field(fields[0], "x")?,
        y: parse_field(fields[1], "y")?,
        count: parse_field(fields[2], "count")?,
    })
}

/// Parses either `x,y,count` or `x,y,count-x_prev,y_prev,count_prev,distSquared`.
pub fn parse_centroid(line: &str) -> Result<Centroid, DecodeError> {
    let (current, previous) = match track_delimiter(line) {
        Some(idx) => (&line[..idx], Some(&line[idx + 1..])),
        None => (line, None),
    };

    let current_fields: Vec<&str> = current.split(',').collect();
    if current_fields.len() != 3 {
        return Err(DecodeError::malformed(format!(
            "centroid {:?} has {} current fields, expected 3",
            line,
            current_fields.len()
        )));
    }
    let current_point = parse_point(&current_fields)?;

    let Some(previous) = previous else {
        return Ok(Centroid::Bare(current_point));
    };
    let previous_fields: Vec<&str> = previous.split(',').collect();
    if previous_fields.len() != 4 {
        return Err(DecodeError::malformed(format!(
            "centroid {:?} has {} previous fields, expected 4",
            line,
            previous_fields.len()
        )));
    }
    Ok(Centroid::Tracked {
        current: current_point,
        previous: parse_point(&previous_fields[..3])?,
        dist_squared: parse_field(previous_fields[3], "distSquared")?,
    })
}

/// Reinterprets little-endian payload bytes as a row-major `(height, width, depth)` array.
pub fn samples_from_bytes(
    bytes: Vec<u8>,
    shape: (usize, usize, usize),
    sample_type: SampleType,
) -> Result<Samples, DecodeError> {
    let (height, width, depth) = shape;
    let count = height
        .checked_mul(width)
        .and_then(|n| n.checked_mul(depth))
        .ok_or_else(|| DecodeError::dimension_mismatch(format!("{:?} overflows", shape)))?;
    if Some(bytes.len()) != count.checked_mul(sample_type.width()) {
        return Err(DecodeError::dimension_mismatch(format!(
            "{} bytes cannot hold {} {:?} samples",
            bytes.len(),
            count,
            sample_type
        )));
    }

    let reshape_err = |e: ndarray::ShapeError| DecodeError::dimension_mismatch(e.to_string());
    match sample_type {
        SampleType::UInt8 => Array3::from_shape_vec(shape, bytes)
            .map(Samples::UInt8)
            .map_err(reshape_err),
        SampleType::Float32 => {
            let mut values = vec![0f32; count];
            LittleEndian::read_f32_into(&bytes, &mut values);
            Array3::from_shape_vec(shape, values)
                .map(Samples::Float32)
                .map_err(reshape_err)
        }
    }
}

fn check_limit(what: &'static str, declared: usize, limit: usize) -> Result<(), DecodeError> {
    if declared > limit {
        Err(DecodeError::LimitExceeded {
            what,
            declared,
            limit,
        })
    } else {
        Ok(())
    }
}

pub struct PayloadDecoder {
    limits: Limits,
    line: Vec<u8>,
}

impl PayloadDecoder {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            line: Vec::new(),
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn decode_image<S: ByteSource + ?Sized>(
        &mut self,
        header: &RawHeader,
        source: &mut S,
    ) -> Result<ImageFrame, DecodeError> {
        let parsed = ImageHeader::from_raw(header)?;
        if parsed.width == 0 || parsed.height == 0 || parsed.depth == 0 {
            return Err(DecodeError::dimension_mismatch(format!(
                "{} declares an empty {}x{}x{} image",
                header.tag, parsed.width, parsed.height, parsed.depth
            )));
        }
        check_limit("width", parsed.width, self.limits.max_width)?;
        check_limit("height", parsed.height, self.limits.max_height)?;
        check_limit("depth", parsed.depth, self.limits.max_depth)?;
        let byte_len = parsed.byte_len().ok_or_else(|| {
            DecodeError::dimension_mismatch(format!("{} payload size overflows", header.tag))
        })?;
        check_limit("payload size", byte_len, self.limits.max_payload_bytes)?;

        trace!("Reading {} byte payload for {}", byte_len, header.tag);
        let bytes = self.read_payload(source, byte_len)?;
        let samples = samples_from_bytes(
            bytes,
            (parsed.height, parsed.width, parsed.depth),
            parsed.sample_type,
        )?;

        Ok(ImageFrame {
            title: header.tag.image_title().unwrap_or_default().to_string(),
            width: parsed.width,
            height: parsed.height,
            depth: parsed.depth,
            samples,
            meta: parsed.meta,
        })
    }

    pub fn decode_bounding_boxes<S: ByteSource + ?Sized>(
        &mut self,
        header: &RawHeader,
        source: &mut S,
    ) -> Result<Vec<BoundingBox>, DecodeError> {
        let count = self.expect_count(header, HeaderTag::BoundingBoxes)?;
        check_limit("bounding box count", count, self.limits.max_bboxes)?;

        let mut bboxes = Vec::with_capacity(count);
        for received in 0..count {
            let line = self.read_payload_line(source, count, received)?;
            bboxes.push(parse_bounding_box(&line)?);
        }
        Ok(bboxes)
    }

    pub fn decode_centroids<S: ByteSource + ?Sized>(
        &mut self,
        header: &RawHeader,
        source: &mut S,
    ) -> Result<Vec<Centroid>, DecodeError> {
        let count = self.expect_count(header, HeaderTag::Centroids)?;
        check_limit("centroid count", count, self.limits.max_centroids)?;

        let mut centroids = Vec::with_capacity(count);
        for received in 0..count {
            let line = self.read_payload_line(source, count, received)?;
            centroids.push(parse_centroid(&line)?);
        }
        Ok(centroids)
    }

    fn expect_count(&self, header: &RawHeader, tag: HeaderTag) -> Result<usize, DecodeError> {
        if header.tag != tag {
            return Err(DecodeError::malformed(format!(
                "expected a {} header, got {}",
                tag, header.tag
            )));
        }
        parse_count(header)
    }

    fn stalled(&self, last_progress: Instant) -> bool {
        self.limits
            .payload_stall_timeout()
            .map_or(false, |timeout| last_progress.elapsed() >= timeout)
    }

    /// Accumulates exactly `len` bytes, however the source fragments them.
    fn read_payload<S: ByteSource + ?Sized>(
        &self,
        source: &mut S,
        len: usize,
    ) -> Result<Vec<u8>, DecodeError> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        let mut last_progress = Instant::now();
        while filled < len {
            match source.read_some(&mut buf[filled..]) {
                Ok(0) => {
                    if self.stalled(last_progress) {
                        warn!("Payload stalled after {} of {} bytes", filled, len);
                        return Err(DecodeError::truncated(len, filled));
                    }
                }
                Ok(n) => {
                    filled += n;
                    last_progress = Instant::now();
                }
                Err(SourceError::Cancelled) => return Err(DecodeError::Cancelled),
                Err(SourceError::Closed) => return Err(DecodeError::truncated(len, filled)),
                Err(SourceError::Io(e)) => {
                    warn!("Source failed after {} of {} bytes: {}", filled, len, e);
                    return Err(DecodeError::truncated(len, filled));
                }
            }
        }
        Ok(buf)
    }

    fn read_payload_line<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
        expected: usize,
        received: usize,
    ) -> Result<String, DecodeError> {
        let last_progress = Instant::now();
        loop {
            match source.read_line(&mut self.line) {
                Ok(0) => {
                    if self.stalled(last_progress) {
                        warn!("Payload stalled after {} of {} lines", received, expected);
                        return Err(DecodeError::truncated_lines(expected, received));
                    }
                }
                Ok(_) => break,
                Err(SourceError::Cancelled) => return Err(DecodeError::Cancelled),
                Err(SourceError::Closed) => {
                    return Err(DecodeError::truncated_lines(expected, received))
                }
                Err(SourceError::Io(e)) => {
                    warn!("Source failed after {} of {} lines: {}", received, expected, e);
                    return Err(DecodeError::truncated_lines(expected, received));
                }
            }
        }

        let text = std::str::from_utf8(&self.line).map_err(|_| {
            DecodeError::malformed(format!("payload line {} is not valid UTF-8", received + 1))
        })?;
        trace!("Payload line: {}", text.trim_end());
        Ok(text.trim_end().to_string())
    }
}
