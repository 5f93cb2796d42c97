//! Recognizes header lines in the device stream.
//!
//! Everything the device prints that is not a well-formed header (boot banners,
//! debug output, half a header cut off by a reset) is advisory text: it is logged
//! under the `device` target and never disturbs framing.

use super::decoder::{parse_count, ImageHeader};
use crate::error::ScanError;
use crate::source::ByteSource;
use crate::logging::DEVICE_TARGET;
use log::{debug, info, trace};
use std::fmt;

pub const IMAGE_PREFIX: &str = "image:";
pub const BBOXES_PREFIX: &str = "bboxes:";
pub const CENTROIDS_PREFIX: &str = "centroids:";

pub const IMAGE_TITLE: &str = "image";
pub const HEATMAP_TITLE: &str = "heatmap";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderTag {
    Image,
    Heatmap,
    /// An image header with a title that does not fill a slot.
    OtherImage(String),
    BoundingBoxes,
    Centroids,
}

impl HeaderTag {
    fn for_title(title: &str) -> Self {
        match title {
            IMAGE_TITLE => HeaderTag::Image,
            HEATMAP_TITLE => HeaderTag::Heatmap,
            other => HeaderTag::OtherImage(other.to_string()),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(
            self,
            HeaderTag::Image | HeaderTag::Heatmap | HeaderTag::OtherImage(_)
        )
    }

    pub fn image_title(&self) -> Option<&str> {
        match self {
            HeaderTag::Image => Some(IMAGE_TITLE),
            HeaderTag::Heatmap => Some(HEATMAP_TITLE),
            HeaderTag::OtherImage(title) => Some(title),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderTag::BoundingBoxes => write!(f, "bboxes"),
            HeaderTag::Centroids => write!(f, "centroids"),
            image => write!(f, "{}{}", IMAGE_PREFIX, image.image_title().unwrap_or_default()),
        }
    }
}

/// A header line split into its tag and the comma-separated fields after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    pub tag: HeaderTag,
    pub fields: Vec<String>,
}

impl RawHeader {
    pub fn new(tag: HeaderTag, fields: Vec<String>) -> Self {
        Self { tag, fields }
    }

    /// Splits a header line without checking its fields.
    pub fn split(line: &str) -> Option<Self> {
        if let Some(rest) = line.strip_prefix(IMAGE_PREFIX) {
            let mut parts = rest.split(',');
            let title = parts.next().filter(|t| !t.is_empty())?;
            return Some(Self::new(
                HeaderTag::for_title(title),
                parts.map(str::to_string).collect(),
            ));
        }
        if let Some(rest) = line.strip_prefix(BBOXES_PREFIX) {
            return Some(Self::new(HeaderTag::BoundingBoxes, vec![rest.to_string()]));
        }
        if let Some(rest) = line.strip_prefix(CENTROIDS_PREFIX) {
            return Some(Self::new(HeaderTag::Centroids, vec![rest.to_string()]));
        }
        None
    }

    /// Parses a line into a header only if it has the full shape of one.
    pub fn parse(line: &str) -> Option<Self> {
        let header = Self::split(line)?;
        if header.has_valid_shape() {
            Some(header)
        } else {
            None
        }
    }

    fn has_valid_shape(&self) -> bool {
        match self.tag {
            HeaderTag::BoundingBoxes | HeaderTag::Centroids => {
                self.fields.len() == 1 && parse_count(self).is_ok()
            }
            _ => ImageHeader::from_raw(self).is_ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub headers: u64,
    pub advisory_lines: u64,
    pub resyncs: u64,
}

#[derive(Default)]
pub struct FrameScanner {
    line: Vec<u8>,
    stats: ScanStats,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Reads one line and returns the header it carries.
    ///
    /// `NoData` covers timeouts, blank lines and advisory text; `Resync` means an
    /// undecodable line was thrown away. Both are retried by the caller.
    pub fn next_header<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<RawHeader, ScanError> {
        if source.read_line(&mut self.line)? == 0 {
            return Err(ScanError::NoData);
        }

        let text = match std::str::from_utf8(&self.line) {
            Ok(text) => text.trim_end(),
            Err(_) => {
                trace!("Discarding {} undecodable bytes", self.line.len());
                self.stats.resyncs += 1;
                return Err(ScanError::Resync);
            }
        };
        if text.is_empty() {
            return Err(ScanError::NoData);
        }

        match RawHeader::parse(text) {
            Some(header) => {
                debug!("Header: {}", text);
                self.stats.headers += 1;
                Ok(header)
            }
            None => {
                info!(target: DEVICE_TARGET, "{}", text);
                self.stats.advisory_lines += 1;
                Err(ScanError::NoData)
            }
        }
    }
}
