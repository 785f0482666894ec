use std::fmt;

use crate::format::ImageFormat;
use crate::gps::GpsCoordinates;
use crate::tags::TagDictionary;

/// Pixel dimensions as declared by the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn megapixels(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height) / 1_000_000.0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Result of decoding one file for display.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub format: ImageFormat,
    pub tags: TagDictionary,
    pub dimensions: Option<Dimensions>,
    /// The structural walk stopped early; `tags` holds what came before.
    pub truncated: bool,
}

impl Metadata {
    pub fn new(format: ImageFormat) -> Self {
        Self {
            format,
            tags: TagDictionary::new(),
            dimensions: None,
            truncated: false,
        }
    }

    /// Decimal GPS position, when all four EXIF GPS tags are present and valid.
    pub fn gps(&self) -> Option<GpsCoordinates> {
        GpsCoordinates::from_tags(&self.tags)
    }

    /// One-line description, e.g. `JPEG 640x480, 23 tags`.
    pub fn summary(&self) -> String {
        let mut s = self.format.name().to_string();
        if let Some(dims) = self.dimensions {
            s.push_str(&format!(" {dims}"));
        }
        s.push_str(&format!(", {} tags", self.tags.len()));
        if self.truncated {
            s.push_str(" (truncated)");
        }
        s
    }
}

/// Result of stripping metadata from one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    /// The cleaned file.
    pub data: Vec<u8>,
    /// Metadata bytes removed.
    pub removed: usize,
}

impl Redaction {
    /// Build a redaction whose removed count is the size difference.
    pub(crate) fn from_sizes(original_len: usize, data: Vec<u8>) -> Self {
        let removed = original_len.saturating_sub(data.len());
        Self { data, removed }
    }
}
