use std::path::Path;

/// Container formats this crate can decode and redact.
///
/// Detection is by magic bytes only. Anything else is reported as unrecognized;
/// the file extension is never used to guess.
///
/// # Example
///
/// ```rust
/// use scorpion::format::ImageFormat;
///
/// assert_eq!(ImageFormat::detect(b"GIF89a......."), Some(ImageFormat::Gif));
/// assert_eq!(ImageFormat::detect(b"\xFF\xD8\xFF\xE0"), Some(ImageFormat::Jpeg));
/// assert_eq!(ImageFormat::detect(b"RIFF"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Bmp,
    Gif,
    Png,
    Jpeg,
}

/// Magic bytes for format detection.
mod magic {
    pub const BMP: &[u8] = b"BM";
    pub const GIF87A: &[u8] = b"GIF87a";
    pub const GIF89A: &[u8] = b"GIF89a";
    pub const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    pub const JPEG: &[u8] = &[0xFF, 0xD8];
}

pub use magic::PNG as PNG_SIGNATURE;

impl ImageFormat {
    /// Detect the format from the leading bytes of a buffer.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(magic::PNG) {
            Some(Self::Png)
        } else if data.starts_with(magic::GIF87A) || data.starts_with(magic::GIF89A) {
            Some(Self::Gif)
        } else if data.starts_with(magic::JPEG) {
            Some(Self::Jpeg)
        } else if data.starts_with(magic::BMP) {
            Some(Self::Bmp)
        } else {
            None
        }
    }

    /// Short label for display.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bmp => "BMP",
            Self::Gif => "GIF",
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
        }
    }

    /// File extensions associated with the format (lowercase, no dot).
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Bmp => &["bmp"],
            Self::Gif => &["gif"],
            Self::Png => &["png"],
            Self::Jpeg => &["jpg", "jpeg"],
        }
    }

    /// Suffix appended to the file stem when writing a cleaned copy.
    ///
    /// JPEG and BMP use `_clear`, GIF and PNG use `clear` with no separator.
    /// Existing tooling depends on both spellings.
    pub fn clear_suffix(self) -> &'static str {
        match self {
            Self::Jpeg | Self::Bmp => "_clear",
            Self::Gif | Self::Png => "clear",
        }
    }

    /// Guess from a path's extension. Used only to filter directory walks.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        [Self::Bmp, Self::Gif, Self::Png, Self::Jpeg]
            .into_iter()
            .find(|f| f.extensions().contains(&ext.as_str()))
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_each_signature() {
        assert_eq!(ImageFormat::detect(b"BM\0\0"), Some(ImageFormat::Bmp));
        assert_eq!(ImageFormat::detect(b"GIF87a"), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::detect(b"GIF89a"), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::detect(PNG_SIGNATURE), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8]), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn detect_fails_closed() {
        assert_eq!(ImageFormat::detect(b""), None);
        assert_eq!(ImageFormat::detect(b"B"), None);
        assert_eq!(ImageFormat::detect(b"GIF88a"), None);
        assert_eq!(ImageFormat::detect(&PNG_SIGNATURE[..7]), None);
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD9]), None);
        assert_eq!(ImageFormat::detect(b"II*\0"), None);
    }

    #[test]
    fn from_extension_is_case_insensitive() {
        assert_eq!(ImageFormat::from_extension(Path::new("a.JPEG")), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension(Path::new("a.bmp")), Some(ImageFormat::Bmp));
        assert_eq!(ImageFormat::from_extension(Path::new("a.webp")), None);
        assert_eq!(ImageFormat::from_extension(Path::new("noext")), None);
    }

    #[test]
    fn clear_suffixes() {
        assert_eq!(ImageFormat::Jpeg.clear_suffix(), "_clear");
        assert_eq!(ImageFormat::Bmp.clear_suffix(), "_clear");
        assert_eq!(ImageFormat::Gif.clear_suffix(), "clear");
        assert_eq!(ImageFormat::Png.clear_suffix(), "clear");
    }
}
