//! # scorpion
//!
//! Metadata extraction and stripping for JPEG, PNG, GIF and BMP files.
//!
//! Every decoder works on an in-memory buffer, never panics on malformed or
//! truncated input, and returns whatever tags it found before the structure
//! broke. Every redactor produces a new buffer that starts with the format's
//! signature and ends with its terminator.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scorpion::config::Config;
//! use scorpion::pipeline::{collect_images, inspect_file, clear_file};
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("scorpion.json".as_ref()))?;
//!     let images = collect_images(&[PathBuf::from("./photos")]);
//!
//!     for path in &images {
//!         let meta = inspect_file(path, &config)?;
//!         println!("{}: {}", path.display(), meta.summary());
//!         for (name, value) in meta.tags.iter() {
//!             println!("  [{name}]: {value}");
//!         }
//!
//!         let outcome = clear_file(path, &config)?;
//!         println!("  cleaned copy: {} ({} bytes removed)", outcome.output_path.display(), outcome.removed);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! ```rust
//! let data = std::fs::read("photo.jpg").unwrap_or_default();
//! match scorpion::decode(&data) {
//!     Ok(meta) => {
//!         if let Some(gps) = meta.gps() {
//!             println!("taken at {gps}: {}", gps.map_link());
//!         }
//!     }
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Decoded | Kept on redaction |
//! |--------|---------|-------------------|
//! | JPEG | EXIF (IFD0, Exif, GPS, Interop), XMP, IPTC, COM, JFIF, SOFn, ICC | everything but APPn and COM |
//! | PNG | IHDR, ancillary chunks, text chunks, XMP, ICC, eXIf | IHDR, IDAT, IEND |
//! | GIF | screen descriptor, extensions, timing | header, images, timing, NETSCAPE loop, plain text |
//! | BMP | file header, every DIB header version | rebuilt 54-byte header, palette, pixels |
//!
//! ## Modules
//!
//! - [`bmp`], [`gif`], [`png`], [`jpeg`]: one structural walker per format, shared
//!   by its decode and redact passes
//! - [`exif`], [`iptc`], [`xmp`], [`icc`]: embedded metadata blocks
//! - [`tags`], [`metadata`]: the decoded data model
//! - [`pipeline`]: file-level inspect and clean, batch processing
//! - [`config`]: configuration types and loading/saving

pub mod bmp;
pub mod config;
pub mod cursor;
pub mod error;
pub mod exif;
pub mod format;
pub mod gif;
pub mod gps;
pub mod icc;
pub mod inflate;
pub mod iptc;
pub mod jpeg;
pub mod metadata;
pub mod pipeline;
pub mod png;
pub mod tags;
pub mod xmp;

pub use config::{Config, DecodeOptions};
pub use error::{Error, Result};
pub use format::ImageFormat;
pub use gps::GpsCoordinates;
pub use metadata::{Dimensions, Metadata, Redaction};
pub use tags::{TagDictionary, TagKey, TagValue};

/// Detect the format and decode with default limits.
pub fn decode(data: &[u8]) -> Result<Metadata> {
    decode_with(data, &DecodeOptions::default())
}

/// Detect the format and decode.
pub fn decode_with(data: &[u8], options: &DecodeOptions) -> Result<Metadata> {
    match ImageFormat::detect(data) {
        Some(ImageFormat::Bmp) => bmp::decode(data, options),
        Some(ImageFormat::Gif) => gif::decode(data, options),
        Some(ImageFormat::Png) => png::decode(data, options),
        Some(ImageFormat::Jpeg) => jpeg::decode(data, options),
        None => Err(Error::UnrecognizedFormat),
    }
}

/// Detect the format and strip its metadata.
pub fn redact(data: &[u8]) -> Result<Redaction> {
    match ImageFormat::detect(data) {
        Some(ImageFormat::Bmp) => bmp::redact(data),
        Some(ImageFormat::Gif) => gif::redact(data),
        Some(ImageFormat::Png) => png::redact(data),
        Some(ImageFormat::Jpeg) => jpeg::redact(data),
        None => Err(Error::UnrecognizedFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_by_signature() {
        let gif = gif::fixture::header(3, 4);
        assert_eq!(decode(&gif).unwrap().format, ImageFormat::Gif);

        let bmp = bmp::sample(2, 2, 24, &[0; 16]);
        assert_eq!(decode(&bmp).unwrap().format, ImageFormat::Bmp);

        let png = png::fixture::png(&[png::fixture::ihdr(1, 1, 8, 0), png::fixture::chunk(b"IEND", &[])]);
        assert_eq!(decode(&png).unwrap().format, ImageFormat::Png);

        let jpeg = jpeg::fixture::jpeg(&[jpeg::fixture::sof0(5, 6), jpeg::fixture::scan(&[0])]);
        assert_eq!(decode(&jpeg).unwrap().format, ImageFormat::Jpeg);
    }

    #[test]
    fn unknown_formats_fail_closed() {
        for data in [&b""[..], b"RIFF....WEBP", b"II*\0", b"\x89PN"] {
            assert!(matches!(decode(data), Err(Error::UnrecognizedFormat)));
            assert!(matches!(redact(data), Err(Error::UnrecognizedFormat)));
        }
    }
}
