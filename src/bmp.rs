//! BMP decoder and header-rebuilding redactor.
//!
//! Layout:
//! - File header (14 bytes): `BM`, file size, two reserved words, pixel data offset
//! - DIB header, variable size, selected by its leading size field
//! - Optional colour table (indexed images)
//! - Pixel data
//!
//! Redaction does not strip in place. It writes a fresh 54-byte header
//! (BITMAPINFOHEADER), the colour table of indexed images, and the original
//! pixel bytes.

use crate::config::DecodeOptions;
use crate::cursor::Endian;
use crate::error::{Error, Result};
use crate::format::ImageFormat;
use crate::metadata::{Dimensions, Metadata, Redaction};
use crate::tags::{TagDictionary, TagValue, Unit};

const SIGNATURE: &[u8] = b"BM";
pub const FILE_HEADER_LEN: usize = 14;
const INFO_HEADER_LEN: u32 = 40;
/// File header plus a 40-byte DIB header.
pub const MINIMAL_HEADER_LEN: usize = FILE_HEADER_LEN + INFO_HEADER_LEN as usize;

const LE: Endian = Endian::Little;

const COMPRESSION_RGB: u32 = 0;
const COMPRESSION_RLE8: u32 = 1;
const COMPRESSION_RLE4: u32 = 2;
const COMPRESSION_BITFIELDS: u32 = 3;
const MASKS_LEN: usize = 12;

/// V5 `CSType` values whose profile (or profile path) lives in the file.
const PROFILE_EMBEDDED: u32 = u32::from_be_bytes(*b"MBED");
const PROFILE_LINKED: u32 = u32::from_be_bytes(*b"LINK");

/// DIB header variants, by size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DibKind {
    Core,
    Info,
    V2,
    V3,
    Os2V2,
    V4,
    V5,
}

impl DibKind {
    pub fn from_size(size: u32) -> Option<Self> {
        Some(match size {
            12 => Self::Core,
            40 => Self::Info,
            52 => Self::V2,
            56 => Self::V3,
            64 => Self::Os2V2,
            108 => Self::V4,
            124 => Self::V5,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Core => "BITMAPCOREHEADER",
            Self::Info => "BITMAPINFOHEADER",
            Self::V2 => "BITMAPV2INFOHEADER",
            Self::V3 => "BITMAPV3INFOHEADER",
            Self::Os2V2 => "OS22XBITMAPHEADER",
            Self::V4 => "BITMAPV4HEADER",
            Self::V5 => "BITMAPV5HEADER",
        }
    }
}

fn compression_name(compression: u32) -> String {
    match compression {
        0 => "None".into(),
        1 => "8bit RLE".into(),
        2 => "4bit RLE".into(),
        3 => "Bitfields".into(),
        4 => "JPEG".into(),
        5 => "PNG".into(),
        n => format!("Unknown({n})"),
    }
}

/// Fields past the 40-byte header: minimum DIB size, offset in the DIB,
/// name, shown as hex.
const EXTENDED_FIELDS: &[(u32, usize, &str, bool)] = &[
    (52, 40, "RedMask", true),
    (52, 44, "GreenMask", true),
    (52, 48, "BlueMask", true),
    (56, 52, "AlphaMask", true),
    (108, 56, "CSType", true),
    (108, 96, "GammaRed", false),
    (108, 100, "GammaGreen", false),
    (108, 104, "GammaBlue", false),
    (124, 108, "Intent", true),
    (124, 112, "ProfileData", false),
    (124, 116, "ProfileSize", false),
    (124, 120, "Reserved", true),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub file_size: u32,
    pub reserved1: u16,
    pub reserved2: u16,
    pub data_offset: u32,
}

/// Geometry and colour fields shared by every header that has them.
/// A core header only fills the first four.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfoHeader {
    pub width: i32,
    /// Negative for top-down bitmaps.
    pub height: i32,
    pub planes: u16,
    pub bits_per_pixel: u16,
    pub compression: u32,
    pub image_size: u32,
    pub x_pixels_per_meter: i32,
    pub y_pixels_per_meter: i32,
    pub colors_used: u32,
    pub colors_important: u32,
}

/// Structural view of a BMP buffer.
#[derive(Debug, Clone)]
pub struct Bitmap<'a> {
    pub file: Option<FileHeader>,
    pub dib_size: Option<u32>,
    pub kind: Option<DibKind>,
    pub info: Option<InfoHeader>,
    /// DIB header bytes, size field included, clipped to the buffer.
    dib: &'a [u8],
    pub truncated: bool,
}

/// Walk the fixed headers. Fails only on a signature mismatch.
pub fn parse(data: &[u8]) -> Result<Bitmap<'_>> {
    if !data.starts_with(SIGNATURE) {
        return Err(Error::UnrecognizedFormat);
    }
    let mut bmp = Bitmap {
        file: None,
        dib_size: None,
        kind: None,
        info: None,
        dib: &[],
        truncated: true,
    };

    let (Some(file_size), Some(reserved1), Some(reserved2), Some(data_offset)) = (
        LE.read_u32(data, 2),
        LE.read_u16(data, 6),
        LE.read_u16(data, 8),
        LE.read_u32(data, 10),
    ) else {
        log::debug!("BMP file header truncated at {} bytes", data.len());
        return Ok(bmp);
    };
    bmp.file = Some(FileHeader { file_size, reserved1, reserved2, data_offset });

    let Some(dib_size) = LE.read_u32(data, FILE_HEADER_LEN) else {
        return Ok(bmp);
    };
    bmp.dib_size = Some(dib_size);
    bmp.kind = DibKind::from_size(dib_size);

    let dib_end = FILE_HEADER_LEN.saturating_add(dib_size as usize);
    bmp.dib = &data[FILE_HEADER_LEN..dib_end.min(data.len())];
    bmp.truncated = dib_end > data.len();
    if bmp.truncated {
        log::debug!("BMP DIB header of {dib_size} bytes runs past end of file");
        return Ok(bmp);
    }

    let dib = bmp.dib;
    bmp.info = match bmp.kind {
        Some(DibKind::Core) => Some(InfoHeader {
            width: i32::from(LE.read_u16(dib, 4).unwrap_or(0)),
            height: i32::from(LE.read_u16(dib, 6).unwrap_or(0)),
            planes: LE.read_u16(dib, 8).unwrap_or(0),
            bits_per_pixel: LE.read_u16(dib, 10).unwrap_or(0),
            ..InfoHeader::default()
        }),
        Some(DibKind::Os2V2) | None => None,
        Some(_) => {
            let u32_at = |off| LE.read_u32(dib, off).unwrap_or(0);
            Some(InfoHeader {
                width: u32_at(4) as i32,
                height: u32_at(8) as i32,
                planes: LE.read_u16(dib, 12).unwrap_or(0),
                bits_per_pixel: LE.read_u16(dib, 14).unwrap_or(0),
                compression: u32_at(16),
                image_size: u32_at(20),
                x_pixels_per_meter: u32_at(24) as i32,
                y_pixels_per_meter: u32_at(28) as i32,
                colors_used: u32_at(32),
                colors_important: u32_at(36),
            })
        }
    };
    Ok(bmp)
}

impl Bitmap<'_> {
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.info.map(|info| Dimensions {
            width: info.width.unsigned_abs(),
            height: info.height.unsigned_abs(),
        })
    }

    fn dib_u32(&self, offset: usize) -> Option<u32> {
        LE.read_u32(self.dib, offset)
    }

    fn tags(&self, tags: &mut TagDictionary) {
        tags.insert("Signature", TagValue::text("BM"));
        let Some(file) = self.file else {
            return;
        };
        tags.insert("FileSize", TagValue::Measure(u64::from(file.file_size), Unit::Bytes));
        tags.insert("Reserved1", TagValue::Hex { value: u64::from(file.reserved1), width: 4 });
        tags.insert("Reserved2", TagValue::Hex { value: u64::from(file.reserved2), width: 4 });
        tags.insert("DataOffset", TagValue::Hex { value: u64::from(file.data_offset), width: 0 });

        let Some(size) = self.dib_size else {
            return;
        };
        let name = self.kind.map_or("unknown", DibKind::name);
        tags.insert("DIBHeaderSize", TagValue::Text(format!("{size} bytes ({name})")));

        let Some(info) = self.info else {
            return;
        };
        tags.insert("Width", TagValue::Measure(u64::from(info.width.unsigned_abs()), Unit::Pixels));
        tags.insert("Height", TagValue::Measure(u64::from(info.height.unsigned_abs()), Unit::Pixels));
        tags.insert("Planes", TagValue::Int(i64::from(info.planes)));
        tags.insert("BitsPerPixel", TagValue::Measure(u64::from(info.bits_per_pixel), Unit::BitsPerPixel));
        if size < INFO_HEADER_LEN {
            return;
        }

        tags.insert("Compression", TagValue::Text(compression_name(info.compression)));
        tags.insert("CompressionRaw", TagValue::Hex { value: u64::from(info.compression), width: 0 });
        tags.insert("ImageSize", TagValue::Measure(u64::from(info.image_size), Unit::Bytes));
        tags.insert("XPixelsPerMeter", TagValue::Int(i64::from(info.x_pixels_per_meter)));
        tags.insert("YPixelsPerMeter", TagValue::Int(i64::from(info.y_pixels_per_meter)));
        tags.insert("ColorsUsed", TagValue::Int(i64::from(info.colors_used)));
        tags.insert("ColorsImportant", TagValue::Int(i64::from(info.colors_important)));

        for &(min_size, offset, name, hex) in EXTENDED_FIELDS {
            if size < min_size || self.kind == Some(DibKind::Os2V2) {
                continue;
            }
            if let Some(v) = self.dib_u32(offset) {
                let value = if hex {
                    TagValue::Hex { value: u64::from(v), width: 8 }
                } else {
                    TagValue::Int(i64::from(v))
                };
                tags.insert(name, value);
            }
        }
        if size >= 108 {
            tags.insert("Endpoints", TagValue::Bytes(36));
        }
    }
}

/// Decode the file and DIB headers.
pub fn decode(data: &[u8], _options: &DecodeOptions) -> Result<Metadata> {
    let bmp = parse(data)?;
    let mut meta = Metadata::new(ImageFormat::Bmp);
    bmp.tags(&mut meta.tags);
    meta.dimensions = bmp.dimensions();
    meta.truncated = bmp.truncated;
    Ok(meta)
}

/// Rebuild the file with a minimal header.
///
/// Indexed images (8 bpp or less) keep their colour table, widened to 4-byte
/// entries when the source used a core header. Bitfield images keep their
/// three RGB masks in the same slot. Only the pixel array itself is copied:
/// anything between the DIB header and the pixels, and anything after them
/// (an embedded or linked colour profile included), is dropped.
pub fn redact(data: &[u8]) -> Result<Redaction> {
    let bmp = parse(data)?;
    let file = bmp.file.ok_or_else(|| Error::truncated("BMP file header", data.len()))?;
    let dib_size = bmp.dib_size.ok_or_else(|| Error::truncated("DIB header", FILE_HEADER_LEN))?;
    let kind = match bmp.kind {
        Some(DibKind::Os2V2) | None => {
            return Err(Error::UnsupportedVariant(format!("DIB header size {dib_size}")));
        }
        Some(kind) => kind,
    };
    let info = bmp.info.ok_or_else(|| Error::truncated("DIB header", FILE_HEADER_LEN))?;

    let data_offset = file.data_offset as usize;
    if data_offset > data.len() {
        return Err(Error::truncated("BMP pixel data", data_offset));
    }
    let color_table = match info.compression {
        COMPRESSION_RGB | COMPRESSION_RLE8 | COMPRESSION_RLE4 => {
            carry_palette(data, kind, dib_size as usize, data_offset, &info)
        }
        COMPRESSION_BITFIELDS => carry_masks(data)?,
        other => {
            return Err(Error::UnsupportedVariant(format!("BMP compression {}", compression_name(other))));
        }
    };
    let pixel_len = bmp.pixel_len(&info, data_offset, data.len());
    let pixels = &data[data_offset..data_offset + pixel_len];
    if data_offset + pixel_len < data.len() {
        log::debug!("dropping {} bytes after the BMP pixel array", data.len() - data_offset - pixel_len);
    }

    let table_len = color_table.len() as u32;
    let colors_used = if info.compression == COMPRESSION_BITFIELDS { 0 } else { table_len / 4 };
    let mut out = Vec::with_capacity(MINIMAL_HEADER_LEN + color_table.len() + pixels.len());
    out.extend_from_slice(SIGNATURE);
    out.extend_from_slice(&((MINIMAL_HEADER_LEN + color_table.len() + pixels.len()) as u32).to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&(MINIMAL_HEADER_LEN as u32 + table_len).to_le_bytes());
    out.extend_from_slice(&INFO_HEADER_LEN.to_le_bytes());
    out.extend_from_slice(&info.width.to_le_bytes());
    out.extend_from_slice(&info.height.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&info.bits_per_pixel.to_le_bytes());
    out.extend_from_slice(&info.compression.to_le_bytes());
    out.extend_from_slice(&(pixels.len() as u32).to_le_bytes());
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&colors_used.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&color_table);
    out.extend_from_slice(pixels);

    Ok(Redaction::from_sizes(data.len(), out))
}

impl Bitmap<'_> {
    /// Length of the pixel array at `data_offset`, clipped to the buffer and
    /// to a colour profile stored after the pixels.
    fn pixel_len(&self, info: &InfoHeader, data_offset: usize, total: usize) -> usize {
        let available = total - data_offset;
        let declared = match info.compression {
            COMPRESSION_RLE8 | COMPRESSION_RLE4 => (info.image_size != 0).then_some(info.image_size as usize),
            _ => row_stride(info.width, info.bits_per_pixel)
                .and_then(|stride| stride.checked_mul(info.height.unsigned_abs() as usize)),
        };
        let mut len = declared.map_or(available, |d| d.min(available));
        if let Some(profile) = self.profile_offset() {
            if profile > data_offset {
                len = len.min(profile - data_offset);
            }
        }
        len
    }

    /// File offset of an embedded or linked V5 colour profile.
    fn profile_offset(&self) -> Option<usize> {
        if self.kind != Some(DibKind::V5) {
            return None;
        }
        match self.dib_u32(56)? {
            PROFILE_EMBEDDED | PROFILE_LINKED => {
                FILE_HEADER_LEN.checked_add(self.dib_u32(112)? as usize)
            }
            _ => None,
        }
    }
}

/// Bytes per pixel row, padded to 4 bytes.
fn row_stride(width: i32, bits_per_pixel: u16) -> Option<usize> {
    let bits = (width.unsigned_abs() as usize).checked_mul(usize::from(bits_per_pixel))?;
    Some(bits.checked_add(31)? / 32 * 4)
}

/// Red, green and blue masks. They follow a 40-byte header and sit at the
/// same file offset inside larger headers.
fn carry_masks(data: &[u8]) -> Result<Vec<u8>> {
    let start = MINIMAL_HEADER_LEN;
    data.get(start..start + MASKS_LEN)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| Error::truncated("BMP colour masks", start))
}

/// Colour table as RGBQUAD entries, or empty for direct-colour images.
fn carry_palette(data: &[u8], kind: DibKind, dib_size: usize, data_offset: usize, info: &InfoHeader) -> Vec<u8> {
    if info.bits_per_pixel == 0 || info.bits_per_pixel > 8 {
        return Vec::new();
    }
    let entry_len = if kind == DibKind::Core { 3 } else { 4 };
    let declared = match info.colors_used {
        0 => 1usize << info.bits_per_pixel,
        n => n as usize,
    };
    let start = FILE_HEADER_LEN + dib_size;
    let available = data_offset.saturating_sub(start) / entry_len;
    let count = declared.min(available).min(256);

    let mut palette = Vec::with_capacity(count * 4);
    for entry in data[start..].chunks_exact(entry_len).take(count) {
        palette.extend_from_slice(&entry[..3]);
        palette.push(0);
    }
    palette
}

#[cfg(test)]
pub(crate) fn sample(width: i32, height: i32, bpp: u16, pixels: &[u8]) -> Vec<u8> {
    let mut out = b"BM".to_vec();
    out.extend_from_slice(&((54 + pixels.len()) as u32).to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&54u32.to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&bpp.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(pixels.len() as u32).to_le_bytes());
    out.extend_from_slice(&2835u32.to_le_bytes());
    out.extend_from_slice(&2835u32.to_le_bytes());
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(pixels);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_tags(data: &[u8]) -> Metadata {
        decode(data, &DecodeOptions::default()).unwrap()
    }

    // ── Decode ──

    #[test]
    fn info_header_tags() {
        let meta = decode_tags(&sample(2, 2, 24, &[0xAB; 12]));
        let tags = &meta.tags;
        assert_eq!(tags.get_string("Width").as_deref(), Some("2 px"));
        assert_eq!(tags.get_string("Height").as_deref(), Some("2 px"));
        assert_eq!(tags.get_string("BitsPerPixel").as_deref(), Some("24 bpp"));
        assert_eq!(tags.get_string("DIBHeaderSize").as_deref(), Some("40 bytes (BITMAPINFOHEADER)"));
        assert_eq!(tags.get_string("DataOffset").as_deref(), Some("0x36"));
        assert_eq!(tags.get_string("Compression").as_deref(), Some("None"));
        assert_eq!(tags.get_string("XPixelsPerMeter").as_deref(), Some("2835"));
        assert!(!tags.contains("RedMask"));
        assert_eq!(meta.dimensions, Some(Dimensions { width: 2, height: 2 }));
        assert!(!meta.truncated);
    }

    #[test]
    fn top_down_height_is_positive() {
        let meta = decode_tags(&sample(3, -5, 32, &[0; 60]));
        assert_eq!(meta.tags.get_string("Height").as_deref(), Some("5 px"));
    }

    #[test]
    fn v5_header_fields() {
        let mut data = sample(1, 1, 32, &[]);
        data[14..18].copy_from_slice(&124u32.to_le_bytes());
        data.resize(14 + 124, 0);
        data[14 + 40..14 + 44].copy_from_slice(&0x00FF_0000u32.to_le_bytes());
        data[14 + 108..14 + 112].copy_from_slice(&4u32.to_le_bytes());
        let meta = decode_tags(&data);
        assert_eq!(meta.tags.get_string("DIBHeaderSize").as_deref(), Some("124 bytes (BITMAPV5HEADER)"));
        assert_eq!(meta.tags.get_string("RedMask").as_deref(), Some("0x00ff0000"));
        assert_eq!(meta.tags.get_string("Intent").as_deref(), Some("0x00000004"));
        assert_eq!(meta.tags.get_string("Endpoints").as_deref(), Some("data:36 bytes"));
    }

    #[test]
    fn unknown_dib_size_has_no_geometry() {
        let mut data = sample(2, 2, 24, &[0; 12]);
        data[14..18].copy_from_slice(&20u32.to_le_bytes());
        let meta = decode_tags(&data);
        assert_eq!(meta.tags.get_string("DIBHeaderSize").as_deref(), Some("20 bytes (unknown)"));
        assert!(!meta.tags.contains("Width"));
        assert_eq!(meta.dimensions, None);
    }

    #[test]
    fn truncated_dib_keeps_file_header() {
        let data = sample(2, 2, 24, &[]);
        let meta = decode_tags(&data[..30]);
        assert!(meta.truncated);
        assert!(meta.tags.contains("FileSize"));
        assert!(!meta.tags.contains("Width"));
    }

    #[test]
    fn wrong_signature() {
        assert!(matches!(decode(b"MB....", &DecodeOptions::default()), Err(Error::UnrecognizedFormat)));
    }

    /// V5 bitmap with RGBA masks, pixels at 138 and an embedded profile right
    /// after the pixels.
    fn v5_with_profile(width: i32, height: i32, bpp: u16, compression: u32, pixels: &[u8]) -> Vec<u8> {
        let mut profile = b"MYCAMERA".to_vec();
        profile.resize(128, 0);
        let data_offset = 14 + 124;
        let total = data_offset + pixels.len() + profile.len();

        let mut out = b"BM".to_vec();
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&(data_offset as u32).to_le_bytes());
        let mut dib = vec![0u8; 124];
        dib[0..4].copy_from_slice(&124u32.to_le_bytes());
        dib[4..8].copy_from_slice(&width.to_le_bytes());
        dib[8..12].copy_from_slice(&height.to_le_bytes());
        dib[12..14].copy_from_slice(&1u16.to_le_bytes());
        dib[14..16].copy_from_slice(&bpp.to_le_bytes());
        dib[16..20].copy_from_slice(&compression.to_le_bytes());
        dib[24..28].copy_from_slice(&2835u32.to_le_bytes());
        dib[28..32].copy_from_slice(&2835u32.to_le_bytes());
        dib[40..44].copy_from_slice(&0x00FF_0000u32.to_le_bytes());
        dib[44..48].copy_from_slice(&0x0000_FF00u32.to_le_bytes());
        dib[48..52].copy_from_slice(&0x0000_00FFu32.to_le_bytes());
        dib[52..56].copy_from_slice(&0xFF00_0000u32.to_le_bytes());
        dib[56..60].copy_from_slice(&PROFILE_EMBEDDED.to_le_bytes());
        dib[112..116].copy_from_slice(&((124 + pixels.len()) as u32).to_le_bytes());
        dib[116..120].copy_from_slice(&(profile.len() as u32).to_le_bytes());
        out.extend_from_slice(&dib);
        out.extend_from_slice(pixels);
        out.extend_from_slice(&profile);
        out
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    // ── Redact ──

    #[test]
    fn rebuilds_minimal_header() {
        let input = sample(2, 2, 24, &[0xAB; 12]);
        let out = redact(&input).unwrap();
        assert_eq!(out.data.len(), 54 + 12);
        assert_eq!(&out.data[..2], b"BM");
        assert_eq!(&out.data[54..], &[0xAB; 12]);
        assert_eq!(LE.read_u32(&out.data, 10), Some(54));
        // Resolution is not carried over.
        assert_eq!(LE.read_u32(&out.data, 38), Some(0));
        let meta = decode_tags(&out.data);
        assert_eq!(meta.tags.get_string("Width").as_deref(), Some("2 px"));
    }

    #[test]
    fn drops_bytes_between_header_and_pixels() {
        let mut input = sample(1, 1, 24, &[]);
        input[10..14].copy_from_slice(&(54u32 + 16).to_le_bytes());
        input.extend_from_slice(b"secret-trailer!!");
        input.extend_from_slice(&[1, 2, 3, 0]);
        let out = redact(&input).unwrap();
        assert_eq!(out.data.len(), 58);
        assert_eq!(out.removed, 16);
        assert!(!out.data.windows(6).any(|w| w == b"secret"));
    }

    #[test]
    fn keeps_palette_of_indexed_images() {
        let mut input = sample(2, 1, 8, &[]);
        input[46..50].copy_from_slice(&2u32.to_le_bytes());
        input.extend_from_slice(&[10, 20, 30, 0, 40, 50, 60, 0]);
        input[10..14].copy_from_slice(&62u32.to_le_bytes());
        input.extend_from_slice(&[0, 1, 0, 0]);
        let out = redact(&input).unwrap();
        assert_eq!(out.data.len(), 54 + 8 + 4);
        assert_eq!(LE.read_u32(&out.data, 10), Some(62));
        assert_eq!(LE.read_u32(&out.data, 46), Some(2));
        assert_eq!(&out.data[54..62], &[10, 20, 30, 0, 40, 50, 60, 0]);
    }

    #[test]
    fn core_header_palette_is_widened() {
        let mut input = b"BM".to_vec();
        input.extend_from_slice(&0u32.to_le_bytes());
        input.extend_from_slice(&[0; 4]);
        input.extend_from_slice(&(14u32 + 12 + 6).to_le_bytes());
        input.extend_from_slice(&12u32.to_le_bytes());
        input.extend_from_slice(&4u16.to_le_bytes());
        input.extend_from_slice(&1u16.to_le_bytes());
        input.extend_from_slice(&1u16.to_le_bytes());
        input.extend_from_slice(&1u16.to_le_bytes());
        input.extend_from_slice(&[0, 0, 0, 255, 255, 255]);
        input.extend_from_slice(&[0b1010_0000, 0, 0, 0]);
        let out = redact(&input).unwrap();
        assert_eq!(out.data.len(), 54 + 8 + 4);
        assert_eq!(&out.data[54..62], &[0, 0, 0, 0, 255, 255, 255, 0]);
        assert_eq!(LE.read_u32(&out.data, 14), Some(40));
    }

    #[test]
    fn unsupported_variants() {
        let mut data = sample(2, 2, 24, &[0; 12]);
        data[14..18].copy_from_slice(&20u32.to_le_bytes());
        assert!(matches!(redact(&data), Err(Error::UnsupportedVariant(_))));

        let mut data = sample(2, 2, 24, &[0; 12]);
        data[30..34].copy_from_slice(&4u32.to_le_bytes());
        assert!(matches!(redact(&data), Err(Error::UnsupportedVariant(_))));
    }

    #[test]
    fn trailing_profile_is_dropped() {
        let input = v5_with_profile(1, 1, 32, 0, &[1, 2, 3, 4]);
        assert_eq!(decode_tags(&input).tags.get_string("ProfileSize").as_deref(), Some("128"));
        let out = redact(&input).unwrap();
        assert_eq!(out.data.len(), 54 + 4);
        assert_eq!(&out.data[54..], &[1, 2, 3, 4]);
        assert_eq!(LE.read_u32(&out.data, 2), Some(58));
        assert_eq!(LE.read_u32(&out.data, 34), Some(4));
        assert_eq!(out.removed, input.len() - 58);
        assert!(!contains(&out.data, b"MYCAMERA"));
    }

    #[test]
    fn rows_are_padded_to_four_bytes() {
        // 3 px at 24 bpp: 9 bytes per row, stored as 12.
        let mut input = sample(3, -2, 24, &[7; 24]);
        input.extend_from_slice(b"trailer");
        let out = redact(&input).unwrap();
        assert_eq!(out.data.len(), 54 + 24);
        assert_eq!(out.removed, 7);
    }

    #[test]
    fn rle_pixels_stop_at_profile() {
        // Image size is optional for RLE; the profile offset bounds the span.
        let input = v5_with_profile(2, 1, 8, 1, &[2, 0, 0, 1]);
        let out = redact(&input).unwrap();
        assert_eq!(out.data.len(), 54 + 4);
        assert_eq!(LE.read_u32(&out.data, 30), Some(1));
        assert!(!contains(&out.data, b"MYCAMERA"));
    }

    #[test]
    fn bitfields_keep_their_masks() {
        let input = v5_with_profile(1, 1, 32, 3, &[9, 8, 7, 6]);
        let out = redact(&input).unwrap();
        assert_eq!(out.data.len(), 66 + 4);
        assert_eq!(LE.read_u32(&out.data, 10), Some(66));
        assert_eq!(LE.read_u32(&out.data, 14), Some(40));
        assert_eq!(LE.read_u32(&out.data, 30), Some(3));
        assert_eq!(LE.read_u32(&out.data, 46), Some(0));
        assert_eq!(LE.read_u32(&out.data, 54), Some(0x00FF_0000));
        assert_eq!(LE.read_u32(&out.data, 58), Some(0x0000_FF00));
        assert_eq!(LE.read_u32(&out.data, 62), Some(0x0000_00FF));
        assert_eq!(&out.data[66..], &[9, 8, 7, 6]);
        assert!(!contains(&out.data, b"MYCAMERA"));

        let meta = decode_tags(&out.data);
        assert_eq!(meta.tags.get_string("Compression").as_deref(), Some("Bitfields"));
        assert_eq!(meta.tags.get_string("BitsPerPixel").as_deref(), Some("32 bpp"));
        assert_eq!(meta.dimensions, Some(Dimensions { width: 1, height: 1 }));

        let again = redact(&out.data).unwrap();
        assert_eq!(again.data, out.data);
        assert_eq!(again.removed, 0);
    }

    #[test]
    fn bitfields_without_masks() {
        let mut data = sample(1, 1, 16, &[]);
        data[30..34].copy_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&[0; 4]);
        assert!(matches!(redact(&data), Err(Error::TruncatedStructure { .. })));
    }

    #[test]
    fn pixel_offset_past_end() {
        let mut data = sample(2, 2, 24, &[0; 12]);
        data[10..14].copy_from_slice(&5000u32.to_le_bytes());
        assert!(matches!(redact(&data), Err(Error::TruncatedStructure { .. })));
    }
}
