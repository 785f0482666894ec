//! TIFF/EXIF IFD tree decoder.
//!
//! Decodes the TIFF stream carried by a JPEG APP1 `Exif\0\0` segment. All
//! offsets are relative to the start of the TIFF header (the TIFF base) and
//! every resolved range is checked against the TIFF slice, so a value can never
//! be read from outside the segment it was declared in.
//!
//! IFD0, the Exif sub-IFD, the GPS sub-IFD and the Interop sub-IFD are merged
//! into one dictionary. IFD1 (thumbnail) is visited only for the thumbnail
//! location tags.

use std::collections::HashSet;

use crate::config::DecodeOptions;
use crate::cursor::Endian;
use crate::tags::{Namespace, Rational, TagDictionary, TagKey, TagValue};

/// APP1 payload prefix of an EXIF segment.
pub const EXIF_SIGNATURE: &[u8] = b"Exif\0\0";

pub const TIFF_MAGIC: u16 = 0x002A;
pub const TIFF_HEADER_LEN: usize = 8;
pub const IFD_ENTRY_LEN: usize = 12;

pub const TAG_EXIF_IFD: u16 = 0x8769;
pub const TAG_GPS_IFD: u16 = 0x8825;
pub const TAG_INTEROP_IFD: u16 = 0xA005;
pub const TAG_THUMBNAIL_OFFSET: u16 = 0x0201;
pub const TAG_THUMBNAIL_LENGTH: u16 = 0x0202;

/// TIFF field types 1 through 13.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
    Ifd,
}

impl FieldType {
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => Self::Byte,
            2 => Self::Ascii,
            3 => Self::Short,
            4 => Self::Long,
            5 => Self::Rational,
            6 => Self::SByte,
            7 => Self::Undefined,
            8 => Self::SShort,
            9 => Self::SLong,
            10 => Self::SRational,
            11 => Self::Float,
            12 => Self::Double,
            13 => Self::Ifd,
            _ => return None,
        })
    }

    /// Size in bytes of one element.
    pub fn unit_size(self) -> usize {
        match self {
            Self::Byte | Self::Ascii | Self::SByte | Self::Undefined => 1,
            Self::Short | Self::SShort => 2,
            Self::Long | Self::SLong | Self::Float | Self::Ifd => 4,
            Self::Rational | Self::SRational | Self::Double => 8,
        }
    }
}

/// Which directory an IFD is. Determines the tag namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IfdKind {
    Ifd0,
    Exif,
    Gps,
    Interop,
    Thumbnail,
}

impl IfdKind {
    pub fn namespace(self) -> Namespace {
        match self {
            Self::Ifd0 | Self::Exif | Self::Thumbnail => Namespace::Exif,
            Self::Gps => Namespace::Gps,
            Self::Interop => Namespace::Interop,
        }
    }

    /// Kind of the directory a pointer tag in `self` links to.
    fn child(self, tag: u16) -> Option<IfdKind> {
        match (self, tag) {
            (Self::Ifd0 | Self::Exif, TAG_EXIF_IFD) => Some(Self::Exif),
            (Self::Ifd0 | Self::Exif, TAG_GPS_IFD) => Some(Self::Gps),
            (Self::Ifd0 | Self::Exif, TAG_INTEROP_IFD) => Some(Self::Interop),
            _ => None,
        }
    }
}

/// One decoded IFD entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfdEntry<'a> {
    /// A value whose bytes were resolved inside the TIFF slice.
    Value {
        tag: u16,
        field_type: FieldType,
        count: u32,
        data: &'a [u8],
    },
    /// A pointer to a nested directory.
    SubIfd { tag: u16, kind: IfdKind, offset: u32 },
}

/// Entries of one directory plus the offset of the next one in the chain.
#[derive(Debug, Clone, Default)]
pub struct Ifd<'a> {
    pub entries: Vec<IfdEntry<'a>>,
    pub next: u32,
    /// `false` when the entry table or an entry's value ran past the end.
    pub complete: bool,
}

/// Counters from one TIFF decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TiffOutcome {
    /// Number of tags inserted.
    pub tags: usize,
    /// A directory or value was cut short.
    pub truncated: bool,
}

/// Check the TIFF header and return the byte order and IFD0 offset.
pub fn read_tiff_header(tiff: &[u8]) -> Option<(Endian, u32)> {
    if tiff.len() < TIFF_HEADER_LEN {
        return None;
    }
    let endian = match &tiff[..2] {
        b"II" => Endian::Little,
        b"MM" => Endian::Big,
        _ => return None,
    };
    if endian.read_u16(tiff, 2)? != TIFF_MAGIC {
        return None;
    }
    Some((endian, endian.read_u32(tiff, 4)?))
}

/// Parse the directory at `offset`. `None` if not even the entry count fits.
pub fn read_ifd<'a>(tiff: &'a [u8], endian: Endian, offset: usize, kind: IfdKind) -> Option<Ifd<'a>> {
    let count = usize::from(endian.read_u16(tiff, offset)?);
    let mut ifd = Ifd {
        entries: Vec::with_capacity(count.min(256)),
        next: 0,
        complete: true,
    };

    for i in 0..count {
        let pos = offset + 2 + i * IFD_ENTRY_LEN;
        let Some(raw) = tiff.get(pos..pos + IFD_ENTRY_LEN) else {
            log::debug!("IFD at {offset}: entry {i} of {count} past end of TIFF data");
            ifd.complete = false;
            return Some(ifd);
        };
        let tag = endian.read_u16(raw, 0)?;
        let type_code = endian.read_u16(raw, 2)?;
        let n = endian.read_u32(raw, 4)?;
        let value_field = endian.read_u32(raw, 8)?;

        if let Some(child) = kind.child(tag) {
            if n > 0 {
                ifd.entries.push(IfdEntry::SubIfd { tag, kind: child, offset: value_field });
            }
            continue;
        }

        let Some(field_type) = FieldType::from_code(type_code) else {
            log::debug!("tag 0x{tag:04x}: unknown field type {type_code}, skipped");
            continue;
        };
        if n == 0 {
            continue;
        }
        let total = (n as u64).saturating_mul(field_type.unit_size() as u64);
        let data = if total <= 4 {
            &raw[8..8 + total as usize]
        } else {
            let start = u64::from(value_field);
            match start.checked_add(total).filter(|&end| end <= tiff.len() as u64) {
                Some(end) => &tiff[start as usize..end as usize],
                None => {
                    log::debug!("tag 0x{tag:04x}: value at {start}+{total} outside TIFF data");
                    ifd.complete = false;
                    continue;
                }
            }
        };
        ifd.entries.push(IfdEntry::Value { tag, field_type, count: n, data });
    }

    match endian.read_u32(tiff, offset + 2 + count * IFD_ENTRY_LEN) {
        Some(next) => ifd.next = next,
        None => ifd.complete = false,
    }
    Some(ifd)
}

/// Decode a whole TIFF stream into `tags`.
///
/// Returns `None` when the header is not a TIFF header.
pub fn decode_tiff(tiff: &[u8], options: &DecodeOptions, tags: &mut TagDictionary) -> Option<TiffOutcome> {
    let (endian, ifd0) = read_tiff_header(tiff)?;
    let mut walker = Walker {
        tiff,
        endian,
        max_depth: options.max_ifd_depth,
        visited: HashSet::new(),
        outcome: TiffOutcome::default(),
    };
    walker.walk(ifd0, IfdKind::Ifd0, 0, tags);
    Some(walker.outcome)
}

/// Decode an APP1 payload that starts with [`EXIF_SIGNATURE`].
pub fn decode_app1(payload: &[u8], options: &DecodeOptions, tags: &mut TagDictionary) -> Option<TiffOutcome> {
    decode_tiff(payload.strip_prefix(EXIF_SIGNATURE)?, options, tags)
}

struct Walker<'a> {
    tiff: &'a [u8],
    endian: Endian,
    max_depth: usize,
    visited: HashSet<u32>,
    outcome: TiffOutcome,
}

impl Walker<'_> {
    fn walk(&mut self, offset: u32, kind: IfdKind, depth: usize, tags: &mut TagDictionary) {
        if depth > self.max_depth {
            log::debug!("{kind:?} IFD at {offset} exceeds depth limit {}", self.max_depth);
            return;
        }
        if !self.visited.insert(offset) {
            log::debug!("{kind:?} IFD at {offset} already visited, cycle ignored");
            return;
        }
        let Some(ifd) = read_ifd(self.tiff, self.endian, offset as usize, kind) else {
            log::debug!("{kind:?} IFD at {offset} outside TIFF data");
            self.outcome.truncated = true;
            return;
        };
        if !ifd.complete {
            self.outcome.truncated = true;
        }

        for entry in ifd.entries {
            match entry {
                IfdEntry::SubIfd { kind: child, offset, .. } => {
                    self.walk(offset, child, depth + 1, tags);
                }
                IfdEntry::Value { tag, field_type, count, data } => {
                    if kind == IfdKind::Thumbnail
                        && tag != TAG_THUMBNAIL_OFFSET
                        && tag != TAG_THUMBNAIL_LENGTH
                    {
                        continue;
                    }
                    if let Some(value) = decode_value(tag, field_type, count, data, self.endian) {
                        tags.insert(tag_key(kind, tag), value);
                        self.outcome.tags += 1;
                    }
                }
            }
        }

        if kind == IfdKind::Ifd0 && ifd.next != 0 {
            self.walk(ifd.next, IfdKind::Thumbnail, depth, tags);
        }
    }
}

/// Key for `tag` in the namespace of `kind`.
pub fn tag_key(kind: IfdKind, tag: u16) -> TagKey {
    let namespace = kind.namespace();
    let name = match namespace {
        Namespace::Exif => exif_tag_name(tag),
        Namespace::Gps => gps_tag_name(tag),
        Namespace::Interop => interop_tag_name(tag),
    };
    match name {
        Some(name) => TagKey::Named(name),
        None => TagKey::Unknown { namespace, id: tag },
    }
}

fn exif_tag_name(tag: u16) -> Option<&'static str> {
    Some(match tag {
        0x0100 => "ImageWidth",
        0x0101 => "ImageLength",
        0x0102 => "BitsPerSample",
        0x0103 => "Compression",
        0x0106 => "PhotometricInterpretation",
        0x010E => "ImageDescription",
        0x010F => "Make",
        0x0110 => "Model",
        0x0111 => "StripOffsets",
        0x0112 => "Orientation",
        0x0115 => "SamplesPerPixel",
        0x011A => "XResolution",
        0x011B => "YResolution",
        0x0128 => "ResolutionUnit",
        0x0131 => "Software",
        0x0132 => "DateTime",
        0x013B => "Artist",
        0x0201 => "ThumbnailOffset",
        0x0202 => "ThumbnailLength",
        0x0213 => "YCbCrPositioning",
        0x8298 => "Copyright",
        0x829A => "ExposureTime",
        0x829D => "FNumber",
        0x8822 => "ExposureProgram",
        0x8827 => "ISOSpeedRatings",
        0x9000 => "ExifVersion",
        0x9003 => "DateTimeOriginal",
        0x9004 => "DateTimeDigitized",
        0x9010 => "OffsetTime",
        0x9011 => "OffsetTimeOriginal",
        0x9012 => "OffsetTimeDigitized",
        0x9101 => "ComponentsConfiguration",
        0x9102 => "CompressedBitsPerPixel",
        0x9201 => "ShutterSpeedValue",
        0x9202 => "ApertureValue",
        0x9203 => "BrightnessValue",
        0x9204 => "ExposureBiasValue",
        0x9205 => "MaxApertureValue",
        0x9207 => "MeteringMode",
        0x9208 => "LightSource",
        0x9209 => "Flash",
        0x920A => "FocalLength",
        0x927C => "MakerNote",
        0x9286 => "UserComment",
        0x9C9B => "XPTitle",
        0x9C9C => "XPComment",
        0x9C9D => "XPAuthor",
        0x9C9E => "XPKeywords",
        0x9C9F => "XPSubject",
        0xA000 => "FlashpixVersion",
        0xA001 => "ColorSpace",
        0xA002 => "PixelXDimension",
        0xA003 => "PixelYDimension",
        0xA20E => "FocalPlaneXResolution",
        0xA20F => "FocalPlaneYResolution",
        0xA210 => "FocalPlaneResolutionUnit",
        0xA401 => "CustomRendered",
        0xA402 => "ExposureMode",
        0xA403 => "WhiteBalance",
        0xA406 => "SceneCaptureType",
        0xA420 => "ImageUniqueID",
        0xA431 => "BodySerialNumber",
        0xA433 => "LensMake",
        0xA434 => "LensModel",
        0xC612 => "DNGVersion",
        _ => return None,
    })
}

fn gps_tag_name(tag: u16) -> Option<&'static str> {
    Some(match tag {
        0x0000 => "GPSVersionID",
        0x0001 => "GPSLatitudeRef",
        0x0002 => "GPSLatitude",
        0x0003 => "GPSLongitudeRef",
        0x0004 => "GPSLongitude",
        0x0005 => "GPSAltitudeRef",
        0x0006 => "GPSAltitude",
        0x0007 => "GPSTimeStamp",
        0x0010 => "GPSImgDirectionRef",
        0x0011 => "GPSImgDirection",
        0x0012 => "GPSMapDatum",
        0x001B => "GPSProcessingMethod",
        0x001D => "GPSDateStamp",
        _ => return None,
    })
}

fn interop_tag_name(tag: u16) -> Option<&'static str> {
    Some(match tag {
        0x0001 => "InteropIndex",
        0x0002 => "InteropVersion",
        _ => return None,
    })
}

fn is_xp_tag(tag: u16) -> bool {
    (0x9C9B..=0x9C9F).contains(&tag)
}

/// Turn an entry's bytes into a typed value. `None` for empty text.
pub fn decode_value(tag: u16, field_type: FieldType, count: u32, data: &[u8], endian: Endian) -> Option<TagValue> {
    if is_xp_tag(tag) && matches!(field_type, FieldType::Byte | FieldType::Undefined) {
        return non_empty(decode_utf16(data, Endian::Little));
    }

    let n = count as usize;
    match field_type {
        FieldType::Byte => integers(data, 1, n, |b| Some(i64::from(b[0]))),
        FieldType::SByte => integers(data, 1, n, |b| Some(i64::from(b[0] as i8))),
        FieldType::Short => integers(data, 2, n, |b| endian.read_u16(b, 0).map(i64::from)),
        FieldType::SShort => integers(data, 2, n, |b| endian.read_u16(b, 0).map(|v| i64::from(v as i16))),
        FieldType::Long | FieldType::Ifd => integers(data, 4, n, |b| endian.read_u32(b, 0).map(i64::from)),
        FieldType::SLong => integers(data, 4, n, |b| endian.read_u32(b, 0).map(|v| i64::from(v as i32))),
        FieldType::Ascii => {
            let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            non_empty(String::from_utf8_lossy(&data[..end]).trim_end().to_string())
        }
        FieldType::Rational | FieldType::SRational => {
            let signed = field_type == FieldType::SRational;
            let values: Vec<Rational> = data
                .chunks_exact(8)
                .filter_map(|b| {
                    let num = endian.read_u32(b, 0)?;
                    let den = endian.read_u32(b, 4)?;
                    Some(if signed {
                        Rational { num: i64::from(num as i32), den: i64::from(den as i32) }
                    } else {
                        Rational { num: i64::from(num), den: i64::from(den) }
                    })
                })
                .collect();
            (!values.is_empty()).then_some(TagValue::Rationals(values))
        }
        FieldType::Float => {
            let values: Vec<f64> = data
                .chunks_exact(4)
                .filter_map(|b| endian.read_u32(b, 0).map(|v| f64::from(f32::from_bits(v))))
                .collect();
            (!values.is_empty()).then_some(TagValue::Reals(values))
        }
        FieldType::Double => {
            let values: Vec<f64> = data
                .chunks_exact(8)
                .filter_map(|b| endian.read_u64(b, 0).map(f64::from_bits))
                .collect();
            (!values.is_empty()).then_some(TagValue::Reals(values))
        }
        FieldType::Undefined => Some(decode_undefined(tag, data, endian)),
    }
}

/// One integer per `width`-byte element; a single element stays scalar.
fn integers(data: &[u8], width: usize, count: usize, read: impl Fn(&[u8]) -> Option<i64>) -> Option<TagValue> {
    let values: Vec<i64> = data.chunks_exact(width).take(count).filter_map(read).collect();
    match values.as_slice() {
        [] => None,
        [single] => Some(TagValue::Int(*single)),
        _ => Some(TagValue::Ints(values)),
    }
}

fn non_empty(s: String) -> Option<TagValue> {
    (!s.is_empty()).then_some(TagValue::Text(s))
}

/// UNDEFINED (type 7) payloads with a known layout.
fn decode_undefined(tag: u16, data: &[u8], endian: Endian) -> TagValue {
    match tag {
        // ExifVersion, FlashpixVersion: "0230", "0100"
        0x9000 | 0xA000 if data.len() == 4 => TagValue::Text(String::from_utf8_lossy(data).into_owned()),
        0x9101 if data.len() == 4 => {
            let names: Vec<&str> = data
                .iter()
                .filter_map(|&c| match c {
                    0 => Some("-"),
                    1 => Some("Y"),
                    2 => Some("Cb"),
                    3 => Some("Cr"),
                    4 => Some("R"),
                    5 => Some("G"),
                    6 => Some("B"),
                    _ => None,
                })
                .collect();
            TagValue::Text(names.join(", "))
        }
        // UserComment, GPSProcessingMethod
        0x9286 | 0x001B => decode_charset_text(data, endian).unwrap_or(TagValue::Bytes(data.len())),
        _ => TagValue::Bytes(data.len()),
    }
}

/// 8-byte character code followed by text.
fn decode_charset_text(data: &[u8], endian: Endian) -> Option<TagValue> {
    let (code, text) = data.split_at_checked(8)?;
    let text = match code {
        b"ASCII\0\0\0" | [0, 0, 0, 0, 0, 0, 0, 0] => {
            let end = text.iter().rposition(|&b| b != 0 && b != b' ').map_or(0, |i| i + 1);
            String::from_utf8_lossy(&text[..end]).into_owned()
        }
        b"UNICODE\0" => decode_utf16(text, endian),
        _ => return None,
    };
    (!text.is_empty()).then_some(TagValue::Text(text))
}

fn decode_utf16(data: &[u8], endian: Endian) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .filter_map(|b| endian.read_u16(b, 0))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units).trim_end().to_string()
}
