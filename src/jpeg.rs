//! JPEG marker stream walker, decoder and redactor.
//!
//! After SOI the stream is a sequence of markers. Standalone markers (SOI,
//! EOI, RSTn, TEM) carry no length; every other marker is followed by a
//! big-endian length that counts itself. The first SOS ends marker parsing:
//! everything after its header is entropy-coded scan data and is treated as
//! one opaque run.
//!
//! Redaction drops APPn and COM segments and copies everything else as-is.

use std::ops::Range;

use crate::config::DecodeOptions;
use crate::cursor::{Endian, latin1};
use crate::error::{Error, Result};
use crate::format::ImageFormat;
use crate::metadata::{Dimensions, Metadata, Redaction};
use crate::tags::{TagDictionary, TagValue, Unit};
use crate::{exif, icc, iptc, xmp};

const BE: Endian = Endian::Big;

pub mod markers {
    pub const SOI: u8 = 0xD8;
    pub const EOI: u8 = 0xD9;
    pub const SOS: u8 = 0xDA;
    pub const TEM: u8 = 0x01;
    pub const APP0: u8 = 0xE0;
    pub const APP1: u8 = 0xE1;
    pub const APP2: u8 = 0xE2;
    pub const APP13: u8 = 0xED;
    pub const APP15: u8 = 0xEF;
    pub const COM: u8 = 0xFE;
}

const EOI_BYTES: [u8; 2] = [0xFF, markers::EOI];
const JFIF_SIGNATURE: &[u8] = b"JFIF\0";
const ICC_SIGNATURE: &[u8] = b"ICC_PROFILE\0";

/// What a piece of the marker stream is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece {
    /// Bytes outside any segment: `FF` fill, stuffed `FF 00`, stray bytes.
    Filler,
    /// Marker without a length field.
    Standalone(u8),
    /// Length-prefixed segment.
    Segment(u8),
    /// Everything after the first SOS header.
    Scan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub piece: Piece,
    pub range: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct MarkerStream<'a> {
    data: &'a [u8],
    pub spans: Vec<Span>,
    /// A segment length was invalid or ran past the end of the buffer.
    pub truncated: bool,
}

impl<'a> MarkerStream<'a> {
    /// Segments with their marker and payload, length field excluded.
    pub fn segments(&self) -> impl Iterator<Item = (u8, &'a [u8])> + '_ {
        let data = self.data;
        self.spans.iter().filter_map(move |span| match span.piece {
            Piece::Segment(marker) => Some((marker, &data[span.range.start + 4..span.range.end])),
            _ => None,
        })
    }
}

fn is_standalone(marker: u8) -> bool {
    matches!(marker, markers::SOI | markers::EOI | 0xD0..=0xD7 | markers::TEM)
}

/// Start-of-frame markers. C4 (DHT), C8 (JPG) and CC (DAC) share the range
/// but are not frames.
fn is_sof(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

/// Segments the image cannot be rendered without, plus anything unknown.
fn is_essential(marker: u8) -> bool {
    !matches!(marker, markers::APP0..=markers::APP15 | markers::COM)
}

/// Walk the marker stream. Fails only on a signature mismatch.
pub fn walk(data: &[u8]) -> Result<MarkerStream<'_>> {
    if ImageFormat::detect(data) != Some(ImageFormat::Jpeg) {
        return Err(Error::UnrecognizedFormat);
    }
    let mut stream = MarkerStream {
        data,
        spans: vec![Span { piece: Piece::Standalone(markers::SOI), range: 0..2 }],
        truncated: false,
    };
    let mut pos = 2;

    while pos < data.len() {
        if data[pos] != 0xFF {
            let end = data[pos..].iter().position(|&b| b == 0xFF).map_or(data.len(), |i| pos + i);
            log::debug!("JPEG: {} stray bytes at {pos}", end - pos);
            stream.spans.push(Span { piece: Piece::Filler, range: pos..end });
            pos = end;
            continue;
        }
        let Some(&marker) = data.get(pos + 1) else {
            stream.truncated = true;
            break;
        };
        let (piece, end) = match marker {
            0xFF => (Piece::Filler, pos + 1),
            0x00 => (Piece::Filler, pos + 2),
            m if is_standalone(m) => (Piece::Standalone(m), pos + 2),
            m => {
                let end = BE
                    .read_u16(data, pos + 2)
                    .filter(|&len| len >= 2)
                    .map(|len| pos + 2 + usize::from(len))
                    .filter(|&end| end <= data.len());
                let Some(end) = end else {
                    log::debug!("JPEG segment 0x{m:02X} at {pos} has a bad length");
                    stream.truncated = true;
                    break;
                };
                (Piece::Segment(m), end)
            }
        };
        stream.spans.push(Span { piece, range: pos..end });
        pos = end;

        if piece == Piece::Segment(markers::SOS) {
            if pos < data.len() {
                stream.spans.push(Span { piece: Piece::Scan, range: pos..data.len() });
            }
            break;
        }
    }
    Ok(stream)
}

/// Decode EXIF, XMP, IPTC, comments and the frame header.
pub fn decode(data: &[u8], options: &DecodeOptions) -> Result<Metadata> {
    let stream = walk(data)?;
    let mut meta = Metadata::new(ImageFormat::Jpeg);
    meta.truncated = stream.truncated;

    let mut exif_seen = false;
    let mut comments = Vec::new();
    for (marker, payload) in stream.segments() {
        let tags = &mut meta.tags;
        match marker {
            markers::APP0 if payload.starts_with(JFIF_SIGNATURE) => decode_jfif(payload, tags),
            markers::APP1 if payload.starts_with(exif::EXIF_SIGNATURE) => {
                if exif_seen {
                    log::debug!("JPEG: ignoring additional EXIF segment");
                    continue;
                }
                exif_seen = true;
                match exif::decode_app1(payload, options, tags) {
                    Some(outcome) => {
                        log::debug!("JPEG: {} EXIF tags", outcome.tags);
                        meta.truncated |= outcome.truncated;
                    }
                    None => log::debug!("JPEG: EXIF segment without a valid TIFF header"),
                }
            }
            markers::APP1 => {
                if let Some(packet) = payload.strip_prefix(xmp::JPEG_SIGNATURE) {
                    xmp::extract_descriptive(&String::from_utf8_lossy(packet), tags);
                }
            }
            markers::APP2 => decode_icc_chunk(payload, tags),
            markers::APP13 => {
                let found = iptc::decode_app13(payload, tags);
                log::debug!("JPEG: {found} IPTC records");
            }
            markers::COM => {
                let text = latin1(payload);
                let text = text.trim_end_matches('\0').trim();
                if !text.is_empty() {
                    comments.push(text.to_string());
                }
            }
            m if is_sof(m) => {
                if let Some(dims) = decode_frame(m, payload, tags) {
                    meta.dimensions.get_or_insert(dims);
                }
            }
            _ => {}
        }
    }
    if !comments.is_empty() {
        meta.tags.insert("Comment", TagValue::Text(comments.join(" | ")));
    }
    Ok(meta)
}

fn decode_jfif(payload: &[u8], tags: &mut TagDictionary) {
    let (Some(&[major, minor, unit]), Some(x), Some(y)) =
        (payload.get(5..8), BE.read_u16(payload, 8), BE.read_u16(payload, 10))
    else {
        return;
    };
    tags.insert("JFIFVersion", TagValue::Text(format!("{major}.{minor:02}")));
    let unit = match unit {
        0 => "None".to_string(),
        1 => "inches".to_string(),
        2 => "cm".to_string(),
        n => format!("Unknown ({n})"),
    };
    tags.insert("ResolutionUnit", TagValue::Text(unit));
    tags.insert("XDensity", TagValue::Int(i64::from(x)));
    tags.insert("YDensity", TagValue::Int(i64::from(y)));
}

/// The first chunk of an `ICC_PROFILE` APP2 sequence holds the profile header.
fn decode_icc_chunk(payload: &[u8], tags: &mut TagDictionary) {
    let Some(rest) = payload.strip_prefix(ICC_SIGNATURE) else {
        return;
    };
    if let Some((&[1, _], profile)) = rest.split_first_chunk::<2>() {
        icc::decode_header(profile, tags);
    }
}

fn frame_type(marker: u8) -> &'static str {
    match marker {
        0xC0 => "Baseline DCT, Huffman coding",
        0xC1 => "Extended sequential DCT, Huffman coding",
        0xC2 => "Progressive DCT, Huffman coding",
        0xC3 => "Lossless, Huffman coding",
        0xC5 => "Sequential DCT, differential Huffman coding",
        0xC6 => "Progressive DCT, differential Huffman coding",
        0xC7 => "Lossless, differential Huffman coding",
        0xC9 => "Extended sequential DCT, arithmetic coding",
        0xCA => "Progressive DCT, arithmetic coding",
        0xCB => "Lossless, arithmetic coding",
        0xCD => "Sequential DCT, differential arithmetic coding",
        0xCE => "Progressive DCT, differential arithmetic coding",
        _ => "Lossless, differential arithmetic coding",
    }
}

/// Precision, height, width and component count of a frame header.
fn decode_frame(marker: u8, payload: &[u8], tags: &mut TagDictionary) -> Option<Dimensions> {
    let precision = *payload.first()?;
    let height = BE.read_u16(payload, 1)?;
    let width = BE.read_u16(payload, 3)?;
    let components = *payload.get(5)?;
    tags.insert("FrameWidth", TagValue::Measure(u64::from(width), Unit::Pixels));
    tags.insert("FrameHeight", TagValue::Measure(u64::from(height), Unit::Pixels));
    tags.insert("FrameBitDepth", TagValue::Measure(u64::from(precision), Unit::Bits));
    tags.insert("FrameComponents", TagValue::Int(i64::from(components)));
    tags.insert("FrameType", TagValue::text(frame_type(marker)));
    Some(Dimensions { width: u32::from(width), height: u32::from(height) })
}

/// Drop APPn and COM segments; copy everything else byte-for-byte.
///
/// The removed count is the total size of the dropped segments. A missing
/// EOI is appended.
pub fn redact(data: &[u8]) -> Result<Redaction> {
    let stream = walk(data)?;
    let mut out = Vec::with_capacity(data.len());
    let mut removed = 0;
    for span in &stream.spans {
        match span.piece {
            Piece::Segment(marker) if !is_essential(marker) => {
                log::debug!("JPEG: dropping segment 0x{marker:02X} of {} bytes", span.range.len());
                removed += span.range.len();
            }
            _ => out.extend_from_slice(&data[span.range.clone()]),
        }
    }
    if !out.ends_with(&EOI_BYTES) {
        out.extend_from_slice(&EOI_BYTES);
    }
    Ok(Redaction { data: out, removed })
}
