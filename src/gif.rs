//! GIF block walker, decoder and redactor.
//!
//! Structure:
//! - Header: "GIF87a" or "GIF89a" (6 bytes)
//! - Logical screen descriptor (7 bytes)
//! - Global colour table (optional)
//! - Blocks: extensions (0x21) and images (0x2C)
//! - Trailer (0x3B)
//!
//! Redaction keeps graphic control extensions (animation timing), the
//! NETSCAPE2.0 application extension (loop count), plain text extensions
//! and images. Comments and every other application extension are dropped.

use std::ops::Range;

use crate::config::DecodeOptions;
use crate::cursor::{Endian, printable_ascii};
use crate::error::{Error, Result};
use crate::format::ImageFormat;
use crate::metadata::{Dimensions, Metadata, Redaction};
use crate::tags::{TagKey, TagValue, Unit};

const HEADER_LEN: usize = 6;
const SCREEN_DESCRIPTOR_END: usize = 13;

/// Block introducers.
mod blocks {
    pub const EXTENSION: u8 = 0x21;
    pub const IMAGE: u8 = 0x2C;
    pub const TRAILER: u8 = 0x3B;
}

/// Extension labels.
mod labels {
    pub const PLAIN_TEXT: u8 = 0x01;
    pub const GRAPHIC_CONTROL: u8 = 0xF9;
    pub const COMMENT: u8 = 0xFE;
    pub const APPLICATION: u8 = 0xFF;
}

const NETSCAPE_ID: &[u8] = b"NETSCAPE2.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    GraphicControl,
    Comment,
    Application,
    PlainText,
    /// Extension with a label this crate does not know.
    Extension(u8),
    Image,
    Trailer,
}

/// One complete block: introducer through its sub-block terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub span: Range<usize>,
}

/// Result of walking a GIF buffer.
#[derive(Debug, Clone)]
pub struct GifStream<'a> {
    data: &'a [u8],
    /// End of header, screen descriptor and global colour table.
    pub header_end: usize,
    pub blocks: Vec<Block>,
    /// The walk hit the end of the buffer before a trailer.
    pub truncated: bool,
}

impl<'a> GifStream<'a> {
    pub fn bytes(&self, block: &Block) -> &'a [u8] {
        &self.data[block.span.clone()]
    }

    /// Data sub-blocks of an extension, label excluded.
    fn extension_data(&self, block: &Block) -> SubBlocks<'a> {
        SubBlocks { data: self.data, pos: block.span.start + 2, end: block.span.end }
    }

    pub fn image_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.kind == BlockKind::Image).count()
    }
}

/// Iterator over the data sub-blocks of a chain. Stops at the terminator.
pub struct SubBlocks<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Iterator for SubBlocks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let size = usize::from(*self.data.get(self.pos)?);
        if size == 0 || self.pos + 1 + size > self.end {
            return None;
        }
        let block = &self.data[self.pos + 1..self.pos + 1 + size];
        self.pos += 1 + size;
        Some(block)
    }
}

/// Skip a sub-block chain starting at `pos`. Returns the offset after the terminator.
fn skip_sub_blocks(data: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let size = usize::from(*data.get(pos)?);
        pos += 1;
        if size == 0 {
            return Some(pos);
        }
        pos += size;
        if pos > data.len() {
            return None;
        }
    }
}

/// Size in bytes of a colour table, from a packed field.
fn color_table_len(packed: u8) -> usize {
    if packed & 0x80 != 0 {
        3 * (1 << ((packed & 0x07) + 1))
    } else {
        0
    }
}

fn is_netscape(data: &[u8], pos: usize) -> bool {
    data.get(pos) == Some(&11) && data.get(pos + 1..pos + 12) == Some(NETSCAPE_ID)
}

/// Walk the block stream. Fails only on a signature mismatch.
///
/// Only complete blocks are listed; the walk stops at the trailer or at the
/// first block that runs past the end of the buffer.
pub fn walk(data: &[u8]) -> Result<GifStream<'_>> {
    if ImageFormat::detect(data) != Some(ImageFormat::Gif) {
        return Err(Error::UnrecognizedFormat);
    }
    let mut stream = GifStream {
        data,
        header_end: data.len().min(SCREEN_DESCRIPTOR_END),
        blocks: Vec::new(),
        truncated: true,
    };
    let Some(&packed) = data.get(10) else {
        log::debug!("GIF screen descriptor truncated");
        return Ok(stream);
    };
    let header_end = SCREEN_DESCRIPTOR_END + color_table_len(packed);
    if header_end > data.len() {
        log::debug!("GIF global colour table runs past end of file");
        return Ok(stream);
    }
    stream.header_end = header_end;

    let mut pos = header_end;
    while let Some(&introducer) = data.get(pos) {
        let end = match introducer {
            blocks::TRAILER => {
                stream.blocks.push(Block { kind: BlockKind::Trailer, span: pos..pos + 1 });
                stream.truncated = false;
                return Ok(stream);
            }
            blocks::EXTENSION => {
                let Some(&label) = data.get(pos + 1) else { break };
                let kind = match label {
                    labels::GRAPHIC_CONTROL => BlockKind::GraphicControl,
                    labels::COMMENT => BlockKind::Comment,
                    labels::APPLICATION => BlockKind::Application,
                    labels::PLAIN_TEXT => BlockKind::PlainText,
                    other => BlockKind::Extension(other),
                };
                skip_sub_blocks(data, pos + 2).map(|end| (kind, end))
            }
            blocks::IMAGE => {
                // 9-byte descriptor, packed field last.
                let lzw = data
                    .get(pos + 9)
                    .map(|&packed| pos + 10 + color_table_len(packed))
                    .filter(|&lzw| lzw < data.len());
                lzw.and_then(|lzw| skip_sub_blocks(data, lzw + 1)).map(|end| (BlockKind::Image, end))
            }
            stray => {
                log::debug!("GIF: skipping stray byte 0x{stray:02x} at {pos}");
                pos += 1;
                continue;
            }
        };
        let Some((kind, end)) = end else { break };
        stream.blocks.push(Block { kind, span: pos..end });
        pos = end;
    }

    log::debug!("GIF block walk stopped at {pos} without a trailer");
    Ok(stream)
}

/// Decode the screen descriptor and the extension blocks.
pub fn decode(data: &[u8], _options: &DecodeOptions) -> Result<Metadata> {
    let stream = walk(data)?;
    let mut meta = Metadata::new(ImageFormat::Gif);
    meta.truncated = stream.truncated;
    let tags = &mut meta.tags;

    tags.insert("Version", TagValue::Text(String::from_utf8_lossy(&data[..HEADER_LEN]).into_owned()));
    let (Some(width), Some(height), Some(&packed), Some(&background), Some(&aspect)) = (
        Endian::Little.read_u16(data, 6),
        Endian::Little.read_u16(data, 8),
        data.get(10),
        data.get(11),
        data.get(12),
    ) else {
        return Ok(meta);
    };
    tags.insert("Width", TagValue::Measure(u64::from(width), Unit::Pixels));
    tags.insert("Height", TagValue::Measure(u64::from(height), Unit::Pixels));
    tags.insert("ColorResolution", TagValue::Measure(u64::from((packed >> 4 & 0x07) + 1), Unit::Bits));
    let table = match packed & 0x80 {
        0 => TagValue::text("none"),
        _ => TagValue::Measure(1 << ((packed & 0x07) + 1), Unit::Colors),
    };
    tags.insert("GlobalColorTable", table);
    tags.insert("BackgroundColor", TagValue::Int(i64::from(background)));
    tags.insert("AspectRatio", TagValue::Int(i64::from(aspect)));
    meta.dimensions = Some(Dimensions { width: u32::from(width), height: u32::from(height) });

    let mut delay_ms = 0u64;
    let mut transparent = None;
    let mut comments = Vec::new();

    for block in &stream.blocks {
        match block.kind {
            BlockKind::GraphicControl => {
                if let Some(&[_, lo, hi, index]) = stream.extension_data(block).next() {
                    delay_ms += u64::from(u16::from_le_bytes([lo, hi])) * 10;
                    if index != 0 && transparent.is_none() {
                        transparent = Some(index);
                    }
                }
            }
            BlockKind::Comment => {
                comments.extend(
                    stream
                        .extension_data(block)
                        .map(|text| String::from_utf8_lossy(text).into_owned()),
                );
            }
            BlockKind::Application => {
                let mut chain = stream.extension_data(block);
                let Some(id) = chain.next() else { continue };
                let name = printable_ascii(id);
                meta.tags.insert(TagKey::Keyword(format!("App_{name}")), TagValue::Present);
                if id == NETSCAPE_ID {
                    if let Some(&[1, lo, hi]) = chain.next() {
                        meta.tags.insert("NetscapeLoops", TagValue::Int(i64::from(u16::from_le_bytes([lo, hi]))));
                    }
                }
            }
            _ => {}
        }
    }

    let frames = stream.image_count();
    let tags = &mut meta.tags;
    tags.insert("FrameCount", TagValue::Int(frames as i64));
    tags.insert("Duration", TagValue::Duration { millis: delay_ms, frames });
    if let Some(index) = transparent {
        tags.insert("TransparentColor", TagValue::Int(i64::from(index)));
    }
    if !comments.is_empty() {
        tags.insert("Comment", TagValue::Text(comments.join(" | ")));
    }
    Ok(meta)
}

fn keep(stream: &GifStream<'_>, block: &Block) -> bool {
    match block.kind {
        BlockKind::GraphicControl | BlockKind::PlainText | BlockKind::Image | BlockKind::Trailer => true,
        BlockKind::Application => is_netscape(stream.data, block.span.start + 2),
        BlockKind::Comment | BlockKind::Extension(_) => false,
    }
}

/// Copy the header and the kept blocks; always ends with a trailer.
pub fn redact(data: &[u8]) -> Result<Redaction> {
    let stream = walk(data)?;
    if data.len() < SCREEN_DESCRIPTOR_END {
        return Err(Error::truncated("GIF screen descriptor", data.len()));
    }
    if stream.header_end < SCREEN_DESCRIPTOR_END + color_table_len(data[10]) {
        return Err(Error::truncated("GIF global colour table", SCREEN_DESCRIPTOR_END));
    }

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[..stream.header_end]);
    for block in &stream.blocks {
        if keep(&stream, block) {
            out.extend_from_slice(stream.bytes(block));
        } else {
            log::debug!("GIF: dropping {:?} block of {} bytes", block.kind, block.span.len());
        }
    }
    if stream.truncated {
        out.push(blocks::TRAILER);
    }
    Ok(Redaction::from_sizes(data.len(), out))
}


#[cfg(test)]
mod tests {
    use super::fixture::*;
    use super::*;

    fn animated() -> Vec<u8> {
        let mut gif = header(10, 20);
        gif.extend(application(b"NETSCAPE2.0", &[1, 0, 0]));
        gif.extend(application(b"XMP DataXMP", b"<x:xmpmeta/>"));
        gif.extend(comment("made by hand"));
        gif.extend(graphic_control(10, 0));
        gif.extend(image(&[0x44, 0x01]));
        gif.extend(graphic_control(25, 3));
        gif.extend(image(&[0x55, 0x02]));
        gif.extend(comment("second"));
        gif.push(0x3B);
        gif
    }

    fn decoded(data: &[u8]) -> Metadata {
        decode(data, &DecodeOptions::default()).unwrap()
    }

    // ── Walker ──

    #[test]
    fn walks_all_blocks() {
        let data = animated();
        let stream = walk(&data).unwrap();
        assert!(!stream.truncated);
        assert_eq!(stream.header_end, 13 + 6);
        let kinds: Vec<BlockKind> = stream.blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            [
                BlockKind::Application,
                BlockKind::Application,
                BlockKind::Comment,
                BlockKind::GraphicControl,
                BlockKind::Image,
                BlockKind::GraphicControl,
                BlockKind::Image,
                BlockKind::Comment,
                BlockKind::Trailer,
            ]
        );
    }

    #[test]
    fn truncated_image_is_not_listed() {
        let data = animated();
        let cut = data.len() - 20;
        let stream = walk(&data[..cut]).unwrap();
        assert!(stream.truncated);
        assert_eq!(stream.image_count(), 1);
    }

    // ── Decode ──

    #[test]
    fn header_tags() {
        let meta = decoded(&animated());
        let tags = &meta.tags;
        assert_eq!(tags.get_string("Version").as_deref(), Some("GIF89a"));
        assert_eq!(tags.get_string("Width").as_deref(), Some("10 px"));
        assert_eq!(tags.get_string("Height").as_deref(), Some("20 px"));
        assert_eq!(tags.get_string("GlobalColorTable").as_deref(), Some("2 colors"));
        assert_eq!(tags.get_string("ColorResolution").as_deref(), Some("1-bit"));
        assert_eq!(meta.dimensions, Some(Dimensions { width: 10, height: 20 }));
    }

    #[test]
    fn animation_tags() {
        let meta = decoded(&animated());
        let tags = &meta.tags;
        assert_eq!(tags.get_string("FrameCount").as_deref(), Some("2"));
        assert_eq!(tags.get_string("Duration").as_deref(), Some("350ms (2 frames)"));
        assert_eq!(tags.get_string("TransparentColor").as_deref(), Some("3"));
        assert_eq!(tags.get_string("NetscapeLoops").as_deref(), Some("0"));
        assert_eq!(tags.get_string("App_NETSCAPE2.0").as_deref(), Some("present"));
        assert_eq!(tags.get_string("App_XMP DataXMP").as_deref(), Some("present"));
        assert_eq!(tags.get_string("Comment").as_deref(), Some("made by hand | second"));
    }

    #[test]
    fn stray_bytes_are_skipped() {
        let mut data = header(1, 1);
        data.extend_from_slice(&[0x00, 0x99]);
        data.extend(image(&[1]));
        data.push(0x3B);
        let meta = decoded(&data);
        assert_eq!(meta.tags.get_string("FrameCount").as_deref(), Some("1"));
        assert!(!meta.truncated);
    }

    #[test]
    fn short_header_keeps_version() {
        let meta = decoded(b"GIF87a\x01\x00");
        assert!(meta.truncated);
        assert_eq!(meta.tags.get_string("Version").as_deref(), Some("GIF87a"));
        assert!(!meta.tags.contains("Width"));
    }

    // ── Redact ──

    #[test]
    fn keeps_timing_loop_and_images() {
        let data = animated();
        let out = redact(&data).unwrap();
        let mut expected = header(10, 20);
        expected.extend(application(b"NETSCAPE2.0", &[1, 0, 0]));
        expected.extend(graphic_control(10, 0));
        expected.extend(image(&[0x44, 0x01]));
        expected.extend(graphic_control(25, 3));
        expected.extend(image(&[0x55, 0x02]));
        expected.push(0x3B);
        assert_eq!(out.data, expected);
        assert_eq!(out.removed, data.len() - expected.len());
    }

    #[test]
    fn plain_text_extension_is_kept() {
        let mut data = header(1, 1);
        let plain = [0x21, 0x01, 12, 0, 0, 0, 0, 8, 0, 8, 0, 4, 4, 1, 0, 2, b'h', b'i', 0];
        data.extend_from_slice(&plain);
        data.push(0x3B);
        let out = redact(&data).unwrap();
        assert_eq!(out.data, data);
        assert_eq!(out.removed, 0);
    }

    #[test]
    fn truncated_input_gets_trailer() {
        let data = animated();
        let cut = &data[..data.len() - 20];
        let out = redact(cut).unwrap();
        assert_eq!(out.data.last(), Some(&0x3B));
        let stream = walk(&out.data).unwrap();
        assert!(!stream.truncated);
        assert_eq!(stream.image_count(), 1);
    }

    #[test]
    fn missing_color_table_is_an_error() {
        let data = header(1, 1);
        assert!(matches!(redact(&data[..15]), Err(Error::TruncatedStructure { .. })));
        assert!(matches!(redact(b"GIF89a\x01\x00"), Err(Error::TruncatedStructure { .. })));
    }
}
