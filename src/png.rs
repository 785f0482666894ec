//! PNG chunk walker, decoder and redactor.
//!
//! A PNG file is the 8-byte signature followed by chunks:
//! 4-byte big-endian length, 4-byte type, data, 4-byte CRC. The CRC is
//! never checked.

use std::ops::Range;

use crate::config::DecodeOptions;
use crate::cursor::{Endian, latin1, split_nul};
use crate::error::{Error, Result};
use crate::format::{ImageFormat, PNG_SIGNATURE};
use crate::metadata::{Dimensions, Metadata, Redaction};
use crate::tags::{TagDictionary, TagKey, TagValue, Unit};
use crate::{exif, icc, inflate, xmp};

const BE: Endian = Endian::Big;
/// Length, type and CRC.
const FRAMING_LEN: usize = 12;

/// Chunks copied by the redactor.
const CRITICAL: [&[u8; 4]; 3] = [b"IHDR", b"IDAT", b"IEND"];
const IEND_CHUNK: [u8; 12] = [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82];

const ZLIB_ERROR: &str = "[zlib error]";

/// One complete chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub kind: [u8; 4],
    pub data: &'a [u8],
    /// Whole chunk, length field through CRC.
    pub span: Range<usize>,
}

impl Chunk<'_> {
    pub fn kind_str(&self) -> &str {
        std::str::from_utf8(&self.kind).unwrap_or("????")
    }
}

#[derive(Debug, Clone)]
pub struct ChunkStream<'a> {
    pub chunks: Vec<Chunk<'a>>,
    /// The walk ended before an IEND chunk.
    pub truncated: bool,
}

/// Walk the chunk list up to IEND. Fails only on a signature mismatch.
///
/// A chunk whose declared length runs past the end of the buffer ends the
/// walk; chunks before it are still listed.
pub fn walk(data: &[u8]) -> Result<ChunkStream<'_>> {
    if !data.starts_with(PNG_SIGNATURE) {
        return Err(Error::UnrecognizedFormat);
    }
    let mut stream = ChunkStream { chunks: Vec::new(), truncated: true };
    let mut pos = PNG_SIGNATURE.len();

    while let Some(length) = BE.read_u32(data, pos) {
        let end = (length as usize)
            .checked_add(pos + FRAMING_LEN)
            .filter(|&end| end <= data.len());
        let Some(end) = end else {
            log::debug!("PNG chunk at {pos} declares {length} bytes, past end of file");
            break;
        };
        let mut kind = [0u8; 4];
        kind.copy_from_slice(&data[pos + 4..pos + 8]);
        let chunk = Chunk { kind, data: &data[pos + 8..end - 4], span: pos..end };
        let is_end = &chunk.kind == b"IEND";
        stream.chunks.push(chunk);
        pos = end;
        if is_end {
            stream.truncated = false;
            break;
        }
    }
    if stream.truncated {
        log::debug!("PNG chunk walk stopped at {pos} without IEND");
    }
    Ok(stream)
}

/// Image header fields.
#[derive(Debug, Clone, Copy)]
struct Header {
    width: u32,
    height: u32,
    bit_depth: u8,
    color_type: u8,
    compression: u8,
    filter: u8,
    interlace: u8,
}

impl Header {
    fn parse(data: &[u8]) -> Option<Self> {
        let &[bit_depth, color_type, compression, filter, interlace] = data.get(8..13)? else {
            return None;
        };
        Some(Self {
            width: BE.read_u32(data, 0)?,
            height: BE.read_u32(data, 4)?,
            bit_depth,
            color_type,
            compression,
            filter,
            interlace,
        })
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions { width: self.width, height: self.height }
    }

    fn tags(&self, tags: &mut TagDictionary) {
        let dims = self.dimensions();
        tags.insert("Width", TagValue::Measure(u64::from(self.width), Unit::Pixels));
        tags.insert("Height", TagValue::Measure(u64::from(self.height), Unit::Pixels));
        tags.insert("BitDepth", TagValue::Int(i64::from(self.bit_depth)));
        tags.insert("ColorType", TagValue::Text(color_type_name(self.color_type)));
        tags.insert("ImageSize", TagValue::Text(dims.to_string()));
        tags.insert("Megapixels", TagValue::Real { value: dims.megapixels(), precision: 1 });
        let compression = match self.compression {
            0 => "Deflate/Inflate".to_string(),
            n => format!("Unknown ({n})"),
        };
        tags.insert("Compression", TagValue::Text(compression));
        let filter = match self.filter {
            0 => "Adaptive".to_string(),
            n => format!("Unknown ({n})"),
        };
        tags.insert("Filter", TagValue::Text(filter));
        let interlace = match self.interlace {
            0 => "Noninterlaced".to_string(),
            1 => "Adam7 Interlace".to_string(),
            n => format!("Unknown ({n})"),
        };
        tags.insert("Interlace", TagValue::Text(interlace));
    }
}

fn color_type_name(color_type: u8) -> String {
    match color_type {
        0 => "Grayscale".to_string(),
        2 => "RGB".to_string(),
        3 => "Indexed".to_string(),
        4 => "Grayscale+Alpha".to_string(),
        6 => "RGB with Alpha".to_string(),
        n => format!("Unknown ({n})"),
    }
}

/// Decode every ancillary chunk up to IEND or the first overrunning chunk.
pub fn decode(data: &[u8], options: &DecodeOptions) -> Result<Metadata> {
    let stream = walk(data)?;
    let mut meta = Metadata::new(ImageFormat::Png);
    meta.truncated = stream.truncated;

    let mut header = None;
    for chunk in &stream.chunks {
        let tags = &mut meta.tags;
        let body = chunk.data;
        match &chunk.kind {
            b"IHDR" => {
                header = Header::parse(body);
                if header.is_none() {
                    log::debug!("PNG IHDR too short: {} bytes", body.len());
                }
            }
            b"PLTE" => tags.insert("PaletteSize", TagValue::Measure((body.len() / 3) as u64, Unit::Colors)),
            b"hIST" => tags.insert("HistogramEntries", TagValue::Int((body.len() / 2) as i64)),
            b"tIME" => decode_time(body, tags),
            b"pHYs" => decode_physical(body, tags),
            b"gAMA" => {
                if let (4, Some(gamma)) = (body.len(), BE.read_u32(body, 0)) {
                    tags.insert("Gamma", TagValue::Real { value: f64::from(gamma) / 100_000.0, precision: 4 });
                }
            }
            b"cHRM" => decode_chromaticities(body, tags),
            b"sRGB" => {
                if let &[intent] = body {
                    decode_srgb(intent, tags);
                }
            }
            b"bKGD" => decode_background(body, header.map(|h| h.color_type), tags),
            b"tRNS" => decode_transparency(body, header.map(|h| h.color_type), tags),
            b"tEXt" => decode_text(body, tags),
            b"zTXt" => decode_compressed_text(body, options, tags),
            b"iTXt" => decode_international_text(body, options, tags),
            b"iCCP" => decode_icc(body, options, tags),
            b"eXIf" => {
                if exif::decode_tiff(body, options, tags).is_some_and(|outcome| outcome.truncated) {
                    meta.truncated = true;
                }
            }
            _ => {}
        }
    }

    if let Some(header) = header {
        header.tags(&mut meta.tags);
        meta.dimensions = Some(header.dimensions());
    }
    Ok(meta)
}

fn decode_time(body: &[u8], tags: &mut TagDictionary) {
    let (Some(year), &[_, _, month, day, hour, minute, second]) = (BE.read_u16(body, 0), body) else {
        return;
    };
    tags.insert(
        "ModificationTime",
        TagValue::Text(format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")),
    );
}

fn decode_physical(body: &[u8], tags: &mut TagDictionary) {
    let (9, Some(x), Some(y)) = (body.len(), BE.read_u32(body, 0), BE.read_u32(body, 4)) else {
        return;
    };
    tags.insert("PixelsPerUnitX", TagValue::Int(i64::from(x)));
    tags.insert("PixelsPerUnitY", TagValue::Int(i64::from(y)));
    let unit = match body[8] {
        0 => "unspecified".to_string(),
        1 => "meters".to_string(),
        n => format!("unit={n}"),
    };
    tags.insert("PixelUnits", TagValue::Text(unit));
}

fn decode_chromaticities(body: &[u8], tags: &mut TagDictionary) {
    const POINTS: [&str; 4] = ["WhitePoint", "RedPrimary", "GreenPrimary", "BluePrimary"];
    if body.len() != 32 {
        return;
    }
    for (i, name) in POINTS.into_iter().enumerate() {
        let (Some(x), Some(y)) = (BE.read_u32(body, i * 8), BE.read_u32(body, i * 8 + 4)) else {
            continue;
        };
        tags.insert(name, TagValue::Point(f64::from(x) / 100_000.0, f64::from(y) / 100_000.0));
    }
}

fn decode_srgb(intent: u8, tags: &mut TagDictionary) {
    const INTENTS: [&str; 4] = ["Perceptual", "RelativeColorimetric", "Saturation", "AbsoluteColorimetric"];
    if let Some(name) = INTENTS.get(usize::from(intent)) {
        tags.insert("sRGBRenderingIntent", TagValue::text(*name));
    }
}

fn u16_samples(body: &[u8], count: usize) -> Option<Vec<i64>> {
    (0..count).map(|i| BE.read_u16(body, i * 2).map(i64::from)).collect()
}

fn decode_background(body: &[u8], color_type: Option<u8>, tags: &mut TagDictionary) {
    match color_type {
        Some(0 | 4) => {
            if let Some(gray) = BE.read_u16(body, 0) {
                tags.insert("BackgroundGray", TagValue::Int(i64::from(gray)));
            }
        }
        Some(2 | 6) => {
            if let Some(rgb) = u16_samples(body, 3) {
                tags.insert("BackgroundRGB", TagValue::Ints(rgb));
            }
        }
        Some(3) => {
            if let Some(&index) = body.first() {
                tags.insert("BackgroundPaletteIndex", TagValue::Int(i64::from(index)));
            }
        }
        _ => log::debug!("PNG bKGD without a usable IHDR, ignored"),
    }
}

fn decode_transparency(body: &[u8], color_type: Option<u8>, tags: &mut TagDictionary) {
    match color_type {
        Some(0) => {
            if let Some(gray) = BE.read_u16(body, 0) {
                tags.insert("tRNSGray", TagValue::Int(i64::from(gray)));
            }
        }
        Some(2) => {
            if let Some(rgb) = u16_samples(body, 3) {
                for (name, v) in ["tRNSRed", "tRNSGreen", "tRNSBlue"].into_iter().zip(rgb) {
                    tags.insert(name, TagValue::Int(v));
                }
            }
        }
        Some(3) => tags.insert("tRNSPaletteEntries", TagValue::Int(body.len() as i64)),
        // Not allowed with a full alpha channel; reported as-is.
        Some(4 | 6) => tags.insert("tRNSAlpha", TagValue::Bytes(body.len())),
        _ => log::debug!("PNG tRNS without a usable IHDR, ignored"),
    }
}

/// Control characters other than tab, LF and CR.
fn is_binary(data: &[u8]) -> bool {
    data.iter().any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r'))
}

fn keyword(raw: &[u8]) -> Option<String> {
    (!raw.is_empty()).then(|| latin1(raw))
}

fn decode_text(body: &[u8], tags: &mut TagDictionary) {
    let Some((raw, value)) = split_nul(body) else {
        return;
    };
    let Some(keyword) = keyword(raw) else {
        return;
    };
    if value.is_empty() {
        return;
    }
    let value = if is_binary(value) {
        TagValue::Bytes(value.len())
    } else {
        TagValue::Text(latin1(value))
    };
    tags.insert(TagKey::Keyword(keyword), value);
}

fn decode_compressed_text(body: &[u8], options: &DecodeOptions, tags: &mut TagDictionary) {
    let Some((raw, rest)) = split_nul(body) else {
        return;
    };
    let (Some(keyword), Some((_method, stream))) = (keyword(raw), rest.split_first()) else {
        return;
    };
    match inflate::inflate(stream, options.max_inflate_bytes) {
        Some(text) => {
            if keyword.starts_with("XML:") {
                let xmp = String::from_utf8_lossy(&text);
                xmp::extract_descriptive(&xmp, tags);
                xmp::extract_geometry(&xmp, tags);
            }
            tags.insert(TagKey::Keyword(keyword), TagValue::Text(latin1(&text)));
        }
        None => tags.insert(TagKey::Keyword(keyword), TagValue::text(ZLIB_ERROR)),
    }
}

/// `keyword\0 flag method language\0 translated\0 text`, UTF-8.
fn decode_international_text(body: &[u8], options: &DecodeOptions, tags: &mut TagDictionary) {
    let Some((raw, rest)) = split_nul(body) else {
        return;
    };
    let (Some(keyword), Some(&[flag, _method])) = (keyword(raw), rest.get(..2)) else {
        return;
    };
    let Some((_language, rest)) = split_nul(&rest[2..]) else {
        return;
    };
    let Some((_translated, text)) = split_nul(rest) else {
        return;
    };

    let text = if flag == 1 {
        match inflate::inflate(text, options.max_inflate_bytes) {
            Some(inflated) => String::from_utf8_lossy(&inflated).into_owned(),
            None => {
                tags.insert(TagKey::Keyword(keyword), TagValue::text(ZLIB_ERROR));
                return;
            }
        }
    } else {
        String::from_utf8_lossy(text).into_owned()
    };

    if keyword.starts_with("XML:") {
        let found = xmp::extract_descriptive(&text, tags) + xmp::extract_geometry(&text, tags);
        log::debug!("PNG iTXt {keyword}: {found} XMP properties");
    } else {
        tags.insert(TagKey::Keyword(keyword), TagValue::Text(text));
    }
}

/// `name\0 method zlib-stream`.
fn decode_icc(body: &[u8], options: &DecodeOptions, tags: &mut TagDictionary) {
    let Some((raw, rest)) = split_nul(body) else {
        return;
    };
    let Some(name) = keyword(raw) else {
        return;
    };
    tags.insert("ProfileName", TagValue::Text(name));
    let Some((0, stream)) = rest.split_first().map(|(&m, s)| (m, s)) else {
        return;
    };
    match inflate::inflate(stream, options.max_inflate_bytes) {
        Some(profile) => {
            icc::decode_header(&profile, tags);
        }
        None => tags.insert("ICCProfile", TagValue::text(ZLIB_ERROR)),
    }
}

/// Keep IHDR, IDAT and IEND byte-for-byte; drop every other chunk.
pub fn redact(data: &[u8]) -> Result<Redaction> {
    let stream = walk(data)?;
    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(PNG_SIGNATURE);
    for chunk in &stream.chunks {
        if CRITICAL.contains(&&chunk.kind) {
            out.extend_from_slice(&data[chunk.span.clone()]);
        } else {
            log::debug!("PNG: dropping {} chunk of {} bytes", chunk.kind_str(), chunk.span.len());
        }
    }
    if stream.truncated {
        out.extend_from_slice(&IEND_CHUNK);
    }
    Ok(Redaction::from_sizes(data.len(), out))
}


#[cfg(test)]
mod tests {
    use super::fixture::*;
    use super::*;
    use crate::inflate::deflate;

    fn idat() -> Vec<u8> {
        chunk(b"IDAT", &deflate(&[0, 0xFF, 0x00, 0x00]))
    }

    fn iend() -> Vec<u8> {
        chunk(b"IEND", &[])
    }

    fn decoded(data: &[u8]) -> Metadata {
        decode(data, &DecodeOptions::default()).unwrap()
    }

    fn itxt(keyword: &str, compressed: bool, text: &[u8]) -> Vec<u8> {
        let mut data = keyword.as_bytes().to_vec();
        data.extend_from_slice(&[0, u8::from(compressed), 0]);
        data.extend_from_slice(b"en\0\0");
        if compressed {
            data.extend(deflate(text));
        } else {
            data.extend_from_slice(text);
        }
        chunk(b"iTXt", &data)
    }

    // ── Walker ──

    #[test]
    fn walk_lists_chunks_until_iend() {
        let data = png(&[ihdr(2, 2, 8, 2), idat(), iend(), chunk(b"tEXt", b"After\0x")]);
        let stream = walk(&data).unwrap();
        assert!(!stream.truncated);
        let kinds: Vec<&str> = stream.chunks.iter().map(Chunk::kind_str).collect();
        assert_eq!(kinds, ["IHDR", "IDAT", "IEND"]);
    }

    #[test]
    fn overrunning_chunk_ends_walk() {
        let mut data = png(&[ihdr(2, 2, 8, 2), chunk(b"tEXt", b"Author\0me")]);
        data.extend_from_slice(&1000u32.to_be_bytes());
        data.extend_from_slice(b"tEXtshort");
        let stream = walk(&data).unwrap();
        assert!(stream.truncated);
        assert_eq!(stream.chunks.len(), 2);
    }

    #[test]
    fn rejects_other_signatures() {
        assert!(matches!(walk(b"GIF89a"), Err(Error::UnrecognizedFormat)));
        assert!(matches!(redact(b"\x89PNG"), Err(Error::UnrecognizedFormat)));
    }

    // ── Decode ──

    #[test]
    fn header_tags() {
        let meta = decoded(&png(&[ihdr(640, 480, 8, 6), idat(), iend()]));
        assert_eq!(meta.tags.get_string("Width").as_deref(), Some("640 px"));
        assert_eq!(meta.tags.get_string("Height").as_deref(), Some("480 px"));
        assert_eq!(meta.tags.get_string("BitDepth").as_deref(), Some("8"));
        assert_eq!(meta.tags.get_string("ColorType").as_deref(), Some("RGB with Alpha"));
        assert_eq!(meta.tags.get_string("ImageSize").as_deref(), Some("640x480"));
        assert_eq!(meta.tags.get_string("Megapixels").as_deref(), Some("0.3"));
        assert_eq!(meta.tags.get_string("Compression").as_deref(), Some("Deflate/Inflate"));
        assert_eq!(meta.tags.get_string("Filter").as_deref(), Some("Adaptive"));
        assert_eq!(meta.tags.get_string("Interlace").as_deref(), Some("Noninterlaced"));
        assert_eq!(meta.dimensions, Some(Dimensions { width: 640, height: 480 }));
        assert!(!meta.truncated);
    }

    #[test]
    fn no_header_tags_without_ihdr() {
        let meta = decoded(&png(&[chunk(b"tEXt", b"Author\0me"), iend()]));
        assert!(!meta.tags.contains("Width"));
        assert!(meta.dimensions.is_none());
        assert_eq!(meta.tags.get_string("Author").as_deref(), Some("me"));
    }

    #[test]
    fn ancillary_chunks() {
        let mut time = 2023u16.to_be_bytes().to_vec();
        time.extend_from_slice(&[7, 14, 9, 30, 5]);
        let mut phys = 2835u32.to_be_bytes().to_vec();
        phys.extend_from_slice(&2835u32.to_be_bytes());
        phys.push(1);
        let mut chrm = Vec::new();
        for v in [31270u32, 32900, 64000, 33000, 30000, 60000, 15000, 6000] {
            chrm.extend_from_slice(&v.to_be_bytes());
        }
        let data = png(&[
            ihdr(1, 1, 8, 2),
            chunk(b"tIME", &time),
            chunk(b"pHYs", &phys),
            chunk(b"gAMA", &50000u32.to_be_bytes()),
            chunk(b"cHRM", &chrm),
            chunk(b"sRGB", &[0]),
            chunk(b"bKGD", &[0, 255, 0, 128, 0, 0]),
            chunk(b"tRNS", &[0, 1, 0, 2, 0, 3]),
            idat(),
            iend(),
        ]);
        let tags = decoded(&data).tags;
        assert_eq!(tags.get_string("ModificationTime").as_deref(), Some("2023-07-14 09:30:05"));
        assert_eq!(tags.get_string("PixelsPerUnitX").as_deref(), Some("2835"));
        assert_eq!(tags.get_string("PixelUnits").as_deref(), Some("meters"));
        assert_eq!(tags.get_string("Gamma").as_deref(), Some("0.5000"));
        assert_eq!(tags.get_string("WhitePoint").as_deref(), Some("0.31270 0.32900"));
        assert_eq!(tags.get_string("BluePrimary").as_deref(), Some("0.15000 0.06000"));
        assert_eq!(tags.get_string("sRGBRenderingIntent").as_deref(), Some("Perceptual"));
        assert_eq!(tags.get_string("BackgroundRGB").as_deref(), Some("255, 128, 0"));
        assert_eq!(tags.get_string("tRNSRed").as_deref(), Some("1"));
        assert_eq!(tags.get_string("tRNSBlue").as_deref(), Some("3"));
    }

    #[test]
    fn palette_and_indexed_transparency() {
        let data = png(&[
            ihdr(1, 1, 8, 3),
            chunk(b"PLTE", &[0; 12]),
            chunk(b"tRNS", &[0, 128]),
            chunk(b"bKGD", &[2]),
            chunk(b"hIST", &[0; 8]),
            idat(),
            iend(),
        ]);
        let tags = decoded(&data).tags;
        assert_eq!(tags.get_string("PaletteSize").as_deref(), Some("4 colors"));
        assert_eq!(tags.get_string("tRNSPaletteEntries").as_deref(), Some("2"));
        assert_eq!(tags.get_string("BackgroundPaletteIndex").as_deref(), Some("2"));
        assert_eq!(tags.get_string("HistogramEntries").as_deref(), Some("4"));
    }

    #[test]
    fn text_chunks() {
        let mut ztxt = b"Comment\0\0".to_vec();
        ztxt.extend(deflate(b"squeezed"));
        let data = png(&[
            ihdr(1, 1, 8, 0),
            chunk(b"tEXt", b"Author\0Jos\xe9"),
            chunk(b"tEXt", b"Raw\0\x01\x02\x03"),
            chunk(b"zTXt", &ztxt),
            itxt("Title", false, "été".as_bytes()),
            itxt("Description", true, b"inflated text"),
            iend(),
        ]);
        let tags = decoded(&data).tags;
        assert_eq!(tags.get_string("Author").as_deref(), Some("José"));
        assert_eq!(tags.get_string("Raw").as_deref(), Some("data:3 bytes"));
        assert_eq!(tags.get_string("Comment").as_deref(), Some("squeezed"));
        assert_eq!(tags.get_string("Title").as_deref(), Some("été"));
        assert_eq!(tags.get_string("Description").as_deref(), Some("inflated text"));
    }

    #[test]
    fn corrupt_ztxt_reports_placeholder() {
        let data = png(&[chunk(b"zTXt", b"Comment\0\0not zlib"), iend()]);
        let tags = decoded(&data).tags;
        assert_eq!(tags.get_string("Comment").as_deref(), Some("[zlib error]"));
    }

    #[test]
    fn inflate_limit_applies() {
        let mut ztxt = b"Big\0\0".to_vec();
        ztxt.extend(deflate(&[b'a'; 4096]));
        let data = png(&[chunk(b"zTXt", &ztxt), iend()]);
        let options = DecodeOptions { max_inflate_bytes: 1024, ..DecodeOptions::default() };
        let tags = decode(&data, &options).unwrap().tags;
        assert_eq!(tags.get_string("Big").as_deref(), Some("[zlib error]"));
    }

    #[test]
    fn xmp_in_itxt() {
        let packet = br#"<x:xmpmeta><rdf:Description tiff:Orientation="1">
            <dc:title><rdf:Alt><rdf:li xml:lang="x-default">Harbour</rdf:li></rdf:Alt></dc:title>
            <exif:PixelXDimension>800</exif:PixelXDimension>
            </rdf:Description></x:xmpmeta>"#;
        let data = png(&[itxt(xmp::PNG_KEYWORD, false, packet), iend()]);
        let tags = decoded(&data).tags;
        assert_eq!(tags.get_string("XMP:Title").as_deref(), Some("Harbour"));
        assert_eq!(tags.get_string("XMP:PixelXDimension").as_deref(), Some("800"));
        assert!(!tags.contains(xmp::PNG_KEYWORD));
    }

    #[test]
    fn icc_profile() {
        let mut iccp = b"sRGB IEC61966-2.1\0\0".to_vec();
        iccp.extend(deflate(&icc::sample_profile()));
        let data = png(&[ihdr(1, 1, 8, 2), chunk(b"iCCP", &iccp), iend()]);
        let tags = decoded(&data).tags;
        assert_eq!(tags.get_string("ProfileName").as_deref(), Some("sRGB IEC61966-2.1"));
        assert_eq!(tags.get_string("ProfileCMMType").as_deref(), Some("lcms"));
        assert_eq!(tags.get_string("ProfileVersion").as_deref(), Some("4.3.0"));
    }

    #[test]
    fn exif_chunk() {
        use crate::cursor::Endian;
        use crate::exif::fixture::Tiff;

        let tiff = Tiff { endian: Endian::Big };
        let body = tiff.build(&[vec![tiff.ascii(0x010F, "Canon")]], None);
        let data = png(&[chunk(b"eXIf", &body), iend()]);
        let tags = decoded(&data).tags;
        assert_eq!(tags.get_string("Make").as_deref(), Some("Canon"));
    }

    #[test]
    fn truncated_file_keeps_earlier_tags() {
        let mut data = png(&[ihdr(4, 4, 8, 2), chunk(b"tEXt", b"Author\0me")]);
        data.extend_from_slice(&u32::MAX.to_be_bytes());
        data.extend_from_slice(b"tEXt");
        let meta = decoded(&data);
        assert!(meta.truncated);
        assert_eq!(meta.tags.get_string("Author").as_deref(), Some("me"));
        assert_eq!(meta.tags.get_string("Width").as_deref(), Some("4 px"));
    }

    // ── Redact ──

    #[test]
    fn redact_keeps_critical_chunks_only() {
        let header = ihdr(3, 2, 8, 2);
        let pixels = idat();
        let data = png(&[
            header.clone(),
            chunk(b"tEXt", b"Author\0me"),
            chunk(b"gAMA", &45455u32.to_be_bytes()),
            pixels.clone(),
            chunk(b"tIME", &[7, 231, 1, 1, 0, 0, 0]),
            iend(),
        ]);
        let r = redact(&data).unwrap();
        assert_eq!(r.data, png(&[header, pixels, iend()]));
        assert_eq!(r.removed, data.len() - r.data.len());

        let meta = decoded(&r.data);
        assert_eq!(meta.tags.get_string("ImageSize").as_deref(), Some("3x2"));
        assert!(!meta.tags.contains("Author"));
    }

    #[test]
    fn redact_appends_missing_iend() {
        let data = png(&[ihdr(1, 1, 8, 0), idat(), chunk(b"tEXt", b"A\0b")]);
        let r = redact(&data).unwrap();
        assert!(r.data.ends_with(&IEND_CHUNK));
        assert!(!walk(&r.data).unwrap().truncated);
    }

    #[test]
    fn redact_is_idempotent() {
        let data = png(&[ihdr(1, 1, 8, 0), chunk(b"tEXt", b"A\0b"), idat(), iend()]);
        let once = redact(&data).unwrap();
        let twice = redact(&once.data).unwrap();
        assert_eq!(once.data, twice.data);
        assert_eq!(twice.removed, 0);
    }
}
