//! Pattern extraction of a few well-known XMP properties.
//!
//! The packet is not parsed as XML. Each property is located by element name,
//! either as `<ns:prop ...>value</ns:prop>` (optionally wrapped in
//! `rdf:Alt`/`rdf:Seq`/`rdf:li`) or as an attribute `ns:prop="value"`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::tags::{TagDictionary, TagValue};

/// APP1 signature of an XMP packet in JPEG.
pub const JPEG_SIGNATURE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// PNG text keyword under which XMP packets are stored.
pub const PNG_KEYWORD: &str = "XML:com.adobe.xmp";

const DESCRIPTIVE: &[(&str, &str)] = &[
    ("XMP:Title", "dc:title"),
    ("XMP:Creator", "dc:creator"),
    ("XMP:Description", "dc:description"),
    ("XMP:Rating", "xmp:Rating"),
];

const GEOMETRY: &[(&str, &str)] = &[
    ("XMP:PixelXDimension", "exif:PixelXDimension"),
    ("XMP:PixelYDimension", "exif:PixelYDimension"),
    ("XMP:Orientation", "tiff:Orientation"),
];

fn property_regex(element: &str) -> Option<Regex> {
    let element = regex_lite::escape(element);
    let pattern = format!(
        r#"<{element}(?:\s[^>]*)?>\s*(?:<[^/>][^>]*>\s*)*([^<]+)<|{element}="([^"]*)""#
    );
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::debug!("bad XMP pattern for {element}: {e}");
            None
        }
    }
}

/// Compiled patterns for every property this module extracts.
static PATTERNS: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    DESCRIPTIVE
        .iter()
        .chain(GEOMETRY)
        .filter_map(|&(_, element)| Some((element, property_regex(element)?)))
        .collect()
});

fn first_value(re: &Regex, xmp: &str) -> Option<String> {
    re.captures_iter(xmp).find_map(|caps| {
        let value = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// First value of `element` in the packet, trimmed. Empty values are ignored.
pub fn find_property(xmp: &str, element: &str) -> Option<String> {
    match PATTERNS.get(element) {
        Some(re) => first_value(re, xmp),
        None => first_value(&property_regex(element)?, xmp),
    }
}

fn extract(xmp: &str, fields: &[(&'static str, &str)], tags: &mut TagDictionary) -> usize {
    let mut found = 0;
    for &(key, element) in fields {
        if let Some(value) = find_property(xmp, element) {
            tags.insert(key, TagValue::Text(value));
            found += 1;
        }
    }
    found
}

/// Title, creator, description and rating. Returns how many were found.
pub fn extract_descriptive(xmp: &str, tags: &mut TagDictionary) -> usize {
    extract(xmp, DESCRIPTIVE, tags)
}

/// Pixel dimensions and orientation, as written by image editors into PNG.
pub fn extract_geometry(xmp: &str, tags: &mut TagDictionary) -> usize {
    extract(xmp, GEOMETRY, tags)
}
