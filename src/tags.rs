//! Typed tag dictionary produced by every decoder.
//!
//! Decoders insert a [`TagKey`] and a [`TagValue`]; values only become
//! display strings through their `Display` impls, at the presentation
//! boundary.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Tag namespace for keys that have no fixed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// IFD0, ExifIFD and IFD1 share the TIFF/EXIF tag numbering.
    Exif,
    Gps,
    Interop,
}

/// Name of one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKey {
    /// Fixed name from a format's tag table.
    Named(&'static str),
    /// Free-form name taken from the file, e.g. a PNG text keyword.
    Keyword(String),
    /// Numeric tag with no name in the tables.
    Unknown { namespace: Namespace, id: u16 },
}

impl TagKey {
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            TagKey::Named(name) => Cow::Borrowed(*name),
            TagKey::Keyword(name) => Cow::Borrowed(name.as_str()),
            TagKey::Unknown { namespace: Namespace::Gps, id } => {
                Cow::Owned(format!("GPSTag0x{id:04X}"))
            }
            TagKey::Unknown { namespace: Namespace::Interop, id } => {
                Cow::Owned(format!("InteropTag0x{id:04X}"))
            }
            TagKey::Unknown { namespace: Namespace::Exif, id } => {
                Cow::Owned(format!("Tag0x{id:04X}"))
            }
        }
    }
}

impl From<&'static str> for TagKey {
    fn from(name: &'static str) -> Self {
        TagKey::Named(name)
    }
}

impl From<String> for TagKey {
    fn from(name: String) -> Self {
        TagKey::Keyword(name)
    }
}

/// Unit attached to a [`TagValue::Measure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Pixels,
    BitsPerPixel,
    Bytes,
    Colors,
    Bits,
}

/// Signed rational as stored in TIFF (`RATIONAL` / `SRATIONAL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: i64,
    pub den: i64,
}

/// Rendered as stored, including a zero denominator.
impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Decoded value of one tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Int(i64),
    Ints(Vec<i64>),
    Rationals(Vec<Rational>),
    Real { value: f64, precision: usize },
    Reals(Vec<f64>),
    /// Chromaticity pair, five decimals each.
    Point(f64, f64),
    Text(String),
    Hex { value: u64, width: usize },
    Measure(u64, Unit),
    /// Cumulative animation delay and the frame count it covers.
    Duration { millis: u64, frames: usize },
    /// Payload that is not shown, only counted.
    Bytes(usize),
    Present,
}

impl TagValue {
    pub fn text(s: impl Into<String>) -> Self {
        TagValue::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TagValue::Int(v) => Some(*v),
            TagValue::Measure(v, _) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Int(v) => write!(f, "{v}"),
            TagValue::Ints(v) => join(f, v),
            TagValue::Rationals(v) => join(f, v),
            TagValue::Real { value, precision } => write!(f, "{:.*}", *precision, value),
            TagValue::Reals(v) => join(f, v),
            TagValue::Point(x, y) => write!(f, "{x:.5} {y:.5}"),
            TagValue::Text(s) => f.write_str(s),
            TagValue::Hex { value, width } => write!(f, "0x{:0width$x}", value, width = *width),
            TagValue::Measure(v, unit) => match unit {
                Unit::Pixels => write!(f, "{v} px"),
                Unit::BitsPerPixel => write!(f, "{v} bpp"),
                Unit::Bytes => write!(f, "{v} bytes"),
                Unit::Colors => write!(f, "{v} colors"),
                Unit::Bits => write!(f, "{v}-bit"),
            },
            TagValue::Duration { millis, frames } => write!(f, "{millis}ms ({frames} frames)"),
            TagValue::Bytes(len) => write!(f, "data:{len} bytes"),
            TagValue::Present => f.write_str("present"),
        }
    }
}

/// Tag name → value mapping for one decoded file. Last write wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagDictionary {
    entries: BTreeMap<String, TagValue>,
}

impl TagDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<TagKey>, value: TagValue) {
        let key = key.into();
        self.entries.insert(key.name().into_owned(), value);
    }

    /// Insert unless the key is already present.
    pub fn insert_first(&mut self, key: impl Into<TagKey>, value: TagValue) {
        let key = key.into();
        self.entries.entry(key.name().into_owned()).or_insert(value);
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.entries.get(name)
    }

    /// Display string of a tag, if present.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).map(ToString::to_string)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
