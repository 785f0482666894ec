//! GPS rational lists to decimal degrees.
//!
//! EXIF stores latitude and longitude as three rationals (degrees, minutes,
//! seconds) plus a hemisphere reference. The decoder renders them as
//! `"num/den, num/den, num/den"`; this module turns that back into a signed
//! decimal coordinate.

use std::fmt;

use crate::tags::TagDictionary;

/// Decimal coordinates extracted from the GPS IFD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Parse one `num/den` rational. Zero denominators are rejected.
pub fn parse_rational(s: &str) -> Option<f64> {
    let (num, den) = s.trim().split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Parse a comma-separated list of rationals.
pub fn parse_rational_list(s: &str) -> Option<Vec<f64>> {
    s.split(',').map(parse_rational).collect()
}

/// `deg + min/60 + sec/3600`.
pub fn dms_to_decimal(dms: &[f64]) -> Option<f64> {
    match dms {
        [deg, min, sec] => Some(deg + min / 60.0 + sec / 3600.0),
        _ => None,
    }
}

fn signed_coordinate(dms: &str, reference: &str, negative: char) -> Option<f64> {
    let value = dms_to_decimal(&parse_rational_list(dms)?)?;
    let reference = reference.trim();
    if reference.starts_with(negative) {
        Some(-value)
    } else {
        Some(value)
    }
}

impl GpsCoordinates {
    /// Build coordinates from the four rendered GPS strings.
    ///
    /// Returns `None` unless both coordinates are three well-formed rationals.
    pub fn from_parts(latitude: &str, latitude_ref: &str, longitude: &str, longitude_ref: &str) -> Option<Self> {
        Some(Self {
            latitude: signed_coordinate(latitude, latitude_ref, 'S')?,
            longitude: signed_coordinate(longitude, longitude_ref, 'W')?,
        })
    }

    /// Look up GPSLatitude, GPSLatitudeRef, GPSLongitude and GPSLongitudeRef.
    /// All four must be present.
    pub fn from_tags(tags: &TagDictionary) -> Option<Self> {
        let lat = tags.get_string("GPSLatitude")?;
        let lat_ref = tags.get_string("GPSLatitudeRef")?;
        let lon = tags.get_string("GPSLongitude")?;
        let lon_ref = tags.get_string("GPSLongitudeRef")?;
        Self::from_parts(&lat, &lat_ref, &lon, &lon_ref)
    }

    /// OpenStreetMap link centred on the coordinates.
    pub fn map_link(&self) -> String {
        format!(
            "https://www.openstreetmap.org/?mlat={lat:.6}&mlon={lon:.6}#map=15/{lat:.6}/{lon:.6}",
            lat = self.latitude,
            lon = self.longitude
        )
    }
}

impl fmt::Display for GpsCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagValue;

    #[test]
    fn eiffel_tower_latitude() {
        let north = signed_coordinate("48/1, 51/1, 2964/100", "N", 'S').unwrap();
        assert!((north - 48.858233).abs() < 1e-6, "{north}");
        let south = signed_coordinate("48/1, 51/1, 2964/100", "S", 'S').unwrap();
        assert_eq!(south, -north);
    }

    #[test]
    fn west_longitude_is_negative() {
        let gps = GpsCoordinates::from_parts("48/1, 51/1, 0/1", "N", "2/1, 17/1, 0/1", "W").unwrap();
        assert!(gps.longitude < 0.0);
        assert!((gps.longitude + 2.283333).abs() < 1e-6);
    }

    #[test]
    fn zero_denominator_rejected() {
        assert_eq!(parse_rational("1/0"), None);
        assert!(GpsCoordinates::from_parts("48/1, 0/0, 1/1", "N", "2/1, 1/1, 1/1", "E").is_none());
        assert!(GpsCoordinates::from_parts("48/1, 5/0, 1/1", "N", "2/1, 1/1, 1/1", "E").is_none());
    }

    #[test]
    fn wrong_arity_rejected() {
        assert!(GpsCoordinates::from_parts("48/1, 51/1", "N", "2/1, 1/1, 1/1", "E").is_none());
        assert!(parse_rational("48").is_none());
    }

    #[test]
    fn requires_all_four_tags() {
        let mut tags = TagDictionary::new();
        tags.insert("GPSLatitude", TagValue::text("48/1, 51/1, 2964/100"));
        tags.insert("GPSLatitudeRef", TagValue::text("N"));
        tags.insert("GPSLongitude", TagValue::text("2/1, 17/1, 4014/100"));
        assert!(GpsCoordinates::from_tags(&tags).is_none());

        tags.insert("GPSLongitudeRef", TagValue::text("E"));
        let gps = GpsCoordinates::from_tags(&tags).unwrap();
        assert_eq!(gps.to_string(), "48.858233, 2.294483");
        assert!(gps.map_link().starts_with("https://www.openstreetmap.org/?mlat=48.858233&mlon=2.294483"));
    }
}
