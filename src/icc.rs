//! Fixed-offset fields of an ICC profile header (ICC.1, 128 bytes).
//!
//! Only the header is read; the tag table and the curves behind it are not.

use crate::cursor::{Endian, printable_ascii};
use crate::tags::{TagDictionary, TagValue};

pub const HEADER_LEN: usize = 128;

/// Four-character signature fields, by offset.
const SIGNATURES: &[(usize, &str)] = &[
    (4, "ProfileCMMType"),
    (12, "ProfileClass"),
    (16, "ColorSpaceData"),
    (20, "ProfileConnectionSpace"),
    (36, "ProfileFileSignature"),
    (40, "PrimaryPlatform"),
    (48, "DeviceManufacturer"),
    (52, "DeviceModel"),
    (80, "ProfileCreator"),
];

/// Decode the profile header into `tags`.
///
/// Returns `false`, leaving `tags` untouched, when the profile is shorter than
/// a header.
pub fn decode_header(profile: &[u8], tags: &mut TagDictionary) -> bool {
    if profile.len() < HEADER_LEN {
        log::debug!("ICC profile too short: {} bytes", profile.len());
        return false;
    }

    for &(offset, name) in SIGNATURES {
        let sig = printable_ascii(&profile[offset..offset + 4]);
        if !sig.is_empty() {
            tags.insert(name, TagValue::Text(sig));
        }
    }

    // Major in byte 8, minor and bug-fix as the nibbles of byte 9.
    let (major, minor_fix) = (profile[8], profile[9]);
    tags.insert(
        "ProfileVersion",
        TagValue::Text(format!("{}.{}.{}", major, minor_fix >> 4, minor_fix & 0x0F)),
    );

    let field = |i: usize| Endian::Big.read_u16(profile, 24 + i * 2).unwrap_or(0);
    tags.insert(
        "ProfileDateTime",
        TagValue::Text(format!(
            "{:04}:{:02}:{:02} {:02}:{:02}:{:02}",
            field(0),
            field(1),
            field(2),
            field(3),
            field(4),
            field(5)
        )),
    );

    let id = &profile[84..100];
    if id.iter().any(|&b| b != 0) {
        let hex: String = id.iter().map(|b| format!("{b:02x}")).collect();
        tags.insert("ProfileID", TagValue::Text(hex));
    }
    true
}

#[cfg(test)]
pub(crate) fn sample_profile() -> Vec<u8> {
    let mut p = vec![0u8; 132];
    p[0..4].copy_from_slice(&132u32.to_be_bytes());
    p[4..8].copy_from_slice(b"lcms");
    p[8] = 4;
    p[9] = 0x30;
    p[12..16].copy_from_slice(b"mntr");
    p[16..20].copy_from_slice(b"RGB ");
    p[20..24].copy_from_slice(b"XYZ ");
    for (i, v) in [2024u16, 3, 9, 14, 5, 7].iter().enumerate() {
        p[24 + i * 2..26 + i * 2].copy_from_slice(&v.to_be_bytes());
    }
    p[36..40].copy_from_slice(b"acsp");
    p[40..44].copy_from_slice(b"APPL");
    p[48..52].copy_from_slice(b"APPL");
    p[80..84].copy_from_slice(b"lcms");
    p
}
