//! IPTC-IIM records inside a Photoshop APP13 segment.

use crate::cursor::{Cursor, Endian};
use crate::tags::{TagDictionary, TagValue};

/// APP13 signature preceding the 8BIM resource list.
pub const PHOTOSHOP_SIGNATURE: &[u8] = b"Photoshop 3.0\0";

const RESOURCE_SIGNATURE: &[u8] = b"8BIM";
const IPTC_RESOURCE: u16 = 0x0404;

const TAG_MARKER: u8 = 0x1C;
const APPLICATION_RECORD: u8 = 2;

/// Application record (2:xx) datasets reported as tags.
fn dataset_name(dataset: u8) -> Option<&'static str> {
    Some(match dataset {
        0x05 => "IPTC:Title",
        0x19 => "IPTC:Keywords",
        0x37 => "IPTC:DateCreated",
        0x50 => "IPTC:Byline",
        0x5A => "IPTC:City",
        0x65 => "IPTC:Country",
        0x74 => "IPTC:Copyright",
        0x78 => "IPTC:Caption",
        _ => return None,
    })
}

/// Find the IPTC-IIM block (resource 0x0404) in a list of 8BIM resources.
///
/// `data` starts right after [`PHOTOSHOP_SIGNATURE`].
pub fn find_iim(data: &[u8]) -> Option<&[u8]> {
    let mut cur = Cursor::new(data);
    while cur.remaining() >= 12 {
        if cur.take(4)? != RESOURCE_SIGNATURE {
            log::debug!("8BIM walk stopped at offset {}", cur.pos() - 4);
            return None;
        }
        let id = cur.read_u16(Endian::Big)?;
        // Pascal name, padded so that length byte + name is even.
        let name_len = usize::from(cur.read_u8()?);
        cur.skip(name_len + (name_len + 1) % 2)?;
        let len = cur.read_u32(Endian::Big)? as usize;
        let body = cur.take(len)?;
        if id == IPTC_RESOURCE {
            return Some(body);
        }
        if len % 2 == 1 {
            cur.skip(1)?;
        }
    }
    None
}

/// Decode application-record datasets from an IIM block.
///
/// Repeated keywords are joined with `", "`; for other datasets the last one
/// wins. Returns the number of datasets decoded.
pub fn decode_iim(iim: &[u8], tags: &mut TagDictionary) -> usize {
    let mut cur = Cursor::new(iim);
    let mut keywords = Vec::new();
    let mut found = 0;

    while let Some(marker) = cur.read_u8() {
        if marker != TAG_MARKER {
            continue;
        }
        let (Some(record), Some(dataset), Some(size)) =
            (cur.read_u8(), cur.read_u8(), cur.read_u16(Endian::Big))
        else {
            break;
        };
        if size & 0x8000 != 0 {
            log::debug!("extended IIM dataset 2:{dataset} not supported");
            break;
        }
        let Some(value) = cur.take(usize::from(size)) else {
            log::debug!("IIM dataset {record}:{dataset} truncated");
            break;
        };
        if record != APPLICATION_RECORD {
            continue;
        }
        let Some(name) = dataset_name(dataset) else {
            continue;
        };
        let text = String::from_utf8_lossy(value).trim().to_string();
        if dataset == 0x19 {
            keywords.push(text);
        } else {
            tags.insert(name, TagValue::Text(text));
        }
        found += 1;
    }

    if !keywords.is_empty() {
        tags.insert("IPTC:Keywords", TagValue::Text(keywords.join(", ")));
    }
    found
}

/// Decode the payload of an APP13 segment, signature included.
pub fn decode_app13(payload: &[u8], tags: &mut TagDictionary) -> usize {
    let Some(resources) = payload.strip_prefix(PHOTOSHOP_SIGNATURE) else {
        return 0;
    };
    find_iim(resources).map_or(0, |iim| decode_iim(iim, tags))
}

#[cfg(test)]
pub(crate) fn build_app13(records: &[(u8, &str)]) -> Vec<u8> {
    let mut iim = vec![TAG_MARKER, 2, 0, 0, 2, 0, 2];
    for &(dataset, value) in records {
        iim.extend_from_slice(&[TAG_MARKER, 2, dataset]);
        iim.extend_from_slice(&(value.len() as u16).to_be_bytes());
        iim.extend_from_slice(value.as_bytes());
    }

    let mut out = PHOTOSHOP_SIGNATURE.to_vec();
    // An unrelated resource first, with an odd-length name and odd body.
    out.extend_from_slice(RESOURCE_SIGNATURE);
    out.extend_from_slice(&0x03EDu16.to_be_bytes());
    out.extend_from_slice(&[2, b'a', b'b', 0]);
    out.extend_from_slice(&3u32.to_be_bytes());
    out.extend_from_slice(&[1, 2, 3, 0]);

    out.extend_from_slice(RESOURCE_SIGNATURE);
    out.extend_from_slice(&IPTC_RESOURCE.to_be_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&(iim.len() as u32).to_be_bytes());
    out.extend_from_slice(&iim);
    if iim.len() % 2 == 1 {
        out.push(0);
    }
    out
}
