use flate2::read::ZlibDecoder;
use std::io::Read;

/// Inflate a zlib stream, refusing output larger than `limit` bytes.
///
/// Returns `None` on a corrupt stream or when the limit is exceeded, so a
/// small chunk cannot expand into an unbounded allocation.
pub fn inflate(data: &[u8], limit: usize) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let cap = u64::try_from(limit).ok()?.saturating_add(1);
    let mut decoder = ZlibDecoder::new(data).take(cap);
    if let Err(e) = decoder.read_to_end(&mut out) {
        log::debug!("zlib stream rejected: {e}");
        return None;
    }
    if out.len() > limit {
        log::debug!("zlib stream exceeds {limit} bytes, ignored");
        return None;
    }
    Some(out)
}

#[cfg(test)]
pub(crate) fn deflate(data: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}
