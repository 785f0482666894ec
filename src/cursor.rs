//! Bounded byte access shared by every decoder.
//!
//! All reads are checked against the slice length and return `None` instead
//! of panicking, so a hostile length or offset can never index out of bounds.

/// Byte order of a multi-byte field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    #[inline]
    pub fn read_u16(self, data: &[u8], offset: usize) -> Option<u16> {
        let bytes: [u8; 2] = data.get(offset..offset.checked_add(2)?)?.try_into().ok()?;
        Some(match self {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        })
    }

    #[inline]
    pub fn read_u32(self, data: &[u8], offset: usize) -> Option<u32> {
        let bytes: [u8; 4] = data.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
        Some(match self {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        })
    }

    #[inline]
    pub fn read_u64(self, data: &[u8], offset: usize) -> Option<u64> {
        let bytes: [u8; 8] = data.get(offset..offset.checked_add(8)?)?.try_into().ok()?;
        Some(match self {
            Endian::Little => u64::from_le_bytes(bytes),
            Endian::Big => u64::from_be_bytes(bytes),
        })
    }
}

/// Forward-only reader over a byte slice.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Some(b)
    }

    pub fn read_u16(&mut self, endian: Endian) -> Option<u16> {
        let v = endian.read_u16(self.data, self.pos)?;
        self.pos += 2;
        Some(v)
    }

    pub fn read_u32(&mut self, endian: Endian) -> Option<u32> {
        let v = endian.read_u32(self.data, self.pos)?;
        self.pos += 4;
        Some(v)
    }

    /// Take `len` bytes, or nothing at all when fewer remain.
    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    pub fn skip(&mut self, len: usize) -> Option<()> {
        self.take(len).map(|_| ())
    }
}

/// Split `data` at the first NUL, returning the bytes before it and after it.
pub fn split_nul(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let idx = data.iter().position(|&b| b == 0)?;
    Some((&data[..idx], &data[idx + 1..]))
}

/// Decode ISO-8859-1 bytes (PNG text chunks, IPTC without a charset marker).
pub fn latin1(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}

/// Keep printable ASCII only, trimmed. Used for fixed four-character codes.
pub fn printable_ascii(data: &[u8]) -> String {
    let s: String = data
        .iter()
        .filter(|&&b| (32..127).contains(&b))
        .map(|&b| b as char)
        .collect();
    s.trim().to_string()
}
