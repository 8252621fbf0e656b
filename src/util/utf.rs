//! UTF-16-with-BOM detection and conversion.
//!
//! EPUB content documents are required to be UTF-8, but real-world content
//! sometimes ships UTF-16 anyway; converting rather than rejecting outright
//! keeps well-formedness checks meaningful instead of failing every such
//! document at the encoding step.

use std::fmt;

/// A document's bytes could not be decoded as UTF-8 or recognized UTF-16.
#[derive(Debug)]
pub(crate) enum UtfError {
    InvalidUtf8(std::string::FromUtf8Error),
    UnevenByteCount(usize),
    UndecodableUtf16(std::char::DecodeUtf16Error),
}

impl fmt::Display for UtfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUtf8(e) => write!(f, "invalid UTF-8: {e}"),
            Self::UnevenByteCount(n) => write!(f, "odd byte count for UTF-16 content: {n}"),
            Self::UndecodableUtf16(e) => write!(f, "invalid UTF-16 sequence: {e}"),
        }
    }
}

impl std::error::Error for UtfError {}

/// Converts `data` to a UTF-8 string, transcoding from UTF-16 first if a BOM is present.
pub(crate) fn into_utf8_str(data: Vec<u8>) -> Result<String, UtfError> {
    if is_utf16(&data) {
        from_utf16(&data)
    } else {
        String::from_utf8(data).map_err(UtfError::InvalidUtf8)
    }
}

/// Checks if a UTF-16 byte order mark (BOM) exists at the start of `data`.
fn is_utf16(data: &[u8]) -> bool {
    data.starts_with(b"\xFF\xFE") || data.starts_with(b"\xFE\xFF")
}

fn from_utf16(data: &[u8]) -> Result<String, UtfError> {
    if data.len() % 2 != 0 {
        return Err(UtfError::UnevenByteCount(data.len()));
    }
    let chunks: Vec<[u8; 2]> = data.chunks_exact(2).map(|c| [c[0], c[1]]).collect();
    let (endian, start): (fn([u8; 2]) -> u16, usize) = match chunks.first() {
        Some(&[0xFF, 0xFE]) => (u16::from_le_bytes, 1),
        Some(&[0xFE, 0xFF]) => (u16::from_be_bytes, 1),
        _ => (u16::from_be_bytes, 0),
    };
    let utf16 = chunks[start..].iter().copied().map(endian);

    char::decode_utf16(utf16)
        .collect::<Result<String, _>>()
        .map_err(UtfError::UndecodableUtf16)
}
