//! Character encoding support for MARC records.
//!
//! MARC records can use different character encodings:
//! - **MARC-8** (legacy) — Mixed character sets with ISO 2022 escape sequences
//! - **UTF-8** (modern) — Unicode standard encoding, optionally BOM-prefixed
//!
//! The encoding is indicated in position 9 of the MARC leader: a blank means
//! MARC-8 and any non-blank value is treated as UTF-8.
//!
//! The MARC-8 codepage tables are deliberately not part of this crate. The
//! [`Marc8Decode`] trait is the seam: any decoder exposing a bytes-to-string
//! operation can be dropped in. [`BasicMarc8`] is the bundled fallback for
//! the ASCII repertoire.

/// Character encoding for MARC records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarcEncoding {
    /// MARC-8 encoding (legacy, mixed character sets)
    Marc8,
    /// UTF-8 encoding (modern standard)
    Utf8,
}

impl MarcEncoding {
    /// Select the encoding for a record from leader byte 9.
    ///
    /// A blank selects MARC-8 unless `force_utf8` overrides it; anything
    /// else selects UTF-8.
    #[must_use]
    pub fn from_leader_byte(byte: u8, force_utf8: bool) -> Self {
        if byte == b' ' && !force_utf8 {
            MarcEncoding::Marc8
        } else {
            MarcEncoding::Utf8
        }
    }

    /// The leader character conventionally written for this encoding.
    #[must_use]
    pub fn as_leader_char(&self) -> char {
        match self {
            MarcEncoding::Marc8 => ' ',
            MarcEncoding::Utf8 => 'a',
        }
    }
}

/// A MARC-8 decoder exposing a bytes-to-string operation.
///
/// Decoding is lossy rather than fallible: undecodable input becomes
/// replacement characters, the same contract as UTF-8 decoding here. This
/// keeps every record readable and leaves quality reporting to the
/// warning machinery.
pub trait Marc8Decode: Send + Sync {
    /// Decode MARC-8 bytes into a string.
    fn decode(&self, bytes: &[u8]) -> String;
}

/// Minimal MARC-8 decoder for the ASCII repertoire.
///
/// Handles the Basic Latin character range directly and consumes ISO 2022
/// escape sequences (`ESC` followed by optional intermediates `0x20-0x2F`
/// and one final byte) without switching tables; bytes outside ASCII decode
/// to U+FFFD. A full codepage decoder implementing [`Marc8Decode`] can be
/// swapped in where vernacular MARC-8 data is expected.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicMarc8;

impl Marc8Decode for BasicMarc8 {
    fn decode(&self, bytes: &[u8]) -> String {
        const ESC: u8 = 0x1B;
        let mut result = String::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            let byte = bytes[i];
            if byte == ESC {
                // ESC [intermediates] final
                i += 1;
                while i < bytes.len() && (0x20..=0x2F).contains(&bytes[i]) {
                    i += 1;
                }
                if i < bytes.len() {
                    i += 1;
                }
                continue;
            }
            if byte.is_ascii() {
                result.push(byte as char);
            } else {
                result.push('\u{FFFD}');
            }
            i += 1;
        }
        result
    }
}

/// The UTF-8 byte order mark.
pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Strip a leading UTF-8 BOM, if present.
#[must_use]
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Decode bytes as UTF-8, replacing invalid sequences.
#[must_use]
pub fn decode_utf8_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_selection() {
        assert_eq!(
            MarcEncoding::from_leader_byte(b' ', false),
            MarcEncoding::Marc8
        );
        assert_eq!(
            MarcEncoding::from_leader_byte(b' ', true),
            MarcEncoding::Utf8
        );
        assert_eq!(
            MarcEncoding::from_leader_byte(b'a', false),
            MarcEncoding::Utf8
        );
        assert_eq!(
            MarcEncoding::from_leader_byte(b'8', false),
            MarcEncoding::Utf8
        );
    }

    #[test]
    fn test_basic_marc8_ascii_passthrough() {
        let decoded = BasicMarc8.decode(b"Greenville, NC 27858");
        assert_eq!(decoded, "Greenville, NC 27858");
    }

    #[test]
    fn test_basic_marc8_consumes_escape_sequences() {
        // ESC ( B designates Basic Latin; the sequence itself produces no text
        let decoded = BasicMarc8.decode(b"ab\x1B(Bcd");
        assert_eq!(decoded, "abcd");
    }

    #[test]
    fn test_basic_marc8_replaces_high_bytes() {
        let decoded = BasicMarc8.decode(&[b'a', 0xE9, b'b']);
        assert_eq!(decoded, "a\u{FFFD}b");
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom(b"\xEF\xBB\xBFabc"), b"abc");
        assert_eq!(strip_bom(b"abc"), b"abc");
        assert_eq!(strip_bom(b""), b"");
    }
}
