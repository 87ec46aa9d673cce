//! MARC record leader parsing and validation.
//!
//! The MARC leader is a 24-character fixed-length field at the start of
//! every MARC record. It contains metadata describing the record's
//! structure, content type, and encoding.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 digits)
//! - Position 5: Record status
//! - Position 6: Record type
//! - Position 7: Bibliographic level
//! - Position 8: Type of control
//! - Position 9: Character coding (space = MARC-8, non-blank = UTF-8)
//! - Position 10: Indicator count (always '2')
//! - Position 11: Subfield code count (always '2')
//! - Positions 12-16: Base address of data (5 digits)
//! - Positions 17-19: Encoding level, cataloging form, multipart level
//! - Positions 20-23: Entry map, literally "4500"

use crate::error::{MarcError, Result};
use crate::record::{FIELD_TERMINATOR, LEADER_LEN};
use serde::{Deserialize, Serialize};

/// MARC Leader — the 24 characters at the start of every MARC record.
///
/// The leader is kept as the decoded characters rather than a field-by-field
/// struct: record equality is byte-equal re-serialization, so positions that
/// this library does not interpret must survive untouched. Interpreted
/// positions are exposed through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leader(String);

impl Leader {
    /// Wrap an exact 24-character leader string.
    ///
    /// Only the length is checked here; structural validation against a full
    /// record happens in [`Leader::from_record_str`].
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidLeader`] when `chars` is not exactly 24
    /// characters.
    pub fn new(chars: impl Into<String>) -> Result<Self> {
        let chars = chars.into();
        let count = chars.chars().count();
        if count != LEADER_LEN {
            return Err(MarcError::InvalidLeader(format!(
                "Leader must be exactly {LEADER_LEN} characters, got {count}"
            )));
        }
        Ok(Leader(chars))
    }

    /// Validate and extract the leader from a full decoded record string.
    ///
    /// All of the following must hold:
    ///
    /// 1. Characters 0-4 are a decimal integer equal to the record length.
    ///    The record length is a physical byte count while the input here is
    ///    a decoded string, so the reported length may match the character
    ///    count, the UTF-16 code-unit count, or the UTF-8 byte count.
    /// 2. Characters 12-16 are a decimal integer strictly less than the
    ///    record length.
    /// 3. The character immediately before the base address is the Field
    ///    Terminator — the directory ends exactly there.
    /// 4. The last four leader characters are literally `"4500"`.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidLeader`] describing the first failed
    /// check.
    pub fn from_record_str(record: &str) -> Result<Self> {
        let leader_chars: String = record.chars().take(LEADER_LEN).collect();
        let leader = Leader::new(leader_chars)?;

        let reported_length = leader.record_length().ok_or_else(|| {
            let digits: String = leader.0.chars().take(5).collect();
            MarcError::InvalidLeader(format!("Record length '{digits}' is not numeric"))
        })?;
        let char_count = record.chars().count();
        let utf16_count = record.encode_utf16().count();
        let byte_count = record.len();
        if reported_length != char_count
            && reported_length != utf16_count
            && reported_length != byte_count
        {
            return Err(MarcError::InvalidLeader(format!(
                "Reported record length {reported_length} does not match the \
                 decoded length ({char_count} characters, {byte_count} bytes)"
            )));
        }

        let base_address = leader.base_address().ok_or_else(|| {
            let digits: String = leader.0.chars().take(17).skip(12).collect();
            MarcError::InvalidLeader(format!("Base address '{digits}' is not numeric"))
        })?;
        if base_address == 0 || base_address >= reported_length {
            return Err(MarcError::InvalidLeader(format!(
                "Base address {base_address} is not within the record \
                 (length {reported_length})"
            )));
        }

        // Leader and directory are ASCII, so character positions coincide
        // with byte offsets up to the base address.
        if record.chars().nth(base_address - 1) != Some(FIELD_TERMINATOR as char) {
            return Err(MarcError::InvalidLeader(format!(
                "Directory does not end with a Field Terminator at position {}",
                base_address - 1
            )));
        }

        if !leader.0.ends_with("4500") {
            return Err(MarcError::InvalidLeader(
                "Leader does not end with the entry map \"4500\"".to_string(),
            ));
        }

        Ok(leader)
    }

    /// The leader characters.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Record length from positions 0-4, when numeric.
    #[must_use]
    pub fn record_length(&self) -> Option<usize> {
        self.digits(0, 5)
    }

    /// Base address of data from positions 12-16, when numeric.
    #[must_use]
    pub fn base_address(&self) -> Option<usize> {
        self.digits(12, 17)
    }

    /// Character coding scheme from position 9. Blank means MARC-8; any
    /// other value is treated as UTF-8.
    #[must_use]
    pub fn character_coding(&self) -> char {
        self.0.chars().nth(9).unwrap_or(' ')
    }

    /// Return a copy of this leader with the record length and base address
    /// digits replaced. Used when serializing, where both values are
    /// recomputed from the assembled record.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidLeader`] when either value exceeds the
    /// five decimal digits ISO 2709 allows.
    pub fn with_lengths(&self, record_length: usize, base_address: usize) -> Result<Self> {
        if record_length > 99_999 || base_address > 99_999 {
            return Err(MarcError::InvalidLeader(format!(
                "Record length {record_length} or base address {base_address} \
                 exceeds the 5-digit limit"
            )));
        }
        let chars: Vec<char> = self.0.chars().collect();
        let mut out = String::with_capacity(LEADER_LEN);
        out.push_str(&format!("{record_length:05}"));
        out.extend(&chars[5..12]);
        out.push_str(&format!("{base_address:05}"));
        out.extend(&chars[17..]);
        Ok(Leader(out))
    }

    fn digits(&self, start: usize, end: usize) -> Option<usize> {
        let s: String = self.0.chars().take(end).skip(start).collect();
        if s.len() == end - start && s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse().ok()
        } else {
            None
        }
    }
}

impl Default for Leader {
    /// A blank leader for programmatically built records: zero lengths, two
    /// indicators, two-character subfield codes, UTF-8 coding, "4500" entry
    /// map. The lengths are recomputed on serialization.
    fn default() -> Self {
        Leader("00000nam a2200000   4500".to_string())
    }
}

impl std::fmt::Display for Leader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
