//! Deserializing MARC records from bytes and strings.
//!
//! [`RecordParser`] turns one framed MARC-21 record into a [`Record`]:
//!
//! 1. **Encoding selection.** Leader byte 9 picks MARC-8 or UTF-8 (a
//!    `force_utf8` override is available for mislabeled files); a leading
//!    UTF-8 BOM is stripped.
//! 2. **Structural parse.** The leader is validated, the directory and
//!    field payloads are split on the Field Terminator, and fields are
//!    built in directory order.
//!
//! Only three defects are fatal to a record: an invalid leader, a
//! non-numeric tag, and a directory whose entry count disagrees with the
//! payload count. Everything else — a missing record terminator, stray
//! directory characters, malformed indicators, zero-length subfields — is
//! repaired and reported as a warning on the returned record.
//!
//! # Examples
//!
//! ```ignore
//! use marcex::RecordParser;
//!
//! let parser = RecordParser::new();
//! let record = parser.parse_bytes(&frame)?;
//! for warning in record.warnings() {
//!     eprintln!("data quality: {warning}");
//! }
//! ```

use crate::encoding::{decode_utf8_lossy, strip_bom, BasicMarc8, Marc8Decode, MarcEncoding};
use crate::error::{MarcError, Result};
use crate::leader::Leader;
use crate::record::{
    ControlField, DataField, Field, Record, DIRECTORY_ENTRY_LEN, FIELD_TERMINATOR, LEADER_LEN,
    RECORD_TERMINATOR, SUBFIELD_DELIMITER,
};

/// Deserializer for single MARC-21 records.
///
/// A parser is cheap to construct and immutable while parsing, so one
/// instance can serve any number of records.
pub struct RecordParser {
    force_utf8: bool,
    marc8: Box<dyn Marc8Decode>,
}

impl std::fmt::Debug for RecordParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordParser")
            .field("force_utf8", &self.force_utf8)
            .finish_non_exhaustive()
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordParser {
    /// Create a parser with default settings: per-record encoding selection
    /// and the bundled [`BasicMarc8`] decoder.
    #[must_use]
    pub fn new() -> Self {
        RecordParser {
            force_utf8: false,
            marc8: Box::new(BasicMarc8),
        }
    }

    /// Decode every record as UTF-8 regardless of leader byte 9.
    ///
    /// Useful for files whose records are UTF-8 but whose leaders were
    /// never updated to say so.
    #[must_use]
    pub fn with_force_utf8(mut self, force_utf8: bool) -> Self {
        self.force_utf8 = force_utf8;
        self
    }

    /// Replace the MARC-8 decoder.
    #[must_use]
    pub fn with_marc8_decoder(mut self, decoder: Box<dyn Marc8Decode>) -> Self {
        self.marc8 = decoder;
        self
    }

    /// Deserialize one record from its framed bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidLeader`], [`MarcError::InvalidTag`], or
    /// [`MarcError::DirectoryMismatch`] when the record is structurally
    /// unusable. Recoverable anomalies become warnings on the record.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Record> {
        let coding = bytes.get(9).copied().unwrap_or(b' ');
        let text = match MarcEncoding::from_leader_byte(coding, self.force_utf8) {
            MarcEncoding::Marc8 => self.marc8.decode(bytes),
            MarcEncoding::Utf8 => decode_utf8_lossy(strip_bom(bytes)),
        };
        self.parse_str(&text)
    }

    /// Deserialize one record from its decoded character form.
    ///
    /// # Errors
    ///
    /// Same failure contract as [`RecordParser::parse_bytes`].
    pub fn parse_str(&self, text: &str) -> Result<Record> {
        let leader = Leader::from_record_str(text)?;
        let mut record = Record::new(leader);

        // Leader characters are ASCII once validated, so the body starts at
        // a character boundary; find it without assuming single-byte chars.
        let body_start = text
            .char_indices()
            .nth(LEADER_LEN)
            .map_or(text.len(), |(offset, _)| offset);
        let mut body = &text[body_start..];

        match body.strip_suffix(RECORD_TERMINATOR as char) {
            Some(stripped) => body = stripped,
            None => {
                record.add_warning("Record does not end with a Record Terminator (hex 1D).");
            },
        }

        let mut parts: Vec<&str> = body.split(FIELD_TERMINATOR as char).collect();
        // The final field's terminator leaves one empty trailing element.
        if parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }
        let directory = parts[0];
        let payloads = &parts[1..];

        let entries = split_directory(directory, &mut record);
        if entries.len() != payloads.len() {
            return Err(MarcError::DirectoryMismatch(format!(
                "Directory has {} entries but the record has {} fields",
                entries.len(),
                payloads.len()
            )));
        }

        for (entry, &payload) in entries.iter().zip(payloads) {
            let tag: String = entry.iter().take(3).collect();
            let tag_value: u32 = tag
                .parse()
                .map_err(|_| MarcError::InvalidTag(format!("Field tag '{tag}' is not numeric")))?;

            if tag_value < 10 {
                record.add_field(Field::Control(ControlField::new(tag, payload)));
            } else {
                let field = parse_data_field(tag, payload, &mut record);
                record.add_field(Field::Data(field));
            }
        }

        Ok(record)
    }
}

/// Split the directory into 12-character entries, trimming and reporting a
/// non-aligned remainder.
fn split_directory(directory: &str, record: &mut Record) -> Vec<Vec<char>> {
    let chars: Vec<char> = directory.chars().collect();
    let extra = chars.len() % DIRECTORY_ENTRY_LEN;
    if extra != 0 {
        record.add_warning(format!(
            "Directory contains {extra} extra character(s). Removing extra characters"
        ));
    }
    chars[..chars.len() - extra]
        .chunks(DIRECTORY_ENTRY_LEN)
        .map(<[char]>::to_vec)
        .collect()
}

/// Parse a data field payload: indicator segment, then delimiter-prefixed
/// subfields.
fn parse_data_field(tag: String, payload: &str, record: &mut Record) -> DataField {
    let mut segments = payload.split(SUBFIELD_DELIMITER as char);
    let indicator_segment = segments.next().unwrap_or("");

    let (indicator1, indicator2) = parse_indicators(&tag, indicator_segment, record);
    let mut field = DataField::new(tag, indicator1, indicator2);

    for (number, segment) in segments.enumerate() {
        if segment.is_empty() {
            record.add_warning(format!(
                "Subfield #{} in field {} has zero length. Skipping.",
                number + 1,
                field.tag
            ));
            continue;
        }
        let mut chars = segment.chars();
        let code = chars.next().unwrap_or(' ');
        field.add_subfield(code, chars.as_str());
    }

    if field.subfields.is_empty() {
        record.add_warning(format!("Field {} has no subfields.", field.tag));
    }
    field
}

/// Extract the two indicators from the segment before the first subfield
/// delimiter, coercing anything malformed to blanks.
fn parse_indicators(tag: &str, segment: &str, record: &mut Record) -> (char, char) {
    let chars: Vec<char> = segment.chars().collect();
    if chars.len() != 2 {
        record.add_warning(format!(
            "Invalid indicators \"{segment}\" in field {tag}. Forcing indicators to blanks."
        ));
        return (' ', ' ');
    }
    (
        coerce_indicator(tag, 1, chars[0], record),
        coerce_indicator(tag, 2, chars[1], record),
    )
}

/// Indicators must be a blank or a lowercase ASCII letter or digit;
/// uppercase input is lowered silently, anything else becomes a blank.
fn coerce_indicator(tag: &str, position: u8, value: char, record: &mut Record) -> char {
    let lowered = value.to_ascii_lowercase();
    if lowered == ' ' || lowered.is_ascii_lowercase() || lowered.is_ascii_digit() {
        lowered
    } else {
        record.add_warning(format!(
            "Invalid indicator {position} '{value}' in field {tag}. Forcing to blank."
        ));
        ' '
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "00043    82200037   4500001000400000\x1Eaaaa\x1E\x1D";

    fn parse(text: &str) -> Record {
        RecordParser::new().parse_str(text).unwrap()
    }

    /// Assemble a syntactically valid record string from (tag, payload)
    /// pairs, computing the directory and leader lengths.
    fn build_record(payloads: &[(&str, &str)]) -> String {
        let mut directory = String::new();
        let mut data = String::new();
        let mut offset = 0;
        for (tag, payload) in payloads {
            let len = payload.chars().count() + 1;
            directory.push_str(&format!("{tag}{len:04}{offset:05}"));
            data.push_str(payload);
            data.push('\x1E');
            offset += len;
        }
        let base = LEADER_LEN + directory.chars().count() + 1;
        let total = base + data.chars().count() + 1;
        format!("{total:05}    822{base:05}   4500{directory}\x1E{data}\x1D")
    }

    #[test]
    fn test_single_control_field_record() {
        let record = parse(SIMPLE);
        assert_eq!(record.leader.as_str(), "00043    82200037   4500");
        assert_eq!(record.len(), 1);
        assert_eq!(record.get_control_field("001"), Some("aaaa"));
        assert!(record.warnings().is_empty());
    }

    #[test]
    fn test_missing_record_terminator_warns() {
        let record = parse("00042    82200037   4500001000400000\x1Eaaaa\x1E");
        assert_eq!(record.len(), 1);
        assert_eq!(record.get_control_field("001"), Some("aaaa"));
        assert_eq!(
            record.warnings(),
            ["Record does not end with a Record Terminator (hex 1D)."]
        );
    }

    #[test]
    fn test_directory_extra_characters_warn() {
        // Two stray characters appended to the directory.
        let text = "00045    82200039   4500001000400000xy\x1Eaaaa\x1E\x1D";
        let record = parse(text);
        assert_eq!(record.len(), 1);
        assert_eq!(
            record.warnings(),
            ["Directory contains 2 extra character(s). Removing extra characters"]
        );
    }

    #[test]
    fn test_directory_mismatch_is_fatal() {
        // Two directory entries, one payload.
        let text = "00055    82200049   4500001000500000005000500005\x1Eaaaa\x1E\x1D";
        let err = RecordParser::new().parse_str(text).unwrap_err();
        assert!(matches!(err, MarcError::DirectoryMismatch(_)));
    }

    #[test]
    fn test_non_numeric_tag_is_fatal() {
        let text = "00043    82200037   450000a000400000\x1Eaaaa\x1E\x1D";
        let err = RecordParser::new().parse_str(text).unwrap_err();
        assert!(matches!(err, MarcError::InvalidTag(_)));
    }

    #[test]
    fn test_invalid_leader_is_fatal() {
        let err = RecordParser::new().parse_str("garbage").unwrap_err();
        assert!(matches!(err, MarcError::InvalidLeader(_)));
    }

    #[test]
    fn test_data_field_with_subfields() {
        let text = build_record(&[("001", "aaaa"), ("245", "10\x1FaTitle\x1FcAuthor")]);
        let record = parse(&text);
        assert_eq!(record.len(), 2);
        let field = record.get_field("245").unwrap().as_data().unwrap();
        assert_eq!(field.indicator1, '1');
        assert_eq!(field.indicator2, '0');
        assert_eq!(field.get_subfield('a'), Some("Title"));
        assert_eq!(field.get_subfield('c'), Some("Author"));
        assert!(record.warnings().is_empty());
    }

    #[test]
    fn test_short_indicator_segment_coerced() {
        let text = build_record(&[("245", "1\x1FaTitle")]);
        let record = parse(&text);
        let field = record.get_field("245").unwrap().as_data().unwrap();
        assert_eq!((field.indicator1, field.indicator2), (' ', ' '));
        assert_eq!(record.warnings().len(), 1);
        assert!(record.warnings()[0].contains("Invalid indicators"));
    }

    #[test]
    fn test_bad_indicator_characters_coerced() {
        // '!' is invalid; 'A' lowercases without a warning.
        let text = build_record(&[("245", "!A\x1FaTitle")]);
        let record = parse(&text);
        let field = record.get_field("245").unwrap().as_data().unwrap();
        assert_eq!(field.indicator1, ' ');
        assert_eq!(field.indicator2, 'a');
        assert_eq!(record.warnings().len(), 1);
        assert!(record.warnings()[0].contains("Invalid indicator 1"));
    }

    #[test]
    fn test_zero_length_subfield_skipped() {
        // "$aA" then an empty segment then "$bB"
        let text = build_record(&[("245", "10\x1FaA\x1F\x1FbB")]);
        let record = parse(&text);
        let field = record.get_field("245").unwrap().as_data().unwrap();
        assert_eq!(field.subfields.len(), 2);
        assert_eq!(field.get_subfield('a'), Some("A"));
        assert_eq!(field.get_subfield('b'), Some("B"));
        assert_eq!(record.warnings().len(), 1);
        assert!(record.warnings()[0].contains("has zero length"));
    }

    #[test]
    fn test_data_field_without_subfields_warns() {
        let text = build_record(&[("245", "10")]);
        let record = parse(&text);
        let field = record.get_field("245").unwrap().as_data().unwrap();
        assert!(field.is_empty());
        assert_eq!(record.warnings(), ["Field 245 has no subfields."]);
    }

    #[test]
    fn test_bytes_utf8_with_bom() {
        // A "nam" leader: with the three BOM bytes in front, raw byte 9 is
        // the leader's type-of-record 'a', non-blank, so the UTF-8 path is
        // taken and the BOM stripped before decoding.
        let text = "00043nam a2200037   4500001000500000\x1Eaaaa\x1E\x1D";
        let mut bytes = Vec::from(&b"\xEF\xBB\xBF"[..]);
        bytes.extend_from_slice(text.as_bytes());
        let record = RecordParser::new().parse_bytes(&bytes).unwrap();
        assert_eq!(record.get_control_field("001"), Some("aaaa"));
    }

    #[test]
    fn test_bytes_marc8_path_for_blank_coding() {
        // Leader byte 9 is blank: the MARC-8 decoder runs. BasicMarc8
        // passes ASCII through, so the record parses identically.
        let text = "00043     2200037   4500001000400000\x1Eaaaa\x1E\x1D";
        assert_eq!(text.as_bytes()[9], b' ');
        let record = RecordParser::new().parse_bytes(text.as_bytes()).unwrap();
        assert_eq!(record.get_control_field("001"), Some("aaaa"));
    }

    #[test]
    fn test_force_utf8_overrides_blank_coding() {
        // 43 bytes but 42 characters: the reported length counts bytes.
        let text = "00043     2200037   4500001000400000\x1Eaa\u{e9}\x1E\x1D";
        assert_eq!(text.as_bytes()[9], b' ');
        let parser = RecordParser::new().with_force_utf8(true);
        let record = parser.parse_bytes(text.as_bytes()).unwrap();
        assert_eq!(record.get_control_field("001"), Some("aaé"));
    }

    #[test]
    fn test_empty_control_field_parses() {
        // A control field with no data: nothing between two terminators.
        let text = build_record(&[("001", "")]);
        let record = parse(&text);
        assert_eq!(record.len(), 1);
        assert_eq!(record.get_control_field("001"), Some(""));
    }

    #[test]
    fn test_repeatable_control_fields() {
        let text = build_record(&[("006", "aaaa"), ("006", "bbbb")]);
        let record = parse(&text);
        let values: Vec<&str> = record
            .fields_by_tag("006")
            .filter_map(|f| f.as_control())
            .map(|cf| cf.data.as_str())
            .collect();
        assert_eq!(values, ["aaaa", "bbbb"]);
    }
}
