//! MARC bibliographic record structures and operations.
//!
//! This module provides the core record types:
//! - [`Record`] — an insertion-ordered sequence of fields plus a tag index
//! - [`Field`] — a variable field, either [`ControlField`] or [`DataField`]
//! - [`Subfield`] — a coded data element within a data field
//!
//! MARC-21 is position-sensitive, so a record preserves the order in which
//! fields were added. The tag index is a secondary view mapping each
//! three-character tag to the positions of the fields bearing it; it is
//! maintained on every add and remove so repeated lookups stay O(1) on
//! average.
//!
//! # Examples
//!
//! ```ignore
//! use marcex::{ControlField, DataField, Field, Record};
//!
//! let mut record = Record::default();
//! record.add_field(Field::Control(ControlField::new("001", "12345")));
//!
//! let mut title = DataField::new("245", '1', '0');
//! title.add_subfield('a', "The Great Gatsby");
//! record.add_field(Field::Data(title));
//!
//! for field in record.fields_by_tag("245") {
//!     println!("{}", field.tag());
//! }
//! ```

use crate::error::{MarcError, Result};
use crate::leader::Leader;
use crate::linkage;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ops::Index;

/// Record Terminator byte (0x1D), ending every ISO 2709 record.
pub const RECORD_TERMINATOR: u8 = 0x1D;
/// Field Terminator byte (0x1E), ending the directory and every variable field.
pub const FIELD_TERMINATOR: u8 = 0x1E;
/// Subfield Delimiter byte (0x1F), prefixing each subfield code.
pub const SUBFIELD_DELIMITER: u8 = 0x1F;
/// Length of the record leader in characters.
pub const LEADER_LEN: usize = 24;
/// Length of one directory entry in characters: tag (3) + length (4) + offset (5).
pub const DIRECTORY_ENTRY_LEN: usize = 12;

/// A MARC bibliographic record.
///
/// Fields live in a single insertion-ordered sequence; control and data
/// fields may interleave exactly as they appeared in the source. Warnings
/// collected while deserializing are carried on the record so consumers can
/// audit data quality without losing records.
///
/// Equality is defined as byte-equal MARC-21 serialization: two records
/// compare equal when [`Record::as_marc21`] produces the same bytes for
/// both.
#[derive(Debug, Clone)]
pub struct Record {
    /// Record leader (24 characters).
    pub leader: Leader,
    fields: Vec<Field>,
    tag_index: IndexMap<String, Vec<usize>>,
    warnings: Vec<String>,
}

/// A variable field: either a control field (tags 001-009) or a data field
/// (tags 010-999).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    /// Control field — opaque data, no indicators or subfields.
    Control(ControlField),
    /// Data field — two indicators and a sequence of subfields.
    Data(DataField),
}

/// A control field (tag numeric value below 10) carrying an opaque data
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlField {
    /// Field tag (3 digits, 001-009).
    pub tag: String,
    /// Field data.
    pub data: String,
}

/// A data field (tag numeric value 10 or above) with two indicators and an
/// ordered sequence of subfields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    /// Field tag (3 digits, 010-999).
    pub tag: String,
    /// First indicator.
    pub indicator1: char,
    /// Second indicator.
    pub indicator2: char,
    /// Subfields (stored in `SmallVec` to avoid allocation for typical fields
    /// with 4 or fewer subfields).
    pub subfields: SmallVec<[Subfield; 4]>,
}

/// A subfield within a data field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single alphanumeric character).
    pub code: char,
    /// Subfield value.
    pub value: String,
}

impl ControlField {
    /// Create a new control field.
    pub fn new(tag: impl Into<String>, data: impl Into<String>) -> Self {
        ControlField {
            tag: tag.into(),
            data: data.into(),
        }
    }

    /// A control field is empty when it carries no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl DataField {
    /// Create a new data field with the given tag and indicators.
    pub fn new(tag: impl Into<String>, indicator1: char, indicator2: char) -> Self {
        DataField {
            tag: tag.into(),
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        }
    }

    /// Append a subfield.
    pub fn add_subfield(&mut self, code: char, value: impl Into<String>) {
        self.subfields.push(Subfield {
            code,
            value: value.into(),
        });
    }

    /// Get the value of the first subfield with the given code.
    #[must_use]
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.first_subfield(code).map(|sf| sf.value.as_str())
    }

    /// Get the first subfield with the given code.
    #[must_use]
    pub fn first_subfield(&self, code: char) -> Option<&Subfield> {
        self.subfields.iter().find(|sf| sf.code == code)
    }

    /// Iterate over subfields with the given code, in source order.
    ///
    /// The code `'*'` is a wildcard matching every subfield.
    pub fn subfields_by_code(&self, code: char) -> impl Iterator<Item = &Subfield> {
        self.subfields
            .iter()
            .filter(move |sf| code == '*' || sf.code == code)
    }

    /// Get the subfield at a position in source order.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::OutOfRange`] when `index` is not within
    /// `[0, len)`.
    pub fn subfield_at(&self, index: usize) -> Result<&Subfield> {
        self.subfields.get(index).ok_or(MarcError::OutOfRange {
            index,
            len: self.subfields.len(),
        })
    }

    /// A data field is empty when it has no subfields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subfields.is_empty()
    }
}

impl Field {
    /// The field's three-character tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Field::Control(cf) => &cf.tag,
            Field::Data(df) => &df.tag,
        }
    }

    /// Whether this is a control field (tag below 010).
    #[must_use]
    pub fn is_control(&self) -> bool {
        matches!(self, Field::Control(_))
    }

    /// Whether this is a data field (tag 010 and above).
    #[must_use]
    pub fn is_data(&self) -> bool {
        matches!(self, Field::Data(_))
    }

    /// A field is empty when it carries no semantically meaningful payload:
    /// a control field with empty data, or a data field with zero subfields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Field::Control(cf) => cf.is_empty(),
            Field::Data(df) => df.is_empty(),
        }
    }

    /// View this field as a control field, if it is one.
    #[must_use]
    pub fn as_control(&self) -> Option<&ControlField> {
        match self {
            Field::Control(cf) => Some(cf),
            Field::Data(_) => None,
        }
    }

    /// View this field as a data field, if it is one.
    #[must_use]
    pub fn as_data(&self) -> Option<&DataField> {
        match self {
            Field::Control(_) => None,
            Field::Data(df) => Some(df),
        }
    }
}

impl Record {
    /// Create a new, empty record with the given leader.
    #[must_use]
    pub fn new(leader: Leader) -> Self {
        Record {
            leader,
            fields: Vec::new(),
            tag_index: IndexMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Append a field, updating the tag index.
    pub fn add_field(&mut self, field: Field) {
        let position = self.fields.len();
        self.tag_index
            .entry(field.tag().to_string())
            .or_default()
            .push(position);
        self.fields.push(field);
    }

    /// Append a control field.
    ///
    /// Convenience wrapper over [`Record::add_field`].
    pub fn add_control_field(&mut self, tag: impl Into<String>, data: impl Into<String>) {
        self.add_field(Field::Control(ControlField::new(tag, data)));
    }

    /// Remove the first field equal to `field` from both the ordered
    /// sequence and the tag index. Returns `true` when a field was removed.
    pub fn remove_field(&mut self, field: &Field) -> bool {
        match self.fields.iter().position(|f| f == field) {
            Some(position) => self.remove_field_at(position).is_ok(),
            None => false,
        }
    }

    /// Remove and return the field at a position in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::OutOfRange`] when `index` is not within
    /// `[0, len)`.
    pub fn remove_field_at(&mut self, index: usize) -> Result<Field> {
        if index >= self.fields.len() {
            return Err(MarcError::OutOfRange {
                index,
                len: self.fields.len(),
            });
        }
        let field = self.fields.remove(index);

        if let Some(bucket) = self.tag_index.get_mut(field.tag()) {
            bucket.retain(|&p| p != index);
            if bucket.is_empty() {
                self.tag_index.shift_remove(field.tag());
            }
        }
        // Positions after the removal shift down by one.
        for bucket in self.tag_index.values_mut() {
            for p in bucket.iter_mut() {
                if *p > index {
                    *p -= 1;
                }
            }
        }
        Ok(field)
    }

    /// Get all fields with the given tag, in insertion order.
    ///
    /// An empty tag returns every field in the record, preserving the
    /// behavior of passing a null or empty tag to the lookup.
    #[must_use]
    pub fn get_fields(&self, tag: &str) -> Vec<&Field> {
        self.fields_by_tag(tag).collect()
    }

    /// Get the first field with the given tag.
    #[must_use]
    pub fn get_field(&self, tag: &str) -> Option<&Field> {
        self.fields_by_tag(tag).next()
    }

    /// Get the data of the first control field with the given tag.
    #[must_use]
    pub fn get_control_field(&self, tag: &str) -> Option<&str> {
        self.fields_by_tag(tag)
            .find_map(|f| f.as_control())
            .map(|cf| cf.data.as_str())
    }

    /// Iterate over fields with the given tag, lazily, in insertion order.
    ///
    /// An empty tag yields every field in the record.
    pub fn fields_by_tag<'a>(&'a self, tag: &str) -> Box<dyn Iterator<Item = &'a Field> + 'a> {
        if tag.is_empty() {
            return Box::new(self.fields.iter());
        }
        match self.tag_index.get(tag) {
            Some(bucket) => Box::new(bucket.iter().map(move |&p| &self.fields[p])),
            None => Box::new(std::iter::empty()),
        }
    }

    /// Iterate over all fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Get the field at a position in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::OutOfRange`] when `index` is not within
    /// `[0, count)`.
    pub fn field_at(&self, index: usize) -> Result<&Field> {
        self.fields.get(index).ok_or(MarcError::OutOfRange {
            index,
            len: self.fields.len(),
        })
    }

    /// Number of fields in the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All 880 fields whose `$6` subfield links back to the given tag.
    ///
    /// Linkage matches on the tag prefix of `$6` only; the occurrence
    /// counter is not consulted.
    #[must_use]
    pub fn linked_880_fields(&self, tag: &str) -> Vec<&DataField> {
        self.fields_by_tag("880")
            .filter_map(Field::as_data)
            .filter(|df| {
                df.get_subfield('6')
                    .is_some_and(|sf6| linkage::links_to(sf6, tag))
            })
            .collect()
    }

    /// Warnings accumulated while this record was deserialized.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Append a warning.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

impl Default for Record {
    fn default() -> Self {
        Record::new(Leader::default())
    }
}

impl Index<usize> for Record {
    type Output = Field;

    fn index(&self, index: usize) -> &Field {
        &self.fields[index]
    }
}

impl PartialEq for Record {
    /// Byte-equal MARC-21 serialization. Records that fail to serialize
    /// compare unequal.
    fn eq(&self, other: &Self) -> bool {
        match (self.as_marc21(), other.as_marc21()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}
