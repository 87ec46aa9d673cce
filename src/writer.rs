//! Writing MARC records to ISO 2709 binary format.
//!
//! This module provides [`MarcWriter`] for serializing [`Record`] instances
//! to any destination implementing [`std::io::Write`], and the
//! [`Record::as_marc21`] convenience for in-memory serialization. Record
//! equality is defined over these bytes, so the writer is also the equality
//! and round-trip backbone.
//!
//! Fields are emitted in record insertion order; the directory, record
//! length, and base address are recomputed on every write.
//!
//! # Examples
//!
//! ```ignore
//! use marcex::{MarcWriter, Record};
//!
//! let mut buffer = Vec::new();
//! let mut writer = MarcWriter::new(&mut buffer);
//! writer.write_record(&record)?;
//! ```

use crate::error::{MarcError, Result};
use crate::record::{Field, Record, FIELD_TERMINATOR, LEADER_LEN, RECORD_TERMINATOR, SUBFIELD_DELIMITER};
use std::io::Write;

/// Writer for ISO 2709 binary MARC format.
///
/// Records are written one at a time to any destination implementing
/// [`std::io::Write`].
#[derive(Debug)]
pub struct MarcWriter<W: Write> {
    writer: W,
    records_written: usize,
}

impl<W: Write> MarcWriter<W> {
    /// Create a new MARC writer.
    pub fn new(writer: W) -> Self {
        MarcWriter {
            writer,
            records_written: 0,
        }
    }

    /// Serialize and write a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized (a malformed
    /// leader or an oversize record) or if writing fails.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let bytes = record.as_marc21()?;
        self.writer.write_all(&bytes)?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }
}

impl Record {
    /// Serialize this record to MARC-21 bytes.
    ///
    /// The directory is rebuilt from the fields in insertion order, and the
    /// leader's record length and base address are recomputed; every other
    /// leader position is preserved as-is.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidField`] when a single field's serialized
    /// body exceeds the four directory length digits (9999 bytes), and
    /// [`MarcError::InvalidLeader`](crate::MarcError::InvalidLeader) when
    /// the whole record exceeds the five-digit ISO 2709 length limit.
    pub fn as_marc21(&self) -> Result<Vec<u8>> {
        let mut directory = Vec::new();
        let mut data_area: Vec<u8> = Vec::new();
        let mut position = 0usize;

        for field in self.fields() {
            let mut field_data: Vec<u8> = Vec::new();
            match field {
                Field::Control(cf) => {
                    field_data.extend_from_slice(cf.data.as_bytes());
                },
                Field::Data(df) => {
                    let mut indicator = [0u8; 4];
                    field_data
                        .extend_from_slice(df.indicator1.encode_utf8(&mut indicator).as_bytes());
                    field_data
                        .extend_from_slice(df.indicator2.encode_utf8(&mut indicator).as_bytes());
                    for subfield in &df.subfields {
                        field_data.push(SUBFIELD_DELIMITER);
                        field_data
                            .extend_from_slice(subfield.code.encode_utf8(&mut indicator).as_bytes());
                        field_data.extend_from_slice(subfield.value.as_bytes());
                    }
                },
            }
            // A directory entry has four length digits; a longer field
            // would desync the fixed 12-character entries on re-parse.
            if field_data.len() > 9_999 {
                return Err(MarcError::InvalidField(format!(
                    "Field {} is {} bytes, exceeding the 4-digit directory limit",
                    field.tag(),
                    field_data.len()
                )));
            }
            // Directory length counts payload characters only; the offset
            // counts physical positions, terminators included.
            directory.extend_from_slice(field.tag().as_bytes());
            directory.extend_from_slice(format!("{:04}", field_data.len()).as_bytes());
            directory.extend_from_slice(format!("{position:05}").as_bytes());

            field_data.push(FIELD_TERMINATOR);
            position += field_data.len();
            data_area.extend_from_slice(&field_data);
        }

        directory.push(FIELD_TERMINATOR);

        let base_address = LEADER_LEN + directory.len();
        let record_length = base_address + data_area.len() + 1;
        let leader = self.leader.with_lengths(record_length, base_address)?;

        let mut bytes = Vec::with_capacity(record_length);
        bytes.extend_from_slice(leader.as_str().as_bytes());
        bytes.extend_from_slice(&directory);
        bytes.extend_from_slice(&data_area);
        bytes.push(RECORD_TERMINATOR);
        Ok(bytes)
    }
}
