//! Reading MARC records from binary streams.
//!
//! [`MarcReader`] frames ISO 2709 records lazily out of any seekable byte
//! source: it scans forward for the Record Terminator, seeks back to read
//! exactly one record's bytes, and hands them to the
//! [`RecordParser`](crate::RecordParser). At most one record is held in
//! memory at a time, so file size does not matter.
//!
//! Deserialization failures follow the skip-vs-fail policy: by default the
//! first bad record aborts the stream; with
//! [`with_skip_on_error`](MarcReader::with_skip_on_error) the failure is
//! recorded in [`exceptions`](MarcReader::exceptions) and reading continues
//! with the next record.
//!
//! # Examples
//!
//! Reading records from a file:
//!
//! ```no_run
//! use marcex::MarcReader;
//!
//! let mut reader = MarcReader::open("records.mrc")?;
//! while let Some(record) = reader.read_record()? {
//!     println!("{} fields", record.len());
//! }
//! # Ok::<(), marcex::MarcError>(())
//! ```
//!
//! Reading from a buffer:
//!
//! ```
//! use marcex::MarcReader;
//! use std::io::Cursor;
//!
//! let data = b"...binary MARC data...".to_vec();
//! let mut reader = MarcReader::new(Cursor::new(data))?;
//! # Ok::<(), marcex::MarcError>(())
//! ```

use crate::encoding::Marc8Decode;
use crate::error::{MarcError, Result};
use crate::parser::RecordParser;
use crate::record::{Record, RECORD_TERMINATOR};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// Size of the forward-scan read buffer. A MARC record is at most 99 999
/// bytes (five decimal length digits), so this is comfortably larger than
/// any single record.
const READ_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// Streaming reader for ISO 2709 binary MARC files.
///
/// The reader owns its byte source exclusively and releases it on drop —
/// on normal exhaustion, early abandonment, and fatal errors alike. It is
/// single-use: once exhausted, further reads return
/// [`MarcError::EndOfStream`].
#[derive(Debug)]
pub struct MarcReader<R: Read + Seek> {
    stream: R,
    parser: RecordParser,
    /// Total stream length in bytes, fixed at construction.
    length: u64,
    /// Offset of the next unread byte.
    position: u64,
    skip_on_error: bool,
    exceptions: Vec<MarcError>,
    buffer: Vec<u8>,
    records_read: usize,
    finished: bool,
}

impl MarcReader<File> {
    /// Open a MARC file for reading.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::StreamInit`] when the file cannot be opened or
    /// sized.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(MarcError::StreamInit)?;
        Self::new(file)
    }
}

impl<R: Read + Seek> MarcReader<R> {
    /// Create a reader over any seekable byte source.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::StreamInit`] when the stream cannot be sized.
    pub fn new(mut stream: R) -> Result<Self> {
        let length = stream
            .seek(SeekFrom::End(0))
            .and_then(|length| stream.seek(SeekFrom::Start(0)).map(|_| length))
            .map_err(MarcError::StreamInit)?;
        Ok(MarcReader {
            stream,
            parser: RecordParser::new(),
            length,
            position: 0,
            skip_on_error: false,
            exceptions: Vec::new(),
            buffer: vec![0u8; READ_BUFFER_SIZE],
            records_read: 0,
            finished: false,
        })
    }

    /// Decode every record as UTF-8 regardless of leader byte 9.
    #[must_use]
    pub fn with_force_utf8(mut self, force_utf8: bool) -> Self {
        self.parser = self.parser.with_force_utf8(force_utf8);
        self
    }

    /// Collect deserialization failures in [`exceptions`](Self::exceptions)
    /// and keep reading, instead of aborting on the first bad record.
    #[must_use]
    pub fn with_skip_on_error(mut self, skip_on_error: bool) -> Self {
        self.skip_on_error = skip_on_error;
        self
    }

    /// Replace the MARC-8 decoder used for records whose leader byte 9 is
    /// blank.
    #[must_use]
    pub fn with_marc8_decoder(mut self, decoder: Box<dyn Marc8Decode>) -> Self {
        self.parser = self.parser.with_marc8_decoder(decoder);
        self
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` when the stream is exhausted. With
    /// `skip_on_error`, records that fail to deserialize are recorded in
    /// [`exceptions`](Self::exceptions) and skipped transparently.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::EndOfStream`] when called again after
    /// exhaustion, [`MarcError::UnexpectedEof`] when the stream is
    /// truncated mid-record after its terminator was observed, and any
    /// deserializer failure when `skip_on_error` is off.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        if self.finished {
            return Err(MarcError::EndOfStream);
        }
        loop {
            if self.position >= self.length {
                self.finished = true;
                return Ok(None);
            }

            let record_start = self.position;
            let record_length = match self.scan_to_terminator(record_start)? {
                Some(length) => length,
                None => {
                    // Trailing bytes with no record terminator: drop them.
                    self.position = self.length;
                    self.finished = true;
                    return Ok(None);
                },
            };

            self.stream.seek(SeekFrom::Start(record_start))?;
            let mut frame = vec![0u8; record_length];
            self.stream.read_exact(&mut frame).map_err(|e| {
                if e.kind() == ErrorKind::UnexpectedEof {
                    MarcError::UnexpectedEof(
                        "stream truncated while re-reading a framed record".to_string(),
                    )
                } else {
                    MarcError::IoError(e)
                }
            })?;
            self.position = record_start + record_length as u64;

            match self.parser.parse_bytes(&frame) {
                Ok(record) => {
                    self.records_read += 1;
                    return Ok(Some(record));
                },
                Err(error) if self.skip_on_error => {
                    self.exceptions.push(error);
                },
                Err(error) => {
                    self.finished = true;
                    return Err(error);
                },
            }
        }
    }

    /// Iterate over the remaining records.
    ///
    /// With `skip_on_error`, skipped records do not appear; without it, the
    /// first failure is yielded as an `Err` and iteration ends.
    pub fn records(&mut self) -> Records<'_, R> {
        Records { reader: self }
    }

    /// Fraction of the stream consumed so far, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.length == 0 {
            return 1.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.position as f64 / self.length as f64
        }
    }

    /// Deserialization failures collected while `skip_on_error` is on.
    #[must_use]
    pub fn exceptions(&self) -> &[MarcError] {
        &self.exceptions
    }

    /// Number of records successfully read so far.
    #[must_use]
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Scan forward from `start` for the Record Terminator. Returns the
    /// record length including the terminator, or `None` when the stream
    /// ends first.
    fn scan_to_terminator(&mut self, start: u64) -> Result<Option<usize>> {
        self.stream.seek(SeekFrom::Start(start))?;
        let mut accumulated = 0usize;
        loop {
            let read = self.stream.read(&mut self.buffer)?;
            if read == 0 {
                return Ok(None);
            }
            // SIMD-accelerated terminator search
            if let Some(offset) = memchr::memchr(RECORD_TERMINATOR, &self.buffer[..read]) {
                return Ok(Some(accumulated + offset + 1));
            }
            accumulated += read;
        }
    }
}

/// Iterator over the records of a [`MarcReader`].
///
/// Created by [`MarcReader::records`].
#[derive(Debug)]
pub struct Records<'a, R: Read + Seek> {
    reader: &'a mut MarcReader<R>,
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.finished {
            return None;
        }
        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(error) => Some(Err(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SIMPLE: &str = "00043    82200037   4500001000400000\x1Eaaaa\x1E\x1D";
    const BAD_LEADER: &str = "0004x    82200037   4500001000400000\x1Eaaaa\x1E\x1D";

    fn reader_over(text: &str) -> MarcReader<Cursor<Vec<u8>>> {
        MarcReader::new(Cursor::new(text.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn test_reads_all_records_in_order() {
        let mut reader = reader_over(&SIMPLE.repeat(3));
        let mut count = 0;
        while let Some(record) = reader.read_record().unwrap() {
            assert_eq!(record.get_control_field("001"), Some("aaaa"));
            count += 1;
        }
        assert_eq!(count, 3);
        assert_eq!(reader.records_read(), 3);
    }

    #[test]
    fn test_empty_stream_yields_nothing() {
        let mut reader = reader_over("");
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_read_after_exhaustion_is_end_of_stream() {
        let mut reader = reader_over(SIMPLE);
        assert!(reader.read_record().unwrap().is_some());
        assert!(reader.read_record().unwrap().is_none());
        assert!(matches!(reader.read_record(), Err(MarcError::EndOfStream)));
    }

    #[test]
    fn test_skip_on_error_collects_exceptions() {
        let text = format!("{BAD_LEADER}{SIMPLE}{SIMPLE}");
        let mut reader = reader_over(&text).with_skip_on_error(true);
        let records: Vec<Record> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(reader.exceptions().len(), 1);
        assert!(matches!(
            reader.exceptions()[0],
            MarcError::InvalidLeader(_)
        ));
    }

    #[test]
    fn test_fail_fast_without_skip_on_error() {
        let text = format!("{BAD_LEADER}{SIMPLE}");
        let mut reader = reader_over(&text);
        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, MarcError::InvalidLeader(_)));
        // The reader is dead after a propagated failure.
        assert!(matches!(reader.read_record(), Err(MarcError::EndOfStream)));
    }

    #[test]
    fn test_progress_advances_to_one() {
        let mut reader = reader_over(&SIMPLE.repeat(2));
        assert!(reader.progress() < f64::EPSILON);
        reader.read_record().unwrap();
        assert!((reader.progress() - 0.5).abs() < f64::EPSILON);
        reader.read_record().unwrap();
        assert!((reader.progress() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_trailing_garbage_without_terminator_dropped() {
        let text = format!("{SIMPLE}0001leftover");
        let mut reader = reader_over(&text);
        assert!(reader.read_record().unwrap().is_some());
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_records_iterator_fuses_after_end() {
        let mut reader = reader_over(SIMPLE);
        {
            let mut records = reader.records();
            assert!(records.next().unwrap().is_ok());
            assert!(records.next().is_none());
            assert!(records.next().is_none());
        }
        // A fresh iterator over the exhausted reader stays empty too.
        assert!(reader.records().next().is_none());
    }

    #[test]
    fn test_open_missing_file_is_stream_init() {
        let err = MarcReader::open("/nonexistent/path/to/records.mrc").unwrap_err();
        assert!(matches!(err, MarcError::StreamInit(_)));
    }

    #[test]
    fn test_open_reads_from_disk() {
        let path = std::env::temp_dir().join("marcex_reader_smoke.mrc");
        std::fs::write(&path, SIMPLE.as_bytes()).unwrap();
        let mut reader = MarcReader::open(&path).unwrap();
        let record = reader.read_record().unwrap().unwrap();
        assert_eq!(record.get_control_field("001"), Some("aaaa"));
        std::fs::remove_file(&path).ok();
    }
}
