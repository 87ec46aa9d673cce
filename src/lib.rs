#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Library layout
//!
//! - [`record`] — Core record structures (`Record`, `Field`, `Subfield`)
//! - [`leader`] — The 24-character record leader and its validation
//! - [`parser`] — Deserializing framed records from bytes or strings
//! - [`reader`] — Lazy streaming of records from seekable byte sources
//! - [`writer`] — ISO 2709 serialization
//! - [`extractor`] — The pattern query language and its execution
//! - [`linkage`] — 880 alternate-script field linkage (`$6`)
//! - [`encoding`] — MARC-8/UTF-8 selection and the MARC-8 decoder seam
//! - [`error`] — Error types and the crate `Result`
//!
//! The flow between them: [`MarcReader`] frames one record's bytes out of
//! the stream, [`RecordParser`] decodes and validates them into a
//! [`Record`], and any number of pre-compiled [`PatternExtractor`] plans
//! pull values out of that record.

pub mod encoding;
pub mod error;
pub mod extractor;
pub mod leader;
pub mod linkage;
pub mod parser;
pub mod reader;
/// Core MARC record structures (`Record`, `Field`, `Subfield`)
pub mod record;
pub mod writer;

pub use encoding::{BasicMarc8, Marc8Decode, MarcEncoding};
pub use error::{MarcError, Result};
pub use extractor::{AlternateField, ExtractorOptions, PatternExtractor};
pub use leader::Leader;
pub use linkage::LinkageInfo;
pub use parser::RecordParser;
pub use reader::{MarcReader, Records};
pub use record::{ControlField, DataField, Field, Record, Subfield};
pub use writer::MarcWriter;
