//! Pattern-driven field extraction.
//!
//! [`PatternExtractor`] compiles a compact query language — modeled on the
//! Traject convention — into a plan that can be run against any number of
//! records.
//!
//! # Query language
//!
//! A query is one or more patterns separated by `:`. Each pattern starts
//! with a three-digit tag and continues according to the field class:
//!
//! - **Control fields** (tag below 010) take an optional character range:
//!   `005` selects the whole data string, `005[5]` the character at
//!   position 5, `005[0-7]` positions 0 through 7 inclusive.
//! - **Data fields** (tag 010 and above) take optional indicators and
//!   subfield codes: `245a` selects every `$a`, `270|1*|b` selects `$b`
//!   from 270 fields whose first indicator is `1` (the `*` matches any
//!   second indicator), and a bare `270` selects every subfield. A code
//!   repeated in the pattern (`270aa`) joins that field's occurrences
//!   into one space-separated value.
//!
//! # Examples
//!
//! ```ignore
//! use marcex::{ExtractorOptions, PatternExtractor};
//!
//! let authors = PatternExtractor::new("100a:700a", ExtractorOptions::default())?;
//! let values = authors.extract(&record);
//! ```
//!
//! A compiled extractor is immutable and can be shared across threads;
//! extraction never fails — any record produces a (possibly empty) list of
//! values.

use crate::error::{MarcError, Result};
use crate::record::{DataField, Field, Record};
use indexmap::IndexSet;
use std::collections::HashSet;

/// How linked 880 (alternate-script) fields participate in extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlternateField {
    /// Visit the named tag's fields, then the 880 fields linked to it.
    #[default]
    Include,
    /// Visit only the named tag's fields.
    DontInclude,
    /// Visit only the 880 fields linked to the named tag.
    Only,
}

/// Options controlling extraction post-processing.
///
/// # Examples
///
/// ```ignore
/// let options = ExtractorOptions::default()
///     .with_first(true)
///     .with_trim_punctuation(true);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExtractorOptions {
    /// Return only the first value produced; later patterns are not run.
    pub first: bool,
    /// Trim common leading/trailing cataloging punctuation from each value.
    pub trim_punctuation: bool,
    /// Returned as the single value when extraction produces nothing.
    pub default: Option<String>,
    /// When false (the default), repeated values are suppressed.
    pub allow_duplicates: bool,
    /// When present, all values from a single field are joined with this
    /// separator into one string.
    pub separator: Option<String>,
    /// Linked 880 handling.
    pub alternate_field: AlternateField,
}

impl ExtractorOptions {
    /// Return only the first value produced.
    #[must_use]
    pub fn with_first(mut self, first: bool) -> Self {
        self.first = first;
        self
    }

    /// Trim common cataloging punctuation from each value.
    #[must_use]
    pub fn with_trim_punctuation(mut self, trim: bool) -> Self {
        self.trim_punctuation = trim;
        self
    }

    /// Value returned when extraction produces nothing.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Keep repeated values instead of deduplicating.
    #[must_use]
    pub fn with_allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    /// Join all values from a single field with this separator.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    /// Set the linked-880 policy.
    #[must_use]
    pub fn with_alternate_field(mut self, alternate_field: AlternateField) -> Self {
        self.alternate_field = alternate_field;
        self
    }
}

/// One compiled pattern of a query.
#[derive(Debug, Clone)]
enum Subplan {
    /// Control-field pattern: tag plus optional character selection.
    Control { tag: String, slice: Option<Slice> },
    /// Data-field pattern: tag, optional indicator matchers, subfield
    /// selectors in pattern order.
    Data {
        tag: String,
        indicators: Option<(char, char)>,
        codes: Vec<CodeSelector>,
    },
}

/// Character selection within a control field's data.
#[derive(Debug, Clone, Copy)]
enum Slice {
    /// A single zero-based character position.
    Index(usize),
    /// An inclusive character range.
    Range(usize, usize),
}

/// One subfield code of a data-field pattern. The wildcard `'*'` selects
/// every subfield; `join_repeats` is set when the code appeared more than
/// once in the pattern.
#[derive(Debug, Clone, Copy)]
struct CodeSelector {
    code: char,
    join_repeats: bool,
}

/// A compiled extraction query.
///
/// Compilation happens once in [`PatternExtractor::new`]; running the plan
/// with [`PatternExtractor::extract`] cannot fail.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    subplans: Vec<Subplan>,
    options: ExtractorOptions,
}

impl PatternExtractor {
    /// Compile a query.
    ///
    /// Empty patterns between colons are dropped; a query with no patterns
    /// at all is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidPattern`] naming the offending pattern
    /// and the reason it was rejected.
    pub fn new(query: &str, options: ExtractorOptions) -> Result<Self> {
        let subplans: Vec<Subplan> = query
            .split(':')
            .filter(|pattern| !pattern.is_empty())
            .map(compile_pattern)
            .collect::<Result<_>>()?;
        if subplans.is_empty() {
            return Err(invalid(query, "query contains no patterns"));
        }
        Ok(PatternExtractor { subplans, options })
    }

    /// Run the compiled plan against a record.
    ///
    /// Values are produced in pattern order, then field order, then
    /// subfield order. Post-processing follows the options: deduplication,
    /// punctuation trimming, per-field joining, first-only, and the
    /// empty-result default.
    #[must_use]
    pub fn extract(&self, record: &Record) -> Vec<String> {
        let mut values: Vec<String> = Vec::new();

        for subplan in &self.subplans {
            match subplan {
                Subplan::Control { tag, slice } => {
                    self.run_control(record, tag, *slice, &mut values);
                },
                Subplan::Data {
                    tag,
                    indicators,
                    codes,
                } => {
                    self.run_data(record, tag, *indicators, codes, &mut values);
                },
            }
            if self.options.first && !values.is_empty() {
                values.truncate(1);
                break;
            }
        }

        if !self.options.allow_duplicates {
            let distinct: IndexSet<String> = values.into_iter().collect();
            values = distinct.into_iter().collect();
        }
        if values.is_empty() {
            if let Some(default) = &self.options.default {
                values.push(default.clone());
            }
        }
        values
    }

    fn run_control(
        &self,
        record: &Record,
        tag: &str,
        slice: Option<Slice>,
        values: &mut Vec<String>,
    ) {
        // Control fields can repeat (006 for example), and repeated values
        // within one pattern dedup across all of them.
        let mut seen: HashSet<String> = HashSet::new();
        for field in record.fields_by_tag(tag) {
            let Some(control) = field.as_control() else {
                continue;
            };
            let Some(value) = slice_value(&control.data, slice) else {
                continue;
            };
            if !self.options.allow_duplicates && !seen.insert(value.clone()) {
                continue;
            }
            values.push(self.postprocess(value));
            if self.options.first {
                return;
            }
        }
    }

    fn run_data(
        &self,
        record: &Record,
        tag: &str,
        indicators: Option<(char, char)>,
        codes: &[CodeSelector],
        values: &mut Vec<String>,
    ) {
        let mut visit: Vec<&DataField> = Vec::new();
        if self.options.alternate_field != AlternateField::Only {
            visit.extend(record.fields_by_tag(tag).filter_map(Field::as_data));
        }
        if self.options.alternate_field != AlternateField::DontInclude {
            visit.extend(record.linked_880_fields(tag));
        }

        for field in visit {
            if let Some((want1, want2)) = indicators {
                if !indicator_matches(want1, field.indicator1)
                    || !indicator_matches(want2, field.indicator2)
                {
                    continue;
                }
            }

            let mut field_values: Vec<String> = Vec::new();
            let mut seen: HashSet<String> = HashSet::new();
            for selector in codes {
                let mut bucket: Vec<String> = Vec::new();
                for subfield in field.subfields_by_code(selector.code) {
                    if !self.options.allow_duplicates && !seen.insert(subfield.value.clone()) {
                        continue;
                    }
                    bucket.push(self.postprocess(subfield.value.clone()));
                }
                if selector.join_repeats {
                    if !bucket.is_empty() {
                        field_values.push(bucket.join(" "));
                    }
                } else {
                    field_values.append(&mut bucket);
                }
            }

            if let Some(separator) = &self.options.separator {
                if !field_values.is_empty() {
                    field_values = vec![field_values.join(separator)];
                }
            }
            values.append(&mut field_values);

            if self.options.first && !values.is_empty() {
                return;
            }
        }
    }

    fn postprocess(&self, value: String) -> String {
        if self.options.trim_punctuation {
            trim_punctuation(&value).to_string()
        } else {
            value
        }
    }
}

/// Whether a pattern indicator matches a field indicator. `'*'` matches
/// anything.
fn indicator_matches(wanted: char, actual: char) -> bool {
    wanted == '*' || wanted == actual
}

/// Select characters from a control field's data. Positions beyond the
/// data select nothing rather than failing.
fn slice_value(data: &str, slice: Option<Slice>) -> Option<String> {
    match slice {
        None => Some(data.to_string()),
        Some(Slice::Index(position)) => data.chars().nth(position).map(String::from),
        Some(Slice::Range(start, end)) => {
            if end < start {
                return None;
            }
            let selected: String = data.chars().skip(start).take(end - start + 1).collect();
            if selected.is_empty() {
                None
            } else {
                Some(selected)
            }
        },
    }
}

/// Trim leading and trailing runs of ASCII whitespace and the terminal
/// punctuation conventional in MARC cataloging. Internal punctuation is
/// preserved.
#[must_use]
pub fn trim_punctuation(value: &str) -> &str {
    const PUNCTUATION: &[char] = &['.', ',', ';', ':', '/', '\\', '=', '+'];
    value.trim_matches(|c: char| c.is_ascii_whitespace() || PUNCTUATION.contains(&c))
}

fn invalid(pattern: &str, reason: impl Into<String>) -> MarcError {
    MarcError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

fn compile_pattern(pattern: &str) -> Result<Subplan> {
    let chars: Vec<char> = pattern.chars().collect();
    if chars.len() < 3 {
        return Err(invalid(pattern, "pattern is shorter than a 3-character tag"));
    }

    let tag: String = chars[..3].iter().collect();
    let tag_value: u32 = tag
        .parse()
        .map_err(|_| invalid(pattern, format!("tag '{tag}' is not numeric")))?;
    let rest = &chars[3..];

    // Bracketed ranges are the control-field form.
    if rest.first() == Some(&'[') {
        if tag_value >= 10 {
            return Err(invalid(
                pattern,
                "character ranges only apply to control fields (tag below 010)",
            ));
        }
        if rest.last() != Some(&']') || rest.len() < 3 {
            return Err(invalid(pattern, "unmatched or empty range brackets"));
        }
        let interior: String = rest[1..rest.len() - 1].iter().collect();
        let slice = match interior.split_once('-') {
            None => Slice::Index(parse_position(pattern, &interior)?),
            Some((start, end)) => Slice::Range(
                parse_position(pattern, start)?,
                parse_position(pattern, end)?,
            ),
        };
        return Ok(Subplan::Control {
            tag,
            slice: Some(slice),
        });
    }

    if tag_value < 10 {
        if rest.is_empty() {
            return Ok(Subplan::Control { tag, slice: None });
        }
        return Err(invalid(
            pattern,
            "indicators and subfield codes only apply to data fields (tag 010 and above)",
        ));
    }

    // Data-field form: optional |xy| indicators, then subfield codes.
    let mut position = 0;
    let mut indicators = None;
    if rest.first() == Some(&'|') {
        if rest.len() < 4 || rest[3] != '|' {
            return Err(invalid(
                pattern,
                "indicators must be exactly two characters wrapped in '|'",
            ));
        }
        for &indicator in &rest[1..3] {
            let valid = indicator == '*'
                || indicator == ' '
                || indicator.is_ascii_lowercase()
                || indicator.is_ascii_digit();
            if !valid {
                return Err(invalid(
                    pattern,
                    format!("indicator '{indicator}' is not blank, lowercase alphanumeric, or '*'"),
                ));
            }
        }
        indicators = Some((rest[1], rest[2]));
        position = 4;
    }

    let mut codes: Vec<CodeSelector> = Vec::new();
    for &code in &rest[position..] {
        if !code.is_ascii_lowercase() && !code.is_ascii_digit() {
            return Err(invalid(
                pattern,
                format!("unrecognized subfield code '{code}'"),
            ));
        }
        match codes.iter_mut().find(|selector| selector.code == code) {
            Some(selector) => selector.join_repeats = true,
            None => codes.push(CodeSelector {
                code,
                join_repeats: false,
            }),
        }
    }
    if codes.is_empty() {
        codes.push(CodeSelector {
            code: '*',
            join_repeats: false,
        });
    }

    Ok(Subplan::Data {
        tag,
        indicators,
        codes,
    })
}

fn parse_position(pattern: &str, digits: &str) -> Result<usize> {
    digits
        .parse()
        .map_err(|_| invalid(pattern, format!("range position '{digits}' is not numeric")))
}
