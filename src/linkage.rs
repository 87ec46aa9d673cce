//! Linkage support for MARC 880 (Alternate Graphical Representation) fields.
//!
//! An 880 field carries an alternate-script rendering of another field,
//! linked through subfield `$6`. The `$6` value has the shape `TTT-NN`
//! where `TTT` is the tag of the linked field and `NN` is an occurrence
//! counter, optionally followed by a script code and a right-to-left flag:
//!
//! - `100: $6 880-01 $a Smith, John`
//! - `880: $6 100-01 $a سميث، جون`
//!
//! Extraction pairs fields by tag only; the occurrence counter is parsed
//! but not consulted for matching.

use regex::Regex;
use std::sync::OnceLock;

/// Information extracted from a MARC `$6` (Linkage) subfield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkageInfo {
    /// Tag of the linked field (e.g. "245" inside an 880's `$6`).
    pub tag: String,
    /// Occurrence number pairing the two fields (e.g. "01").
    pub occurrence: String,
    /// Whether the right-to-left flag (`/r`) is present.
    pub is_reverse: bool,
}

fn linkage_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{3})-(\d{2,3})(?:/[a-zA-Z0-9$(),]+)?(?:/r)?").expect("valid regex")
    })
}

impl LinkageInfo {
    /// Parse a `$6` value of the shape `TTT-NN[/script][/r]`.
    ///
    /// Returns `None` when the value does not start with a well-formed
    /// linkage.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let info = LinkageInfo::parse("245-02/r").unwrap();
    /// assert_eq!(info.tag, "245");
    /// assert_eq!(info.occurrence, "02");
    /// ```
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let caps = linkage_pattern().captures(value)?;
        Some(LinkageInfo {
            tag: caps.get(1)?.as_str().to_string(),
            occurrence: caps.get(2)?.as_str().to_string(),
            is_reverse: value.ends_with("/r"),
        })
    }

    /// Whether this linkage points at the given tag.
    #[must_use]
    pub fn links_to(&self, tag: &str) -> bool {
        self.tag == tag
    }
}

/// Whether a raw `$6` value links to the given tag.
///
/// Well-formed values are matched through [`LinkageInfo::parse`]; values
/// that do not parse fall back to a plain tag-prefix comparison, which is
/// all the pairing contract requires.
#[must_use]
pub fn links_to(subfield6: &str, tag: &str) -> bool {
    match LinkageInfo::parse(subfield6) {
        Some(info) => info.links_to(tag),
        None => subfield6.starts_with(tag),
    }
}
