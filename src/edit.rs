//! Edit primitives: the untrusted candidate form and the validated [`Edit`].
//!
//! Everything the AI backend proposes arrives as an [`EditCandidate`], where
//! every field is optional. Only the normalizer turns candidates into
//! [`Edit`]s, which carry 1-based inclusive line ranges against the original
//! document.

use serde::{Deserialize, Deserializer};
use xxhash_rust::xxh3::xxh3_64;

/// Verification of the content an edit expects to replace.
///
/// Comparison is whitespace-tolerant at line ends: trailing spaces, tabs and
/// carriage returns on each line are ignored, as are trailing blank lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Normalized text match
    ExactMatch(String),
    /// xxh3 hash of the normalized text (large spans)
    Hash(u64),
}

/// Normalize text for before-content comparison.
pub fn normalize_for_match(text: &str) -> String {
    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.trim_end_matches([' ', '\t', '\r']))
        .collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        let normalized = normalize_for_match(text);
        match self {
            EditVerification::ExactMatch(expected) => normalized == *expected,
            EditVerification::Hash(expected_hash) => {
                xxh3_64(normalized.as_bytes()) == *expected_hash
            }
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        let normalized = normalize_for_match(text);
        if normalized.len() > 1024 {
            EditVerification::Hash(xxh3_64(normalized.as_bytes()))
        } else {
            EditVerification::ExactMatch(normalized)
        }
    }

    /// Expected text, when it is kept verbatim.
    pub fn expected_text(&self) -> Option<&str> {
        match self {
            EditVerification::ExactMatch(text) => Some(text),
            EditVerification::Hash(_) => None,
        }
    }
}

/// A validated line-range replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Position of the originating candidate in the proposed list
    pub index: usize,
    /// First line replaced (1-based, inclusive)
    pub start_line: usize,
    /// Last line replaced (1-based, inclusive)
    pub end_line: usize,
    /// Raw replacement text, split into lines on application
    pub replacement: String,
    /// Why the edit was proposed
    pub rationale: Option<String>,
    /// Content the edit expects to find in `[start_line, end_line]`
    pub expected: Option<EditVerification>,
}

impl Edit {
    pub fn new(start_line: usize, end_line: usize, replacement: impl Into<String>) -> Self {
        Self {
            index: 0,
            start_line,
            end_line,
            replacement: replacement.into(),
            rationale: None,
            expected: None,
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn with_expected(mut self, expected: &str) -> Self {
        self.expected = Some(EditVerification::from_text(expected));
        self
    }

    /// Number of original lines replaced.
    pub fn span(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    pub fn overlaps(&self, other: &Edit) -> bool {
        self.start_line <= other.end_line && other.start_line <= self.end_line
    }
}

/// One untrusted edit proposal, in the JSON schema the fix prompt requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCandidate {
    #[serde(default, alias = "startLine", deserialize_with = "lenient_line")]
    pub line_number: Option<i64>,
    #[serde(default, alias = "endLine", deserialize_with = "lenient_line")]
    pub end_line_number: Option<i64>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub original_code: Option<String>,
    #[serde(default, alias = "replacement")]
    pub suggested_code: Option<String>,
    /// Set when the raw item could not be read at all
    #[serde(skip)]
    pub parse_error: Option<String>,
}

impl EditCandidate {
    pub fn new(line_number: i64, end_line_number: Option<i64>, suggested: &str) -> Self {
        Self {
            line_number: Some(line_number),
            end_line_number,
            suggested_code: Some(suggested.to_string()),
            ..Self::default()
        }
    }

    pub fn with_original(mut self, original: &str) -> Self {
        self.original_code = Some(original.to_string());
        self
    }

    pub fn with_explanation(mut self, explanation: &str) -> Self {
        self.explanation = Some(explanation.to_string());
        self
    }

    /// Candidate standing in for an item that failed to deserialize.
    pub fn unparseable(reason: impl Into<String>) -> Self {
        Self {
            parse_error: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Accept line numbers as JSON integers or numeric strings.
fn lenient_line<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(n)) => Ok(Some(n)),
        Some(Raw::Float(f)) if f.fract() == 0.0 => Ok(Some(f as i64)),
        Some(Raw::Float(f)) => Err(serde::de::Error::custom(format!(
            "line number must be an integer, got {f}"
        ))),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid line number '{s}'"))),
    }
}
