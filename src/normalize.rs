//! Edit normalizer: untrusted candidates in, a disjoint descending [`EditSet`] out.
//!
//! # Rules
//!
//! 1. A candidate without `lineNumber` or `suggestedCode` is malformed.
//! 2. `endLineNumber` defaults to `lineNumber`.
//! 3. Line numbers outside `1..=line_count` are rejected, never clamped.
//! 4. Overlapping ranges conflict: the lower-numbered edit stays, the higher
//!    one is rejected. Equal start lines keep the first proposal.
//! 5. The accepted set is ordered by `start_line` descending, so applying it
//!    front to back never shifts a line number that is still to be visited.

use crate::document::Document;
use crate::edit::{Edit, EditCandidate, EditVerification};
use std::fmt;

pub(crate) const TRACING_TARGET: &str = "midnight_ai::normalize";

/// Why a candidate edit was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Missing or invalid fields
    Malformed { message: String },
    /// Line numbers outside the document
    OutOfRange {
        start_line: i64,
        end_line: i64,
        line_count: usize,
    },
    /// Overlaps an edit that was kept
    Conflict {
        kept_index: usize,
        kept_start: usize,
        kept_end: usize,
    },
    /// Declared original content no longer matches the document
    Stale {
        expected: Option<String>,
        found: String,
        /// Normalized Levenshtein similarity between expected and found, 0..=1
        similarity: Option<f64>,
    },
}

impl RejectReason {
    /// Short category label.
    pub fn kind(&self) -> &'static str {
        match self {
            RejectReason::Malformed { .. } => "malformed",
            RejectReason::OutOfRange { .. } => "out of range",
            RejectReason::Conflict { .. } => "conflict",
            RejectReason::Stale { .. } => "stale",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Malformed { message } => write!(f, "malformed edit: {message}"),
            RejectReason::OutOfRange {
                start_line,
                end_line,
                line_count,
            } => write!(
                f,
                "lines {start_line}-{end_line} out of range (document has {line_count} lines)"
            ),
            RejectReason::Conflict {
                kept_index,
                kept_start,
                kept_end,
            } => write!(
                f,
                "overlaps edit #{} at lines {kept_start}-{kept_end}",
                kept_index + 1
            ),
            RejectReason::Stale { similarity, .. } => match similarity {
                Some(score) => write!(
                    f,
                    "original code no longer matches the file ({:.0}% similar)",
                    score * 100.0
                ),
                None => write!(f, "original code no longer matches the file"),
            },
        }
    }
}

/// A dropped candidate, identified by its position in the proposed list.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub index: usize,
    pub explanation: Option<String>,
    pub reason: RejectReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edit #{}: {}", self.index + 1, self.reason)
    }
}

/// Validated, conflict-free edits in descending `start_line` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSet {
    edits: Vec<Edit>,
}

impl EditSet {
    pub fn iter(&self) -> std::slice::Iter<'_, Edit> {
        self.edits.iter()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn as_slice(&self) -> &[Edit] {
        &self.edits
    }

    pub fn into_vec(self) -> Vec<Edit> {
        self.edits
    }
}

impl<'a> IntoIterator for &'a EditSet {
    type Item = &'a Edit;
    type IntoIter = std::slice::Iter<'a, Edit>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.iter()
    }
}

/// Output of [`normalize`].
#[derive(Debug, Clone, Default)]
#[must_use = "Normalized edits and rejections should be inspected"]
pub struct Normalized {
    pub edits: EditSet,
    pub rejected: Vec<Rejection>,
}

impl Normalized {
    /// Nothing survived validation ("no applicable changes", not an error).
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Validate candidates against `document` and order the survivors.
pub fn normalize(candidates: &[EditCandidate], document: &Document) -> Normalized {
    let line_count = document.line_count();
    let mut accepted = Vec::with_capacity(candidates.len());
    let mut rejected = Vec::new();

    for (index, candidate) in candidates.iter().enumerate() {
        match validate_candidate(index, candidate, line_count) {
            Ok(edit) => accepted.push(edit),
            Err(reason) => rejected.push(Rejection {
                index,
                explanation: candidate.explanation.clone(),
                reason,
            }),
        }
    }

    // Ascending walk keeps the lower-numbered edit of each overlapping pair
    accepted.sort_by_key(|edit| (edit.start_line, edit.index));

    let mut kept: Vec<Edit> = Vec::with_capacity(accepted.len());
    for edit in accepted {
        if let Some(last) = kept.last() {
            if edit.start_line <= last.end_line {
                rejected.push(Rejection {
                    index: edit.index,
                    explanation: edit.rationale.clone(),
                    reason: RejectReason::Conflict {
                        kept_index: last.index,
                        kept_start: last.start_line,
                        kept_end: last.end_line,
                    },
                });
                continue;
            }
        }
        kept.push(edit);
    }

    kept.reverse();
    rejected.sort_by_key(|r| r.index);

    for rejection in &rejected {
        tracing::warn!(
            target: TRACING_TARGET,
            index = rejection.index,
            kind = rejection.reason.kind(),
            "rejected edit candidate: {}",
            rejection.reason
        );
    }
    tracing::debug!(
        target: TRACING_TARGET,
        accepted = kept.len(),
        rejected = rejected.len(),
        "normalized edit candidates"
    );

    Normalized {
        edits: EditSet { edits: kept },
        rejected,
    }
}

fn validate_candidate(
    index: usize,
    candidate: &EditCandidate,
    line_count: usize,
) -> Result<Edit, RejectReason> {
    if let Some(message) = &candidate.parse_error {
        return Err(RejectReason::Malformed {
            message: message.clone(),
        });
    }

    let start = candidate.line_number.ok_or_else(|| RejectReason::Malformed {
        message: "missing field 'lineNumber'".to_string(),
    })?;
    let replacement = candidate
        .suggested_code
        .as_ref()
        .ok_or_else(|| RejectReason::Malformed {
            message: "missing field 'suggestedCode'".to_string(),
        })?;
    let end = candidate.end_line_number.unwrap_or(start);

    if end < start {
        return Err(RejectReason::Malformed {
            message: format!("end line {end} precedes start line {start}"),
        });
    }

    let out_of_range = RejectReason::OutOfRange {
        start_line: start,
        end_line: end,
        line_count,
    };
    let (Ok(start_line), Ok(end_line)) = (usize::try_from(start), usize::try_from(end)) else {
        return Err(out_of_range);
    };
    if start_line < 1 || end_line > line_count {
        return Err(out_of_range);
    }

    Ok(Edit {
        index,
        start_line,
        end_line,
        replacement: replacement.clone(),
        rationale: candidate.explanation.clone(),
        expected: candidate
            .original_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
            .map(EditVerification::from_text),
    })
}
