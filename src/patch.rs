//! Patch engine: splices an [`EditSet`] into a working copy of a document.
//!
//! Edits arrive in descending `start_line` order. Each splice only moves
//! lines at or after its own range, and every edit still to be applied lies
//! strictly above that range, so the original line numbers stay valid for
//! the whole pass without offset tracking.

use crate::document::{split_lines, Document, Line};
use crate::edit::{Edit, EditCandidate};
use crate::normalize::{normalize, EditSet, RejectReason, Rejection};

pub(crate) const TRACING_TARGET: &str = "midnight_ai::patch";

/// New document state plus the bookkeeping of what happened to each edit.
#[derive(Debug, Clone)]
#[must_use = "PatchResult holds the patched document; nothing is written yet"]
pub struct PatchResult {
    pub document: Document,
    /// Edits spliced in, in application (descending) order
    pub applied: Vec<Edit>,
    /// Edits refused while applying
    pub rejected: Vec<Rejection>,
}

impl PatchResult {
    pub fn has_applied(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Apply `edits` to a copy of `document`.
pub fn apply(document: &Document, edits: &EditSet) -> PatchResult {
    let mut lines: Vec<Line> = document.lines().to_vec();
    let mut applied = Vec::with_capacity(edits.len());
    let mut rejected = Vec::new();

    let mut lowest_visited = usize::MAX;
    for edit in edits {
        debug_assert!(
            edit.end_line < lowest_visited,
            "edit set must be disjoint and descending"
        );
        lowest_visited = edit.start_line;

        // The set may have been normalized against a different document
        if edit.end_line > document.line_count() {
            tracing::warn!(
                target: TRACING_TARGET,
                index = edit.index,
                end_line = edit.end_line,
                line_count = document.line_count(),
                "edit beyond end of document"
            );
            rejected.push(Rejection {
                index: edit.index,
                explanation: edit.rationale.clone(),
                reason: RejectReason::OutOfRange {
                    start_line: edit.start_line as i64,
                    end_line: edit.end_line as i64,
                    line_count: document.line_count(),
                },
            });
            continue;
        }

        let start = edit.start_line - 1;
        let end = edit.end_line;

        if let Some(expected) = &edit.expected {
            let found: String = lines[start..end].iter().map(Line::to_string).collect();
            if !expected.matches(&found) {
                let similarity = expected
                    .expected_text()
                    .map(|text| strsim::normalized_levenshtein(text, found.trim_end()));
                tracing::warn!(
                    target: TRACING_TARGET,
                    index = edit.index,
                    start_line = edit.start_line,
                    end_line = edit.end_line,
                    "stale edit: original code does not match"
                );
                rejected.push(Rejection {
                    index: edit.index,
                    explanation: edit.rationale.clone(),
                    reason: RejectReason::Stale {
                        expected: expected.expected_text().map(str::to_string),
                        found,
                        similarity,
                    },
                });
                continue;
            }
        }

        let replacement = replacement_lines(&edit.replacement, &lines[end - 1]);
        tracing::debug!(
            target: TRACING_TARGET,
            index = edit.index,
            start_line = edit.start_line,
            end_line = edit.end_line,
            new_lines = replacement.len(),
            "splicing edit"
        );
        lines.splice(start..end, replacement);
        applied.push(edit.clone());
    }

    rejected.sort_by_key(|r| r.index);

    PatchResult {
        document: Document::from_lines(document.path(), lines),
        applied,
        rejected,
    }
}

/// Normalize untrusted `candidates` and apply the survivors.
///
/// Rejections from both stages are merged, ordered by candidate position.
pub fn apply_candidates(document: &Document, candidates: &[EditCandidate]) -> PatchResult {
    let normalized = normalize(candidates, document);
    let mut result = apply(document, &normalized.edits);
    result.rejected.extend(normalized.rejected);
    result.rejected.sort_by_key(|r| r.index);
    result
}

/// Split replacement text into lines.
///
/// When the text does not end in a terminator, its last line takes the
/// terminator of `last_replaced`, so the patched region neither fuses with
/// the following line nor gains a newline the file never had.
fn replacement_lines(text: &str, last_replaced: &Line) -> Vec<Line> {
    let mut lines = split_lines(text);
    if let Some(last) = lines.last_mut() {
        if last.ending.is_none() {
            last.ending = last_replaced.ending;
        }
    }
    lines
}
