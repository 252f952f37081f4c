//! Line-level diff between an original and a patched document.
//!
//! Uses Myers' algorithm from `similar` without a deadline, which yields a
//! deterministic, minimal edit script. The diff is plain data: rendering is
//! left to the caller (see [`render_unified`] for a plain-text form).

use crate::document::{Document, Line};
use similar::{capture_diff_slices, group_diff_ops, Algorithm, ChangeTag, DiffOp};
use std::fmt::Write as _;
use std::ops::Range;
use thiserror::Error;

/// Marker line following a line that has no terminator.
pub const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Role of a line in the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffTag {
    Context,
    Added,
    Removed,
}

impl DiffTag {
    /// Unified diff prefix character.
    pub fn sign(self) -> char {
        match self {
            DiffTag::Context => ' ',
            DiffTag::Added => '+',
            DiffTag::Removed => '-',
        }
    }
}

impl From<ChangeTag> for DiffTag {
    fn from(tag: ChangeTag) -> Self {
        match tag {
            ChangeTag::Equal => DiffTag::Context,
            ChangeTag::Insert => DiffTag::Added,
            ChangeTag::Delete => DiffTag::Removed,
        }
    }
}

/// One tagged line, with 1-based positions in the old and new documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub tag: DiffTag,
    pub line: Line,
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
}

/// A unified-diff hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 0-based half-open range in the old document
    pub old_range: Range<usize>,
    /// 0-based half-open range in the new document
    pub new_range: Range<usize>,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    /// `@@ -a,b +c,d @@` header.
    pub fn header(&self) -> String {
        format!(
            "@@ -{} +{} @@",
            format_range(&self.old_range),
            format_range(&self.new_range)
        )
    }
}

fn format_range(range: &Range<usize>) -> String {
    match range.len() {
        0 => format!("{},0", range.start),
        1 => format!("{}", range.start + 1),
        len => format!("{},{}", range.start + 1, len),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DiffError {
    #[error("Diff does not match document at line {line}: expected {expected:?}, found {found:?}")]
    Mismatch {
        line: usize,
        expected: String,
        found: Option<String>,
    },

    #[error("Diff covers {covered} lines but document has {line_count}")]
    LengthMismatch { covered: usize, line_count: usize },
}

/// Full line diff of two documents, including unchanged lines.
#[derive(Debug, Clone)]
pub struct Diff {
    old: Vec<Line>,
    new: Vec<Line>,
    ops: Vec<DiffOp>,
    lines: Vec<DiffLine>,
}

/// Compute the diff from `original` to `patched`.
pub fn diff(original: &Document, patched: &Document) -> Diff {
    let old = original.lines().to_vec();
    let new = patched.lines().to_vec();
    let ops = capture_diff_slices(Algorithm::Myers, &old, &new);
    let lines = collect_lines(&ops, &old, &new);
    Diff {
        old,
        new,
        ops,
        lines,
    }
}

fn collect_lines(ops: &[DiffOp], old: &[Line], new: &[Line]) -> Vec<DiffLine> {
    ops.iter()
        .flat_map(|op| op.iter_changes(old, new))
        .map(|change| DiffLine {
            tag: change.tag().into(),
            old_line: change.old_index().map(|i| i + 1),
            new_line: change.new_index().map(|i| i + 1),
            line: change.value(),
        })
        .collect()
}

impl Diff {
    /// Every line of both documents in diff order.
    pub fn lines(&self) -> &[DiffLine] {
        &self.lines
    }

    pub fn has_changes(&self) -> bool {
        self.lines.iter().any(|l| l.tag != DiffTag::Context)
    }

    pub fn stats(&self) -> DiffStats {
        self.lines
            .iter()
            .fold(DiffStats::default(), |mut stats, l| {
                match l.tag {
                    DiffTag::Added => stats.added += 1,
                    DiffTag::Removed => stats.removed += 1,
                    DiffTag::Context => {}
                }
                stats
            })
    }

    /// Group changes into hunks with `context` unchanged lines around them.
    pub fn hunks(&self, context: usize) -> Vec<Hunk> {
        if !self.has_changes() {
            return Vec::new();
        }
        group_diff_ops(self.ops.clone(), context)
            .into_iter()
            .filter_map(|group| {
                let first = group.first()?;
                let last = group.last()?;
                Some(Hunk {
                    old_range: first.old_range().start..last.old_range().end,
                    new_range: first.new_range().start..last.new_range().end,
                    lines: collect_lines(&group, &self.old, &self.new),
                })
            })
            .collect()
    }

    /// Replay this diff onto `original`, checking every context and removed
    /// line against it.
    pub fn apply_to(&self, original: &Document) -> Result<Document, DiffError> {
        let source = original.lines();
        let mut cursor = 0;
        let mut out = Vec::with_capacity(self.new.len());

        for diff_line in &self.lines {
            match diff_line.tag {
                DiffTag::Added => out.push(diff_line.line.clone()),
                DiffTag::Context | DiffTag::Removed => {
                    let found = source.get(cursor);
                    if found != Some(&diff_line.line) {
                        return Err(DiffError::Mismatch {
                            line: cursor + 1,
                            expected: diff_line.line.to_string(),
                            found: found.map(Line::to_string),
                        });
                    }
                    if diff_line.tag == DiffTag::Context {
                        out.push(diff_line.line.clone());
                    }
                    cursor += 1;
                }
            }
        }

        if cursor != source.len() {
            return Err(DiffError::LengthMismatch {
                covered: cursor,
                line_count: source.len(),
            });
        }

        Ok(Document::from_lines(original.path(), out))
    }
}

/// Render a plain-text unified diff.
pub fn render_unified(diff: &Diff, path: &str, context: usize) -> String {
    let mut out = String::new();
    let hunks = diff.hunks(context);
    if hunks.is_empty() {
        return out;
    }

    let _ = writeln!(out, "--- a/{path}");
    let _ = writeln!(out, "+++ b/{path}");
    for hunk in hunks {
        let _ = writeln!(out, "{}", hunk.header());
        for line in &hunk.lines {
            out.push(line.tag.sign());
            out.push_str(&line.line.text);
            match line.line.ending {
                Some(ending) => out.push_str(ending.as_str()),
                None => {
                    let _ = writeln!(out, "\n{NO_NEWLINE_MARKER}");
                }
            }
        }
    }
    out
}
