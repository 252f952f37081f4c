//! Line store: a text document held as lines that remember their terminators.
//!
//! Reassembling a [`Document`] with [`Document::to_text`] reproduces the
//! original bytes exactly, including a final line without a newline and
//! `\r\n` endings.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub(crate) const TRACING_TARGET: &str = "midnight_ai::document";

/// Line terminator carried by a [`Line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LineEnding {
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// One line of a document: payload without terminator, plus the terminator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Line {
    pub text: String,
    pub ending: Option<LineEnding>,
}

impl Line {
    pub fn new(text: impl Into<String>, ending: Option<LineEnding>) -> Self {
        Self {
            text: text.into(),
            ending,
        }
    }

    /// Line terminated by `\n`.
    pub fn lf(text: impl Into<String>) -> Self {
        Self::new(text, Some(LineEnding::Lf))
    }

    /// Line without a terminator (only valid as the last line).
    pub fn bare(text: impl Into<String>) -> Self {
        Self::new(text, None)
    }

    pub fn is_terminated(&self) -> bool {
        self.ending.is_some()
    }

    /// Byte length including the terminator.
    pub fn len(&self) -> usize {
        self.text.len() + self.ending.map_or(0, |e| e.as_str().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)?;
        if let Some(ending) = self.ending {
            f.write_str(ending.as_str())?;
        }
        Ok(())
    }
}

/// Split text into lines, keeping each line's own terminator.
///
/// A trailing segment without newline becomes an unterminated line; text
/// ending in a newline yields no empty trailing line. Empty text yields no
/// lines.
pub fn split_lines(text: &str) -> Vec<Line> {
    text.split_inclusive('\n')
        .map(|chunk| {
            if let Some(body) = chunk.strip_suffix("\r\n") {
                Line::new(body, Some(LineEnding::CrLf))
            } else if let Some(body) = chunk.strip_suffix('\n') {
                Line::new(body, Some(LineEnding::Lf))
            } else {
                Line::bare(chunk)
            }
        })
        .collect()
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("File not found or unreadable: {path}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("File is not valid UTF-8: {path}")]
    Utf8 {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Line {line} out of range (document has {line_count} lines)")]
    LineOutOfRange { line: usize, line_count: usize },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A text document identified by its originating path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    lines: Vec<Line>,
}

impl Document {
    /// Read a document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| DocumentError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|source| DocumentError::Utf8 {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            target: TRACING_TARGET,
            path = %path.display(),
            bytes = text.len(),
            "loaded document"
        );
        Ok(Self::from_text(path, &text))
    }

    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            lines: split_lines(text),
        }
    }

    pub fn from_lines(path: impl Into<PathBuf>, lines: Vec<Line>) -> Self {
        Self {
            path: path.into(),
            lines,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<Line> {
        self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 1-based line access.
    pub fn line(&self, number: usize) -> Option<&Line> {
        number.checked_sub(1).and_then(|idx| self.lines.get(idx))
    }

    /// Replace the payload of a 1-based line, keeping its terminator.
    pub fn set_line_text(
        &mut self,
        number: usize,
        text: impl Into<String>,
    ) -> Result<(), DocumentError> {
        let line_count = self.lines.len();
        let line = number
            .checked_sub(1)
            .and_then(|idx| self.lines.get_mut(idx))
            .ok_or(DocumentError::LineOutOfRange {
                line: number,
                line_count,
            })?;
        line.text = text.into();
        Ok(())
    }

    /// Concatenated text of the 1-based inclusive range `[start, end]`.
    pub fn slice_text(&self, start: usize, end: usize) -> Result<String, DocumentError> {
        if start == 0 || start > end || end > self.lines.len() {
            return Err(DocumentError::LineOutOfRange {
                line: if start == 0 { start } else { end },
                line_count: self.lines.len(),
            });
        }
        Ok(self.lines[start - 1..end]
            .iter()
            .map(Line::to_string)
            .collect())
    }

    /// Reassemble the exact text of the document.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.lines.iter().map(Line::len).sum());
        for line in &self.lines {
            out.push_str(&line.text);
            if let Some(ending) = line.ending {
                out.push_str(ending.as_str());
            }
        }
        out
    }

    /// Persist to `path` atomically.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        atomic_write(path, self.to_text().as_bytes()).map_err(|source| DocumentError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            target: TRACING_TARGET,
            path = %path.display(),
            lines = self.lines.len(),
            "wrote document"
        );
        Ok(())
    }

    /// Persist back to the originating path.
    pub fn commit(&self) -> Result<(), DocumentError> {
        self.write(&self.path)
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the original file is left as it was.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    // Keep the target's permissions
    if let Ok(meta) = fs::metadata(path) {
        temp.as_file().set_permissions(meta.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    filetime::set_file_mtime(path, filetime::FileTime::now())?;

    Ok(())
}
