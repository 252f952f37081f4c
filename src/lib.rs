//! Midnight AI: AI-assisted smart contract review with safe line-range patching
//!
//! The model proposes fixes as line ranges plus replacement text. This crate
//! turns those untrusted proposals into a verified, previewed, confirmed
//! rewrite of a single file.
//!
//! # Architecture
//!
//! ```text
//! EditCandidate* --normalize--> EditSet --apply--> PatchResult
//!                                                     |
//!                        Document <--commit-- confirm_and_commit --diff--> Ui
//! ```
//!
//! - [`document`]: lines with their own terminators, atomic writes
//! - [`normalize`]: validation, conflict rejection, descending order
//! - [`patch`]: bottom-to-top splicing against original line numbers
//! - [`diff`]: minimal line diff and unified hunks
//! - [`gate`]: one confirmation, then commit or discard
//!
//! The AI backend ([`ai`]) and the report builder ([`report`]) sit outside
//! this core and only produce inputs for it.
//!
//! # Safety
//!
//! - Untrusted candidates are validated field by field; bad ones are reported
//! - Edits that declare their original code are checked before splicing
//! - Nothing is written before explicit confirmation
//! - Atomic file writes (tempfile + fsync + rename)
//!
//! # Example
//!
//! ```
//! use midnight_ai::{apply_candidates, diff, Document, EditCandidate};
//!
//! let doc = Document::from_text("Token.ts", "a\nb\nc\n");
//! let result = apply_candidates(
//!     &doc,
//!     &[
//!         EditCandidate::new(1, Some(1), "X\n"),
//!         EditCandidate::new(2, Some(3), "Y\nZ\n"),
//!     ],
//! );
//! assert_eq!(result.document.to_text(), "X\nY\nZ\n");
//! assert_eq!(diff(&doc, &result.document).stats().added, 3);
//! ```

pub mod ai;
pub mod config;
pub mod diff;
pub mod document;
pub mod edit;
pub mod gate;
pub mod normalize;
pub mod patch;
pub mod report;

// Re-exports
pub use ai::{propose_edits, AiError, ChatSession, GeminiClient, Model};
pub use config::{AppConfig, ConfigError};
pub use diff::{
    diff, render_unified, Diff, DiffError, DiffLine, DiffTag, Hunk, NO_NEWLINE_MARKER,
};
pub use document::{Document, DocumentError, Line, LineEnding};
pub use edit::{Edit, EditCandidate, EditVerification};
pub use gate::{commit_to_disk, confirm_and_commit, GateError, Outcome, Ui};
pub use normalize::{normalize, EditSet, Normalized, RejectReason, Rejection};
pub use patch::{apply, apply_candidates, PatchResult};
pub use report::{generate_report, AuditReport, SectionBody};
