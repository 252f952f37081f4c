//! Transaction gate: show the diff, ask once, then commit or discard.
//!
//! Nothing reaches disk unless [`Ui::confirm`] returns `Ok(true)`. A prompt
//! that errors (interrupt, closed input) is treated as a failure, never as
//! consent.

use crate::diff::{diff, Diff};
use crate::document::{Document, DocumentError};
use crate::edit::Edit;
use crate::normalize::Rejection;
use crate::patch::PatchResult;
use std::io;
use thiserror::Error;

pub(crate) const TRACING_TARGET: &str = "midnight_ai::gate";

/// Default confirmation question.
pub const CONFIRM_PROMPT: &str = "Do you want to apply these fixes?";

/// UI collaborator used by the gate.
pub trait Ui {
    /// Present the proposed changes.
    fn render(&mut self, diff: &Diff);

    /// Ask a yes/no question.
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// Terminal outcome of a gated transaction.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "Outcome tells whether anything was written"]
pub enum Outcome {
    /// Patched document was persisted
    Committed {
        applied: Vec<Edit>,
        rejected: Vec<Rejection>,
    },
    /// User declined; nothing was written
    Aborted,
    /// Nothing applicable to confirm; nothing was written
    NoChanges { rejected: Vec<Rejection> },
}

impl Outcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed { .. })
    }
}

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Confirmation prompt failed: {0}")]
    Prompt(#[source] io::Error),

    #[error("Commit failed: {0}")]
    Commit(#[from] DocumentError),
}

/// Render the diff of `patch` against `original`, ask once, commit on yes.
pub fn confirm_and_commit<U, C>(
    original: &Document,
    patch: &PatchResult,
    ui: &mut U,
    commit: C,
) -> Result<Outcome, GateError>
where
    U: Ui + ?Sized,
    C: FnOnce(&Document) -> Result<(), DocumentError>,
{
    let preview = diff(original, &patch.document);

    if !patch.has_applied() || !preview.has_changes() {
        tracing::info!(
            target: TRACING_TARGET,
            rejected = patch.rejected.len(),
            "no applicable changes"
        );
        return Ok(Outcome::NoChanges {
            rejected: patch.rejected.clone(),
        });
    }

    ui.render(&preview);

    let accepted = ui.confirm(CONFIRM_PROMPT).map_err(GateError::Prompt)?;
    if !accepted {
        tracing::info!(target: TRACING_TARGET, "user declined; no changes written");
        return Ok(Outcome::Aborted);
    }

    commit(&patch.document)?;
    tracing::info!(
        target: TRACING_TARGET,
        path = %patch.document.path().display(),
        applied = patch.applied.len(),
        "committed patched document"
    );

    Ok(Outcome::Committed {
        applied: patch.applied.clone(),
        rejected: patch.rejected.clone(),
    })
}

/// Commit callback that writes the document back to its own path.
pub fn commit_to_disk(document: &Document) -> Result<(), DocumentError> {
    document.commit()
}
