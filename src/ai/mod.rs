//! AI collaborator: the generative backend behind a narrow [`Model`] trait.
//!
//! The patch core never talks to the backend. Callers use
//! [`propose_edits`] to turn source code into untrusted [`EditCandidate`]s
//! and hand those to the normalizer.

pub mod chat;
pub mod gemini;
pub mod parse;
pub mod prompts;

pub use chat::{ChatCommand, ChatError, ChatSession};
pub use gemini::GeminiClient;
pub use parse::{parse_edit_candidates, sanitize_reply};

use crate::edit::EditCandidate;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AiError {
    #[error("API key not set: export {var} or add it to .env")]
    MissingApiKey { var: String },

    #[error("Model access error ({status}): {message}")]
    ModelAccess { status: u16, message: String },

    #[error("AI backend returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not parse AI response: {message}")]
    InvalidResponse { message: String },

    #[error("AI backend returned no content")]
    EmptyResponse,
}

impl AiError {
    /// Steps that usually resolve a [`AiError::ModelAccess`] failure.
    pub fn guidance(&self) -> Option<&'static [&'static str]> {
        match self {
            AiError::ModelAccess { .. } => Some(&[
                "Ensure billing is enabled on your Google Cloud project.",
                "Check that the Generative Language API is enabled.",
                "Verify your project has access to the configured model.",
            ]),
            AiError::MissingApiKey { .. } => {
                Some(&["Create a .env file with GEMINI_API_KEY=<your key>."])
            }
            _ => None,
        }
    }
}

/// Generative backend.
pub trait Model {
    /// One-shot completion.
    fn generate(&self, prompt: &str) -> Result<String, AiError>;

    /// Completion over a conversation history; the last turn is the user's.
    fn chat(&self, history: &[Turn]) -> Result<String, AiError>;
}

impl<M: Model + ?Sized> Model for &M {
    fn generate(&self, prompt: &str) -> Result<String, AiError> {
        (**self).generate(prompt)
    }

    fn chat(&self, history: &[Turn]) -> Result<String, AiError> {
        (**self).chat(history)
    }
}

impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role.as_str(), self.text)
    }
}

/// Ask the model for fixes to `code` and parse its reply.
pub fn propose_edits<M: Model + ?Sized>(
    model: &M,
    code: &str,
    language: &str,
) -> Result<Vec<EditCandidate>, AiError> {
    let reply = model.generate(&prompts::fix_prompt(code, language))?;
    let candidates = parse_edit_candidates(&reply)?;
    tracing::debug!(candidates = candidates.len(), "received edit proposals");
    Ok(candidates)
}
