//! Request/response chat session over a [`Model`].

use crate::ai::{prompts, AiError, Model, Turn};
use std::fs;
use std::io;
use std::path::Path;

/// What a line of user input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Exit,
    /// `load file <path>` or `read file <path>`
    LoadFile(String),
    Message(String),
    Empty,
}

impl ChatCommand {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return ChatCommand::Empty;
        }
        if trimmed.eq_ignore_ascii_case("exit") {
            return ChatCommand::Exit;
        }

        let lower = trimmed.to_ascii_lowercase();
        for prefix in ["load file ", "read file "] {
            if lower.starts_with(prefix) {
                let path = trimmed[prefix.len()..].trim();
                if !path.is_empty() {
                    return ChatCommand::LoadFile(path.to_string());
                }
            }
        }

        ChatCommand::Message(trimmed.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Could not read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Ai(#[from] AiError),
}

/// Conversation history owned by the caller; each call is one round trip.
pub struct ChatSession<'m, M: Model + ?Sized> {
    model: &'m M,
    history: Vec<Turn>,
}

impl<'m, M: Model + ?Sized> ChatSession<'m, M> {
    pub fn new(model: &'m M) -> Self {
        Self {
            model,
            history: Vec::new(),
        }
    }

    /// Open the conversation with the system prompt and optional file context.
    pub fn start(&mut self, context: Option<(&str, &str)>) -> Result<String, AiError> {
        let mut opening = prompts::chat_system_prompt();
        if let Some((path, content)) = context {
            opening.push_str("\n\n");
            opening.push_str(&prompts::file_context_prompt(path, content, true));
        }
        self.send(&opening)
    }

    /// Send one user message and return the model's reply.
    ///
    /// A failed request leaves the history unchanged.
    pub fn send(&mut self, text: &str) -> Result<String, AiError> {
        self.history.push(Turn::user(text));
        match self.model.chat(&self.history) {
            Ok(reply) => {
                self.history.push(Turn::model(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }

    /// Read `path` and add it to the conversation.
    pub fn load_file(&mut self, path: &str) -> Result<String, ChatError> {
        let content = fs::read_to_string(Path::new(path)).map_err(|source| ChatError::File {
            path: path.to_string(),
            source,
        })?;
        Ok(self.send(&prompts::file_context_prompt(path, &content, false))?)
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::ScriptedModel;
    use crate::ai::Role;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ChatCommand::parse("EXIT"), ChatCommand::Exit);
        assert_eq!(ChatCommand::parse("  "), ChatCommand::Empty);
        assert_eq!(
            ChatCommand::parse("Load File src/Token.ts"),
            ChatCommand::LoadFile("src/Token.ts".into())
        );
        assert_eq!(
            ChatCommand::parse("read file  a b.ts "),
            ChatCommand::LoadFile("a b.ts".into())
        );
        assert_eq!(
            ChatCommand::parse("load file"),
            ChatCommand::Message("load file".into())
        );
        assert_eq!(
            ChatCommand::parse("what does line 3 do?"),
            ChatCommand::Message("what does line 3 do?".into())
        );
    }

    #[test]
    fn test_history_alternates() {
        let model = ScriptedModel::new(["ready", "answer"]);
        let mut session = ChatSession::new(&model);
        session.start(None).unwrap();
        assert_eq!(session.send("question").unwrap(), "answer");
        let roles: Vec<Role> = session.history().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model, Role::User, Role::Model]);
    }

    #[test]
    fn test_failed_send_keeps_history() {
        let model = ScriptedModel::new(["ready"]);
        let mut session = ChatSession::new(&model);
        session.start(None).unwrap();
        assert!(session.send("question").is_err());
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_load_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("Token.ts");
        fs::write(&path, "contract Token {}").unwrap();
        let path = path.to_str().unwrap();

        let model = ScriptedModel::new(["loaded"]);
        let mut session = ChatSession::new(&model);
        assert_eq!(session.load_file(path).unwrap(), "loaded");
        assert!(model.prompts.borrow()[0].contains("contract Token {}"));

        assert!(matches!(
            session.load_file("/definitely/missing.ts"),
            Err(ChatError::File { .. })
        ));
    }

    #[test]
    fn test_start_with_context() {
        let model = ScriptedModel::new(["ok"]);
        let mut session = ChatSession::new(&model);
        session.start(Some(("a.ts", "let x = 1;"))).unwrap();
        let first = &model.prompts.borrow()[0];
        assert!(first.contains("provided the following file"));
        assert!(first.contains("let x = 1;"));
    }
}
