//! Append-only conversation log
//!
//! One log is owned by each request. The user message, every responder
//! fragment, and the supervisor's composed summary are appended in order;
//! nothing is ever removed or rewritten.

use crate::llm::{ContentBlock, LlmMessage, MessageRole};
use crate::supervisor::ResponderName;
use serde::{Serialize, Serializer};
use std::fmt;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Author {
    User,
    Supervisor,
    Responder(ResponderName),
}

impl Author {
    pub fn as_str(self) -> &'static str {
        match self {
            Author::User => "user",
            Author::Supervisor => "supervisor",
            Author::Responder(name) => name.label(),
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Author {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single record in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub author: Author,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            author: Author::User,
            content: content.into(),
        }
    }

    pub fn supervisor(content: impl Into<String>) -> Self {
        Self {
            author: Author::Supervisor,
            content: content.into(),
        }
    }

    pub fn responder(name: ResponderName, content: impl Into<String>) -> Self {
        Self {
            author: Author::Responder(name),
            content: content.into(),
        }
    }
}

/// Ordered, append-only sequence of turns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a log from the user's message
    pub fn from_user_message(message: impl Into<String>) -> Self {
        let mut log = Self::new();
        log.append(Turn::user(message));
        log
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Most recent fragment written by the given responder
    pub fn latest_from(&self, name: ResponderName) -> Option<&Turn> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.author == Author::Responder(name))
    }

    /// Render the log as chat messages.
    ///
    /// User turns become user messages. Responder and supervisor turns become
    /// assistant messages prefixed with their author so the model can tell
    /// which expert wrote which fragment.
    pub fn to_llm_messages(&self) -> Vec<LlmMessage> {
        self.turns
            .iter()
            .map(|turn| match turn.author {
                Author::User => LlmMessage {
                    role: MessageRole::User,
                    content: vec![ContentBlock::text(turn.content.clone())],
                },
                author => LlmMessage {
                    role: MessageRole::Assistant,
                    content: vec![ContentBlock::text(format!("[{author}]\n{}", turn.content))],
                },
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a ConversationLog {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
