//! Chat transcript held in memory for one session

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in the transcript. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl ChatTurn {
    fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Ordered, append-only sequence of turns. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
    started_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub(crate) fn push_user(&mut self, content: String) -> &ChatTurn {
        self.push(ChatTurn::new(Role::User, content))
    }

    pub(crate) fn push_assistant(&mut self, content: String) -> &ChatTurn {
        self.push(ChatTurn::new(Role::Assistant, content))
    }

    fn push(&mut self, turn: ChatTurn) -> &ChatTurn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    /// All turns in arrival order
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Counts of user and assistant turns
    pub fn stats(&self) -> SessionStats {
        let user_turns = self.turns.iter().filter(|t| t.role == Role::User).count();
        SessionStats {
            total_turns: self.turns.len(),
            user_turns,
            assistant_turns: self.turns.len() - user_turns,
            elapsed_secs: (Utc::now() - self.started_at).num_seconds(),
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Session statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub total_turns: usize,
    pub user_turns: usize,
    pub assistant_turns: usize,
    pub elapsed_secs: i64,
}

impl SessionStats {
    /// User turns that never got an answer
    pub fn unanswered(&self) -> usize {
        self.user_turns - self.assistant_turns
    }
}
