use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Role tag for one message in the visible chat transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One role-tagged message in the visible chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only, order-preserving chat transcript shared across clones of a
/// session. Turns are never mutated or removed after creation; strict
/// user/assistant alternation is not enforced.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    turns: Arc<RwLock<Vec<ChatTurn>>>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user_message(&self, content: impl Into<String>) {
        self.turns.write().await.push(ChatTurn::user(content));
    }

    pub async fn add_assistant_message(&self, content: impl Into<String>) {
        self.turns.write().await.push(ChatTurn::assistant(content));
    }

    /// All turns in submission order. Reading is idempotent: repeated calls
    /// yield the same list without duplication or reordering.
    pub async fn all(&self) -> Vec<ChatTurn> {
        self.turns.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.turns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.turns.read().await.is_empty()
    }
}
