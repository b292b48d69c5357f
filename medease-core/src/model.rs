//! Model client boundary: one logical call, send a prompt with the
//! conversation context and get a completion back.
//!
//! The hosted model's own context accumulation is opaque to this system; the
//! only contract is the request/response pair plus the history we pass
//! explicitly on every call.

use async_trait::async_trait;

use crate::chat::ChatTurn;
use crate::error::Result;

/// External model boundary. The conversation handle of the original system is
/// made explicit: `history` carries the prior turns the model should see.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn send_message(&self, prompt: &str, history: &[ChatTurn]) -> Result<String>;
}

#[cfg(feature = "rig")]
pub use rig_client::{DEFAULT_MODEL, RigModelClient};

#[cfg(feature = "rig")]
mod rig_client {
    use async_trait::async_trait;
    use rig::agent::Agent;
    use rig::client::CompletionClient;
    use rig::completion::{Chat, Message};
    use rig::providers::openrouter;
    use tracing::debug;

    use crate::chat::{ChatRole, ChatTurn};
    use crate::error::{MedEaseError, Result};

    use super::ModelClient;

    /// Model identifier used when `MEDEASE_MODEL` is not set.
    pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

    const PREAMBLE: &str =
        "You are MedEase, an AI assistant helping patients prepare for surgery.";

    fn to_rig_message(turn: &ChatTurn) -> Message {
        match turn.role {
            ChatRole::User => Message::user(turn.content.clone()),
            ChatRole::Assistant => Message::assistant(turn.content.clone()),
        }
    }

    fn to_rig_messages(turns: &[ChatTurn]) -> Vec<Message> {
        turns.iter().map(to_rig_message).collect()
    }

    /// `ModelClient` backed by rig's OpenRouter provider, pinned to one model
    /// id and temperature 0.
    pub struct RigModelClient {
        agent: Agent<openrouter::CompletionModel>,
        model: String,
    }

    impl RigModelClient {
        pub fn new(api_key: &str, model: &str) -> Self {
            let client = openrouter::Client::new(api_key);
            let agent = client
                .agent(model)
                .preamble(PREAMBLE)
                .temperature(0.0)
                .build();
            Self {
                agent,
                model: model.to_string(),
            }
        }

        /// Builds a client from `OPENROUTER_API_KEY` and optional
        /// `MEDEASE_MODEL`.
        pub fn from_env() -> anyhow::Result<Self> {
            let api_key = std::env::var("OPENROUTER_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENROUTER_API_KEY not set"))?;
            let model =
                std::env::var("MEDEASE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
            Ok(Self::new(&api_key, &model))
        }

        pub fn model(&self) -> &str {
            &self.model
        }
    }

    #[async_trait]
    impl ModelClient for RigModelClient {
        async fn send_message(&self, prompt: &str, history: &[ChatTurn]) -> Result<String> {
            debug!(model = %self.model, history_len = history.len(), "sending prompt to model");

            let response = self
                .agent
                .chat(prompt, to_rig_messages(history))
                .await
                .map_err(|e| MedEaseError::ModelCall(e.to_string()))?;

            if response.trim().is_empty() {
                return Err(MedEaseError::EmptyModelResponse);
            }
            Ok(response)
        }
    }

}
