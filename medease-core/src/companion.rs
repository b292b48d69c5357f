//! Companion – orchestrator that loads a session, runs exactly one guide or
//! chat operation against the model, and persists the updated session back to
//! storage.
//!
//! Interactive services want to run one operation per request, send the
//! response back, and have the session saved for the next roundtrip; the
//! `Companion` makes that a one-liner per handler.

use std::sync::Arc;

use tracing::{info, warn};

use crate::chat::ChatTurn;
use crate::document::render_guide_pdf;
use crate::error::{MedEaseError, Result};
use crate::model::ModelClient;
use crate::prompt::{PatientInput, build_chat_prompt, build_guide_prompt};
use crate::session::{Session, SessionStorage};

/// High-level helper pairing session storage with the model client.
#[derive(Clone)]
pub struct Companion {
    storage: Arc<dyn SessionStorage>,
    model: Arc<dyn ModelClient>,
}

impl Companion {
    pub fn new(storage: Arc<dyn SessionStorage>, model: Arc<dyn ModelClient>) -> Self {
        Self { storage, model }
    }

    /// Explicit session init: creates and persists a fresh session.
    pub async fn start_session(&self) -> Result<Session> {
        let session = Session::new();
        info!(session_id = %session.id, "starting session");
        self.storage.save(session.clone()).await?;
        Ok(session)
    }

    /// Explicit session discard.
    pub async fn end_session(&self, session_id: &str) -> Result<()> {
        info!(session_id = %session_id, "ending session");
        self.storage.delete(session_id).await
    }

    async fn load(&self, session_id: &str) -> Result<Session> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| MedEaseError::SessionNotFound(session_id.to_string()))
    }

    /// Guide flow: validate input, build the templated prompt, make one
    /// blocking model call, store the guide on the session.
    ///
    /// The session's transcript is passed as conversation context but the
    /// guide exchange is not appended to it; the transcript stays the visible
    /// chat log only.
    pub async fn generate_guide(&self, session_id: &str, input: PatientInput) -> Result<String> {
        let mut session = self.load(session_id).await?;
        let _guard = session.try_begin_request()?;

        info!(session_id = %session_id, surgery_type = %input.surgery_type, "generating guide");

        let prompt = build_guide_prompt(&input);
        let context = session.history.all().await;
        let guide = self.model.send_message(&prompt, &context).await?;

        session.guide = Some(guide.clone());
        self.storage.save(session).await?;

        Ok(guide)
    }

    /// Chat flow: append the user turn, make one model call with the prior
    /// transcript as context, append the assistant turn.
    ///
    /// The user turn is appended before the call is issued; on model failure
    /// it stays in the transcript and no assistant turn is appended.
    pub async fn chat(&self, session_id: &str, message: &str) -> Result<String> {
        if message.trim().is_empty() {
            return Err(MedEaseError::InvalidInput(
                "chat message cannot be empty".to_string(),
            ));
        }

        let session = self.load(session_id).await?;
        let _guard = session.try_begin_request()?;

        let context = session.history.all().await;
        session.history.add_user_message(message).await;
        self.storage.save(session.clone()).await?;

        let prompt = build_chat_prompt(message);
        let reply = match self.model.send_message(&prompt, &context).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "chat model call failed");
                return Err(e);
            }
        };

        session.history.add_assistant_message(reply.clone()).await;
        self.storage.save(session).await?;

        Ok(reply)
    }

    /// Renders the stored guide as PDF bytes.
    pub async fn render_document(&self, session_id: &str) -> Result<Vec<u8>> {
        let session = self.load(session_id).await?;
        let guide = session
            .guide
            .as_deref()
            .ok_or_else(|| MedEaseError::NoGuide(session_id.to_string()))?;
        render_guide_pdf(guide)
    }

    /// Full ordered transcript for rendering.
    pub async fn transcript(&self, session_id: &str) -> Result<Vec<ChatTurn>> {
        let session = self.load(session_id).await?;
        Ok(session.history.all().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatRole;
    use crate::session::InMemorySessionStorage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted stand-in for the hosted model: records every prompt it sees
    /// together with the transcript length at call time.
    struct ScriptedModel {
        reply: String,
        fail: bool,
        calls: Mutex<Vec<(String, usize)>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                fail: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: String::new(),
                fail: true,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn send_message(&self, prompt: &str, history: &[ChatTurn]) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), history.len()));
            if self.fail {
                return Err(MedEaseError::ModelCall("connection refused".to_string()));
            }
            Ok(self.reply.clone())
        }
    }

    fn companion_with(model: Arc<ScriptedModel>) -> Companion {
        Companion::new(Arc::new(InMemorySessionStorage::new()), model)
    }

    #[tokio::test]
    async fn test_guide_flow_end_to_end() {
        let model = Arc::new(ScriptedModel::replying("Your personalized guide."));
        let companion = companion_with(model.clone());
        let session = companion.start_session().await.unwrap();

        let input =
            PatientInput::new(45, "diabetes", "metformin", "knee replacement", "").unwrap();
        let guide = companion.generate_guide(&session.id, input).await.unwrap();
        assert_eq!(guide, "Your personalized guide.");

        // The prompt sent to the model carried the form fields
        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("knee replacement"));
        assert!(calls[0].0.contains("diabetes"));

        // Guide stored for document download, transcript untouched
        drop(calls);
        let pdf = companion.render_document(&session.id).await.unwrap();
        assert_eq!(&pdf[0..4], b"%PDF");
        assert!(companion.transcript(&session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_appends_user_turn_before_call_and_assistant_after() {
        let model = Arc::new(ScriptedModel::replying("Light meals are fine until midnight."));
        let companion = companion_with(model.clone());
        let session = companion.start_session().await.unwrap();

        let reply = companion
            .chat(&session.id, "Can I eat before surgery?")
            .await
            .unwrap();
        assert_eq!(reply, "Light meals are fine until midnight.");

        let turns = companion.transcript(&session.id).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], ChatTurn::user("Can I eat before surgery?"));
        assert_eq!(turns[1].role, ChatRole::Assistant);

        // Second turn: the model sees the prior transcript as context
        companion.chat(&session.id, "And water?").await.unwrap();
        let calls = model.calls.lock().unwrap();
        assert_eq!(calls[1].1, 2);
    }

    #[tokio::test]
    async fn test_chat_failure_keeps_user_turn_and_no_assistant_turn() {
        let companion = companion_with(Arc::new(ScriptedModel::failing()));
        let session = companion.start_session().await.unwrap();

        let err = companion
            .chat(&session.id, "Can I eat before surgery?")
            .await
            .unwrap_err();
        assert!(matches!(err, MedEaseError::ModelCall(_)));

        let turns = companion.transcript(&session.id).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_invalid_age_rejected_before_model_call() {
        let model = Arc::new(ScriptedModel::replying("unused"));
        let companion = companion_with(model.clone());
        let session = companion.start_session().await.unwrap();

        let err = PatientInput::new(-1, "", "", "", "").unwrap_err();
        assert!(matches!(err, MedEaseError::InvalidInput(_)));

        // Nothing reached the model
        drop(session);
        assert!(model.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_chat_message_rejected() {
        let model = Arc::new(ScriptedModel::replying("unused"));
        let companion = companion_with(model.clone());
        let session = companion.start_session().await.unwrap();

        let err = companion.chat(&session.id, "   ").await.unwrap_err();
        assert!(matches!(err, MedEaseError::InvalidInput(_)));
        assert!(model.calls.lock().unwrap().is_empty());
        assert!(companion.transcript(&session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_document_before_guide_is_rejected() {
        let companion = companion_with(Arc::new(ScriptedModel::replying("unused")));
        let session = companion.start_session().await.unwrap();

        let err = companion.render_document(&session.id).await.unwrap_err();
        assert!(matches!(err, MedEaseError::NoGuide(_)));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let companion = companion_with(Arc::new(ScriptedModel::replying("unused")));
        let err = companion.chat("missing", "hello").await.unwrap_err();
        assert!(matches!(err, MedEaseError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_end_session_discards_state() {
        let companion = companion_with(Arc::new(ScriptedModel::replying("ok")));
        let session = companion.start_session().await.unwrap();

        companion.chat(&session.id, "hello").await.unwrap();
        companion.end_session(&session.id).await.unwrap();

        let err = companion.transcript(&session.id).await.unwrap_err();
        assert!(matches!(err, MedEaseError::SessionNotFound(_)));
    }

    /// Model that parks until released, so a request can be held in flight.
    struct BlockingModel {
        started: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl ModelClient for BlockingModel {
        async fn send_message(&self, _prompt: &str, _history: &[ChatTurn]) -> Result<String> {
            self.started.notify_one();
            self.release.notified().await;
            Ok("done".to_string())
        }
    }

    #[tokio::test]
    async fn test_second_submission_rejected_while_in_flight() {
        let model = Arc::new(BlockingModel {
            started: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let companion = Companion::new(Arc::new(InMemorySessionStorage::new()), model.clone());
        let session = companion.start_session().await.unwrap();

        let in_flight = tokio::spawn({
            let companion = companion.clone();
            let session_id = session.id.clone();
            async move { companion.chat(&session_id, "first").await }
        });
        model.started.notified().await;

        let err = companion.chat(&session.id, "second").await.unwrap_err();
        assert!(matches!(err, MedEaseError::SessionBusy(_)));

        model.release.notify_one();
        let reply = in_flight.await.unwrap().unwrap();
        assert_eq!(reply, "done");

        // Only the first submission made it into the transcript
        let turns = companion.transcript(&session.id).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], ChatTurn::user("first"));
    }

    #[tokio::test]
    async fn test_guide_regeneration_overwrites_previous() {
        let model = Arc::new(ScriptedModel::replying("second guide"));
        let companion = companion_with(model);
        let session = companion.start_session().await.unwrap();

        let input = PatientInput::new(45, "", "", "hip replacement", "").unwrap();
        companion
            .generate_guide(&session.id, input.clone())
            .await
            .unwrap();
        let guide = companion.generate_guide(&session.id, input).await.unwrap();
        assert_eq!(guide, "second guide");
    }
}
