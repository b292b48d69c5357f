use thiserror::Error;

/// Errors surfaced by the companion core.
///
/// External-call failures (`ModelCall`, `EmptyModelResponse`) are recoverable:
/// the caller is expected to surface them with a retry affordance rather than
/// abort the session.
#[derive(Error, Debug)]
pub enum MedEaseError {
    #[error("invalid patient input: {0}")]
    InvalidInput(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session {0} already has a request in flight")]
    SessionBusy(String),

    #[error("no guide has been generated for session {0}")]
    NoGuide(String),

    #[error("model call failed: {0}")]
    ModelCall(String),

    #[error("model returned an empty response")]
    EmptyModelResponse,

    #[error("document rendering failed: {0}")]
    Document(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, MedEaseError>;
