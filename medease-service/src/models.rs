use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medease_core::ChatTurn;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

/// Form fields for one guide submission. Age arrives as a signed integer so
/// out-of-range values reach validation instead of failing deserialization.
#[derive(Debug, Serialize, Deserialize)]
pub struct GuideRequest {
    pub age: i64,
    #[serde(default)]
    pub conditions: String,
    #[serde(default)]
    pub medications: String,
    #[serde(default)]
    pub surgery_type: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuideResponse {
    pub session_id: String,
    pub guide: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub turns: Vec<ChatTurn>,
}
