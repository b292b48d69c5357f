use serde::{Deserialize, Serialize};

use crate::error::{MedEaseError, Result};

/// Upper bound accepted for patient age.
pub const MAX_AGE: u32 = 120;

/// The five fixed sections every guide prompt asks the model for.
pub const GUIDE_SECTIONS: [&str; 5] = [
    "A warm, clear pre-surgery guide.",
    "A checklist of precautions.",
    "Diet and rest instructions.",
    "Common risks or warning signs.",
    "A motivational message for the patient.",
];

/// Patient-reported form fields for one guide submission. Ephemeral: built,
/// turned into a prompt, and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInput {
    pub age: u32,
    pub conditions: String,
    pub medications: String,
    pub surgery_type: String,
    pub notes: String,
}

impl PatientInput {
    /// Validating constructor. Age is the only bounded field; the free-text
    /// fields are accepted as-is, empty included.
    pub fn new(
        age: i64,
        conditions: impl Into<String>,
        medications: impl Into<String>,
        surgery_type: impl Into<String>,
        notes: impl Into<String>,
    ) -> Result<Self> {
        if age < 0 {
            return Err(MedEaseError::InvalidInput(format!(
                "age must not be negative, got {age}"
            )));
        }
        if age > MAX_AGE as i64 {
            return Err(MedEaseError::InvalidInput(format!(
                "age must be at most {MAX_AGE}, got {age}"
            )));
        }
        Ok(Self {
            age: age as u32,
            conditions: conditions.into(),
            medications: medications.into(),
            surgery_type: surgery_type.into(),
            notes: notes.into(),
        })
    }
}

/// Builds the guide-generation prompt from the form fields.
///
/// Total pure function: embeds every field verbatim (empty fields included)
/// together with the five fixed section requests.
pub fn build_guide_prompt(input: &PatientInput) -> String {
    format!(
        "You are an AI assistant helping patients prepare for surgery.\n\
         Patient age: {}\n\
         Health conditions: {}\n\
         Medications: {}\n\
         Surgery type: {}\n\
         Additional info: {}\n\
         \n\
         Provide:\n\
         1. {}\n\
         2. {}\n\
         3. {}\n\
         4. {}\n\
         5. {}\n\
         \n\
         Use markdown formatting and simple tone.",
        input.age,
        input.conditions,
        input.medications,
        input.surgery_type,
        input.notes,
        GUIDE_SECTIONS[0],
        GUIDE_SECTIONS[1],
        GUIDE_SECTIONS[2],
        GUIDE_SECTIONS[3],
        GUIDE_SECTIONS[4],
    )
}

/// Wraps a free-text chat question with the fixed MedEase persona
/// instruction. Total pure function, no validation.
pub fn build_chat_prompt(question: &str) -> String {
    format!(
        "You are MedEase, a gentle, medically accurate AI assistant.\n\
         Patient Question: {question}\n\
         Provide calm, supportive, general surgical guidance with self-care reminders."
    )
}
