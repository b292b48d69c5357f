pub mod chat;
pub mod companion;
pub mod document;
pub mod error;
pub mod model;
pub mod prompt;
pub mod session;

// Re-export commonly used types
pub use chat::{ChatHistory, ChatRole, ChatTurn};
pub use companion::Companion;
pub use document::{GUIDE_FILENAME, render_guide_pdf};
pub use error::{MedEaseError, Result};
pub use model::ModelClient;
#[cfg(feature = "rig")]
pub use model::{DEFAULT_MODEL, RigModelClient};
pub use prompt::{GUIDE_SECTIONS, MAX_AGE, PatientInput, build_chat_prompt, build_guide_prompt};
pub use session::{InMemorySessionStorage, Session, SessionStorage};
