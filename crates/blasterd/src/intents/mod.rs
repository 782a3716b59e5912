//! Voice-assistant intent matching.
//!
//! A request is first simplified against the catalogue's declared intents
//! (synonyms resolved to canonical slot values), then matched against the
//! intents attached to scenarios and commands.

mod matcher;
mod request;

pub use matcher::resolve;
pub use matcher::simplify;
pub use matcher::SimpleIntent;
pub use matcher::Target;
pub use request::VoiceRequest;

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("Intent {0} carries no slots")]
    NoSlots(String),

    #[error("Intent {0} is not declared in the catalogue")]
    UnsupportedIntent(String),

    #[error("Value '{value}' is not supported for slot {slot}")]
    UnsupportedSlotValue { slot: String, value: String },

    #[error("No scenario or command matches intent {0}")]
    NotFound(String),
}
