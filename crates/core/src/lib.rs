pub mod chat;
pub mod controller;
pub mod error;
pub mod memory;
pub mod mood;
pub mod prompts;
pub mod session_state;
pub mod speech;
pub mod transcriber;

pub use controller::{Action, CompanionController};
pub use error::CompanionError;
pub use session_state::SessionState;
