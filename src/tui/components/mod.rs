//! Widgets that make up the chat screen

pub mod input;
pub mod spinner;
pub mod transcript;

pub use input::ChatInput;
pub use spinner::Spinner;
pub use transcript::{Transcript, TranscriptView};
