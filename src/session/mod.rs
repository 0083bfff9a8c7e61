//! Session state and turn handling
//!
//! A session is an in-memory, append-only transcript. The turn handler owns it
//! and runs one remote call per user turn.

mod conversation;
mod turn;

pub use conversation::*;
pub use turn::*;
