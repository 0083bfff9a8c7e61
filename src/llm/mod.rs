//! Hosted model access
//!
//! This module binds the RAG retrieval tool, talks to Gemini on Vertex AI,
//! and turns its responses into answer text plus citations or a typed error.

pub mod errors;
pub mod provider;
pub mod retrieval;
pub mod types;
pub mod vertex;

pub use errors::*;
pub use provider::*;
pub use retrieval::*;
pub use types::*;
pub use vertex::*;
