//! Error types for model calls

use thiserror::Error;

use crate::auth::TokenError;

/// Why a generation call failed. Each kind is reported distinctly to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Network failure, timeout, or a server-side (5xx) fault
    #[error("transport error: {0}")]
    Transport(String),

    /// Credentials rejected or no access token could be obtained
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Rate limit or quota exhausted
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// Prompt or answer blocked by a safety or content policy
    #[error("blocked by content policy: {0}")]
    Policy(String),

    /// Any other request the service refused, e.g. an unknown corpus
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The response did not have the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    /// Short category label for logs and status lines
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Transport(_) => "transport",
            GenerationError::Auth(_) => "auth",
            GenerationError::Quota(_) => "quota",
            GenerationError::Policy(_) => "policy",
            GenerationError::Api { .. } => "api",
            GenerationError::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            GenerationError::MalformedResponse(error.to_string())
        } else {
            GenerationError::Transport(error.to_string())
        }
    }
}

impl From<TokenError> for GenerationError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Request { .. } => GenerationError::Transport(error.to_string()),
            _ => GenerationError::Auth(error.to_string()),
        }
    }
}

pub type GenerationResult<T> = Result<T, GenerationError>;
