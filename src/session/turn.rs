//! Per-turn handling: Idle -> AwaitingResponse -> Idle

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    llm::{Citation, GenerateRequest, GenerationError, GenerationResponse, GenerationResult, LlmProvider},
    session::ChatSession,
};

/// Where the handler is in a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingResponse,
}

/// Submission refused before any remote call is made
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("still waiting for the previous answer")]
    Busy,

    #[error("no turn is in flight")]
    NotAwaiting,
}

/// Result of one turn, as the UI renders it
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Answered {
        answer: String,
        citations: Vec<Citation>,
    },
    Failed {
        error: GenerationError,
    },
}

impl TurnOutcome {
    pub fn answer(&self) -> Option<&str> {
        match self {
            TurnOutcome::Answered { answer, .. } => Some(answer),
            TurnOutcome::Failed { .. } => None,
        }
    }

    /// Citations to show, or `None` when there is nothing to put in a sources panel
    pub fn sources(&self) -> Option<&[Citation]> {
        match self {
            TurnOutcome::Answered { citations, .. } if !citations.is_empty() => Some(citations),
            _ => None,
        }
    }

    /// Inline error line for a failed turn
    pub fn error_message(&self) -> Option<String> {
        match self {
            TurnOutcome::Failed { error } => Some(format!("Error generating response: {}", error)),
            TurnOutcome::Answered { .. } => None,
        }
    }
}

/// Owns the session and drives one turn at a time against an injected model
pub struct TurnHandler {
    session: ChatSession,
    provider: Arc<dyn LlmProvider>,
    state: TurnState,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl TurnHandler {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            session: ChatSession::new(),
            provider,
            state: TurnState::Idle,
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Generation settings applied to every request
    pub fn with_generation(mut self, temperature: Option<f32>, max_output_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn provider(&self) -> Arc<dyn LlmProvider> {
        Arc::clone(&self.provider)
    }

    /// Record the user turn and build the request for it
    pub fn begin_turn(&mut self, prompt: &str) -> Result<GenerateRequest, TurnError> {
        if self.state == TurnState::AwaitingResponse {
            return Err(TurnError::Busy);
        }
        if prompt.trim().is_empty() {
            return Err(TurnError::EmptyPrompt);
        }

        self.session.push_user(prompt.to_string());
        self.state = TurnState::AwaitingResponse;
        debug!("Turn {} started", self.session.len());

        Ok(GenerateRequest {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            ..GenerateRequest::new(prompt)
        })
    }

    /// Close the in-flight turn. A failure leaves the user turn without a reply.
    pub fn finish_turn(
        &mut self,
        result: GenerationResult<GenerationResponse>,
    ) -> Result<TurnOutcome, TurnError> {
        if self.state != TurnState::AwaitingResponse {
            return Err(TurnError::NotAwaiting);
        }
        self.state = TurnState::Idle;

        match result {
            Ok(response) => {
                self.session.push_assistant(response.text.clone());
                info!(
                    "Turn answered with {} citations ({} tokens)",
                    response.citations.len(),
                    response.usage.total_tokens
                );
                Ok(TurnOutcome::Answered {
                    answer: response.text,
                    citations: response.citations,
                })
            }
            Err(error) => {
                warn!("Turn failed ({}): {}", error.kind(), error);
                Ok(TurnOutcome::Failed { error })
            }
        }
    }

    /// Run a whole turn: record the prompt, call the model, record the answer
    pub async fn handle_turn(&mut self, prompt: &str) -> Result<TurnOutcome, TurnError> {
        let request = self.begin_turn(prompt)?;
        let result = self.provider.generate_content(request).await;
        self.finish_turn(result)
    }
}
