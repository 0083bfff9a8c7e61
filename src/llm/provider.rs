//! Provider trait for hosted models

use async_trait::async_trait;

use crate::llm::{
    errors::GenerationResult,
    types::{GenerateRequest, GenerationResponse},
};

/// A hosted model with its tools already attached
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one prompt and wait for the full answer
    async fn generate_content(&self, request: GenerateRequest) -> GenerationResult<GenerationResponse>;

    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the model name
    fn model(&self) -> &str;
}
