//! Common types for model calls

use serde::{Deserialize, Serialize};

/// Label used when a citation carries no locator
pub const INTERNAL_SOURCE_LABEL: &str = "Internal RAG DB";

/// A grounding citation derived from a model response.
/// Read-only and kept only as long as it is displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: Option<String>,
    pub source_locator: Option<String>,
}

impl Citation {
    pub fn new(title: Option<String>, source_locator: Option<String>) -> Self {
        Self { title, source_locator }
    }

    /// Title to show, falling back to the 1-based chunk position
    pub fn display_title(&self, index: usize) -> String {
        self.title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Chunk {}", index + 1))
    }

    pub fn display_locator(&self) -> &str {
        self.source_locator
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(INTERNAL_SOURCE_LABEL)
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// A single generation request. Only the latest prompt is sent; history stays local.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Answer from the model plus any grounding citations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    pub citations: Vec<Citation>,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}
