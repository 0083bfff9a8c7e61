use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    errors::{GenerationError, GenerationResult},
    provider::LlmProvider,
    retrieval::RetrievalTool,
    types::{Citation, GenerateRequest, GenerationResponse, TokenUsage},
};
use crate::auth::AccessTokenProvider;

/// Finish reasons that mean the answer was withheld by policy
const POLICY_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Where and what to call
#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project_id: String,
    pub location: String,
    pub model: String,
    pub api_endpoint: Option<String>,
}

/// Gemini on Vertex AI with a RAG retrieval tool attached
pub struct VertexProvider {
    client: Client,
    url: String,
    model: String,
    tool: RetrievalTool,
    tokens: Arc<dyn AccessTokenProvider>,
}

/// Request body for `:generateContent`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexRequest<'a> {
    contents: Vec<VertexContent>,
    tools: Vec<&'a RetrievalTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VertexContent {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<VertexPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VertexPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VertexResponse {
    #[serde(default)]
    candidates: Vec<VertexCandidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VertexCandidate {
    content: Option<VertexContent>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingChunk {
    web: Option<ChunkSource>,
    retrieved_context: Option<ChunkSource>,
}

#[derive(Debug, Deserialize)]
struct ChunkSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl From<GroundingChunk> for Citation {
    fn from(chunk: GroundingChunk) -> Self {
        match chunk.retrieved_context.or(chunk.web) {
            Some(source) => Citation::new(source.title, source.uri),
            None => Citation::new(None, None),
        }
    }
}

impl VertexProvider {
    pub fn new(
        config: VertexConfig,
        tool: RetrievalTool,
        tokens: Arc<dyn AccessTokenProvider>,
        client: Client,
    ) -> Self {
        let base = Self::base_url(&config.location, config.api_endpoint.as_deref());
        let url = format!(
            "{}projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            base, config.project_id, config.location, config.model
        );

        Self {
            client,
            url,
            model: config.model,
            tool,
            tokens,
        }
    }

    /// Regional endpoint, or the override, always ending in `/`
    pub fn base_url(location: &str, api_endpoint: Option<&str>) -> String {
        let mut base = match api_endpoint {
            Some(endpoint) => endpoint.to_string(),
            None if location == "global" => "https://aiplatform.googleapis.com/v1/".to_string(),
            None => format!("https://{}-aiplatform.googleapis.com/v1/", location),
        };
        if !base.ends_with('/') {
            base.push('/');
        }
        base
    }

    /// Full `:generateContent` URL
    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_body(&self, request: &GenerateRequest) -> VertexRequest<'_> {
        let generation_config = if request.temperature.is_some() || request.max_output_tokens.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            })
        } else {
            None
        };

        VertexRequest {
            contents: vec![VertexContent {
                role: Some("user".to_string()),
                parts: vec![VertexPart { text: Some(request.prompt.clone()) }],
            }],
            tools: vec![&self.tool],
            generation_config,
        }
    }

    /// Turn an HTTP status and body into a typed result
    fn parse_response(status: u16, body: &str) -> GenerationResult<GenerationResponse> {
        if !(200..300).contains(&status) {
            return Err(Self::classify_error(status, body));
        }

        let response: VertexResponse = serde_json::from_str(body)
            .map_err(|e| GenerationError::MalformedResponse(format!("undecodable body: {}", e)))?;

        if let Some(feedback) = response.prompt_feedback {
            if let Some(reason) = feedback.block_reason {
                let detail = feedback.block_reason_message.unwrap_or_default();
                return Err(GenerationError::Policy(format!("prompt blocked ({}) {}", reason, detail).trim_end().to_string()));
            }
        }

        let usage = response
            .usage_metadata
            .map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::MalformedResponse("response has no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(match candidate.finish_reason.as_deref() {
                Some(reason) if POLICY_FINISH_REASONS.contains(&reason) => {
                    GenerationError::Policy(format!("answer withheld ({})", reason))
                }
                _ => GenerationError::MalformedResponse("candidate has no text part".to_string()),
            });
        }

        let citations = candidate
            .grounding_metadata
            .map(|m| m.grounding_chunks.into_iter().map(Citation::from).collect())
            .unwrap_or_default();

        Ok(GenerationResponse {
            text,
            citations,
            usage,
            finish_reason: candidate.finish_reason,
        })
    }

    fn classify_error(status: u16, body: &str) -> GenerationError {
        let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => (envelope.error.message, envelope.error.status),
            Err(_) => (body.trim().to_string(), None),
        };

        match (status, api_status.as_deref()) {
            (429, _) | (_, Some("RESOURCE_EXHAUSTED")) => GenerationError::Quota(message),
            (401, _) | (403, _) => GenerationError::Auth(message),
            (408, _) | (500..=599, _) => GenerationError::Transport(format!("{}: {}", status, message)),
            _ => GenerationError::Api { status, message },
        }
    }
}

#[async_trait]
impl LlmProvider for VertexProvider {
    async fn generate_content(&self, request: GenerateRequest) -> GenerationResult<GenerationResponse> {
        let token = self.tokens.access_token().await?;
        let body = self.build_body(&request);

        debug!("Sending Vertex AI request to: {}", self.url());

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;

        let result = Self::parse_response(status, &text);
        match &result {
            Ok(response) => info!(
                "Vertex AI answered with {} citations, {} tokens",
                response.citations.len(),
                response.usage.total_tokens
            ),
            Err(e) => warn!("Vertex AI call failed ({}): {}", e.kind(), e),
        }
        result
    }

    fn name(&self) -> &str {
        "vertex"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ServiceAccountKey, ServiceAccountTokenSource, StaticToken, TEST_KEY_JSON};
    use crate::llm::retrieval::{CorpusRef, RetrievalConfig};
    use serde_json::json;
    use std::path::Path;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str =
        "/v1/projects/p/locations/europe-west1/publishers/google/models/gemini-2.0-flash-001:generateContent";

    fn provider_with(location: &str, endpoint: Option<&str>, tokens: Arc<dyn AccessTokenProvider>) -> VertexProvider {
        let retrieval = RetrievalConfig::new(CorpusRef::resolve("p", location, "123"), 3);
        VertexProvider::new(
            VertexConfig {
                project_id: "p".to_string(),
                location: location.to_string(),
                model: "gemini-2.0-flash-001".to_string(),
                api_endpoint: endpoint.map(str::to_string),
            },
            RetrievalTool::bind(&retrieval),
            tokens,
            Client::new(),
        )
    }

    fn provider(location: &str, endpoint: Option<&str>) -> VertexProvider {
        provider_with(location, endpoint, Arc::new(StaticToken("token")))
    }

    fn mock_provider(server: &MockServer) -> VertexProvider {
        provider("europe-west1", Some(&format!("{}/v1/", server.uri())))
    }

    #[test]
    fn test_regional_url() {
        assert_eq!(
            provider("europe-west1", None).url(),
            "https://europe-west1-aiplatform.googleapis.com/v1/projects/p/locations/europe-west1/publishers/google/models/gemini-2.0-flash-001:generateContent"
        );
    }

    #[test]
    fn test_global_and_override_base() {
        assert_eq!(VertexProvider::base_url("global", None), "https://aiplatform.googleapis.com/v1/");
        assert_eq!(
            VertexProvider::base_url("europe-west1", Some("http://localhost:8080/v1")),
            "http://localhost:8080/v1/"
        );
        assert!(provider("us-central1", Some("http://localhost:8080/v1/"))
            .url()
            .starts_with("http://localhost:8080/v1/projects/p/locations/us-central1/"));
    }

    #[test]
    fn test_request_body_sends_only_the_prompt() {
        let provider = provider("europe-west1", None);
        let body = serde_json::to_value(provider.build_body(&GenerateRequest::new("What is the refund policy?"))).unwrap();

        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "What is the refund policy?");
        assert_eq!(
            body["tools"][0]["retrieval"]["vertexRagStore"]["ragRetrievalConfig"]["topK"],
            3
        );
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_request_body_generation_config() {
        let provider = provider("europe-west1", None);
        let request = GenerateRequest {
            prompt: "hi".into(),
            temperature: Some(0.2),
            max_output_tokens: Some(512),
        };
        let body = serde_json::to_value(provider.build_body(&request)).unwrap();
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn test_parse_answer_with_rag_citations() {
        let body = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "30 " }, { "text": "days." }] },
                "finishReason": "STOP",
                "groundingMetadata": {
                    "groundingChunks": [
                        { "retrievedContext": { "title": "Policy.pdf", "uri": "gs://docs/Policy.pdf", "text": "..." } },
                        { "retrievedContext": { "text": "no title or uri" } }
                    ]
                }
            }],
            "usageMetadata": { "promptTokenCount": 7, "candidatesTokenCount": 3, "totalTokenCount": 10 }
        });

        let response = VertexProvider::parse_response(200, &body.to_string()).unwrap();
        assert_eq!(response.text, "30 days.");
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(response.usage.total_tokens, 10);
        assert_eq!(response.citations.len(), 2);
        assert_eq!(response.citations[0].display_title(0), "Policy.pdf");
        assert_eq!(response.citations[1].display_title(1), "Chunk 2");
        assert_eq!(response.citations[1].display_locator(), "Internal RAG DB");
    }

    #[test]
    fn test_parse_web_chunk() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "ok" }] },
                "groundingMetadata": { "groundingChunks": [{ "web": { "title": "Site", "uri": "https://example.com" } }] }
            }]
        });

        let response = VertexProvider::parse_response(200, &body.to_string()).unwrap();
        assert_eq!(response.citations, vec![Citation::new(Some("Site".into()), Some("https://example.com".into()))]);
    }

    #[test]
    fn test_parse_without_grounding() {
        let body = json!({ "candidates": [{ "content": { "parts": [{ "text": "hello" }] } }] });
        let response = VertexProvider::parse_response(200, &body.to_string()).unwrap();
        assert!(response.citations.is_empty());
    }

    #[test]
    fn test_missing_text_is_malformed() {
        let body = json!({ "candidates": [{ "content": { "parts": [] }, "finishReason": "STOP" }] });
        let err = VertexProvider::parse_response(200, &body.to_string()).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));

        let err = VertexProvider::parse_response(200, r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));

        let err = VertexProvider::parse_response(200, "<html>").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn test_policy_blocks() {
        let blocked_prompt = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = VertexProvider::parse_response(200, &blocked_prompt.to_string()).unwrap_err();
        assert!(matches!(err, GenerationError::Policy(ref m) if m.contains("SAFETY")));

        let withheld = json!({ "candidates": [{ "finishReason": "RECITATION" }] });
        let err = VertexProvider::parse_response(200, &withheld.to_string()).unwrap_err();
        assert!(matches!(err, GenerationError::Policy(_)));
    }

    #[test]
    fn test_http_errors_are_classified() {
        let quota = json!({ "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" } });
        assert!(matches!(
            VertexProvider::parse_response(429, &quota.to_string()).unwrap_err(),
            GenerationError::Quota(ref m) if m == "Quota exceeded"
        ));

        let denied = json!({ "error": { "code": 403, "message": "Permission denied", "status": "PERMISSION_DENIED" } });
        assert!(matches!(
            VertexProvider::parse_response(403, &denied.to_string()).unwrap_err(),
            GenerationError::Auth(_)
        ));

        assert!(matches!(
            VertexProvider::parse_response(503, "upstream unavailable").unwrap_err(),
            GenerationError::Transport(_)
        ));

        let missing = json!({ "error": { "code": 404, "message": "RagCorpus not found", "status": "NOT_FOUND" } });
        assert!(matches!(
            VertexProvider::parse_response(404, &missing.to_string()).unwrap_err(),
            GenerationError::Api { status: 404, ref message } if message == "RagCorpus not found"
        ));
    }

    #[tokio::test]
    async fn test_generate_content_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("authorization", "Bearer token"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "What is the refund policy?" }] }]
            })))
            .and(body_partial_json(json!({
                "tools": [{ "retrieval": { "vertexRagStore": { "ragRetrievalConfig": { "topK": 3 } } } }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "30 days." }] },
                    "finishReason": "STOP",
                    "groundingMetadata": {
                        "groundingChunks": [{ "retrievedContext": { "title": "Policy.pdf" } }]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = mock_provider(&server)
            .generate_content(GenerateRequest::new("What is the refund policy?"))
            .await
            .unwrap();

        assert_eq!(response.text, "30 days.");
        assert_eq!(response.citations, vec![Citation::new(Some("Policy.pdf".into()), None)]);
    }

    #[tokio::test]
    async fn test_quota_status_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
            })))
            .mount(&server)
            .await;

        let err = mock_provider(&server)
            .generate_content(GenerateRequest::new("hi"))
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::Quota("Quota exceeded".into()));
    }

    #[tokio::test]
    async fn test_undecodable_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = mock_provider(&server)
            .generate_content(GenerateRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport() {
        let err = provider("europe-west1", Some("http://127.0.0.1:1/v1/"))
            .generate_content(GenerateRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
    }

    #[tokio::test]
    async fn test_token_rejection_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid JWT Signature."
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut key = ServiceAccountKey::from_json(Path::new("test.json"), TEST_KEY_JSON).unwrap();
        key.token_uri = format!("{}/token", server.uri());
        let tokens = Arc::new(ServiceAccountTokenSource::new(key, Client::new()));
        let provider = provider_with("europe-west1", Some(&format!("{}/v1/", server.uri())), tokens);

        let err = provider.generate_content(GenerateRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, GenerationError::Auth(ref m) if m.contains("invalid_grant")));
    }
}
