//! Retrieval tool bound to a Vertex AI RAG corpus

use serde::{Deserialize, Serialize};

/// Fully qualified reference to a RAG corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorpusRef(String);

impl CorpusRef {
    /// Accept either a bare corpus id or a full `projects/../ragCorpora/..` name
    pub fn resolve(project_id: &str, location: &str, corpus_id: &str) -> Self {
        let corpus_id = corpus_id.trim().trim_matches('/');
        if corpus_id.starts_with("projects/") {
            Self(corpus_id.to_string())
        } else {
            Self(format!(
                "projects/{}/locations/{}/ragCorpora/{}",
                project_id, location, corpus_id
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, for display
    pub fn short_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for CorpusRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Corpus and chunk count; fixed for the life of the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalConfig {
    pub corpus: CorpusRef,
    pub top_k: u32,
}

impl RetrievalConfig {
    pub fn new(corpus: CorpusRef, top_k: u32) -> Self {
        Self { corpus, top_k }
    }
}

/// Tool descriptor handed to the model. Serializes to the Vertex `tools[]` entry.
///
/// Nothing here checks that the corpus exists; a bad reference only shows up
/// when the model is called.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalTool {
    retrieval: Retrieval,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Retrieval {
    vertex_rag_store: VertexRagStore,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexRagStore {
    rag_resources: Vec<RagResource>,
    rag_retrieval_config: RagRetrievalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct RagResource {
    rag_corpus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct RagRetrievalConfig {
    top_k: u32,
}

impl RetrievalTool {
    pub fn bind(config: &RetrievalConfig) -> Self {
        Self {
            retrieval: Retrieval {
                vertex_rag_store: VertexRagStore {
                    rag_resources: vec![RagResource {
                        rag_corpus: config.corpus.as_str().to_string(),
                    }],
                    rag_retrieval_config: RagRetrievalConfig { top_k: config.top_k },
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_short_id() {
        let corpus = CorpusRef::resolve("my-project", "europe-west1", "1111111");
        assert_eq!(
            corpus.as_str(),
            "projects/my-project/locations/europe-west1/ragCorpora/1111111"
        );
        assert_eq!(corpus.short_id(), "1111111");
    }

    #[test]
    fn test_resolve_full_name_is_kept() {
        let full = "projects/other/locations/us-central1/ragCorpora/77";
        let corpus = CorpusRef::resolve("ignored", "ignored", full);
        assert_eq!(corpus.as_str(), full);
        assert_eq!(corpus.short_id(), "77");
    }

    #[test]
    fn test_tool_wire_format() {
        let config = RetrievalConfig::new(CorpusRef::resolve("p", "europe-west1", "123"), 3);
        let tool = serde_json::to_value(RetrievalTool::bind(&config)).unwrap();

        assert_eq!(
            tool,
            json!({
                "retrieval": {
                    "vertexRagStore": {
                        "ragResources": [
                            { "ragCorpus": "projects/p/locations/europe-west1/ragCorpora/123" }
                        ],
                        "ragRetrievalConfig": { "topK": 3 }
                    }
                }
            })
        );
    }
}
