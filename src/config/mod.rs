use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Default region the corpus and model live in
pub const DEFAULT_LOCATION: &str = "europe-west1";

/// Default hosted model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";

/// Default service-account key file, relative to the working directory
pub const DEFAULT_KEY_FILE: &str = "service-account.json";

/// Default number of chunks the retrieval step returns
pub const DEFAULT_TOP_K: u32 = 3;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Google Cloud project. Falls back to the key file's project when unset.
    pub project_id: Option<String>,

    /// Region of the model endpoint and the corpus
    pub location: String,

    /// RAG corpus, either its numeric id or the full resource name
    pub corpus_id: String,

    /// Number of chunks requested from the retrieval step
    pub top_k: u32,

    /// Model to use
    pub model: String,

    /// Path to the service-account key file
    pub key_file: PathBuf,

    /// Override for the Vertex AI endpoint base URL
    pub api_endpoint: Option<String>,

    /// Temperature for sampling
    pub temperature: Option<f32>,

    /// Maximum tokens for responses
    pub max_output_tokens: Option<u32>,

    /// Request timeout. `None` leaves the transport default in place.
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: None,
            location: DEFAULT_LOCATION.to_string(),
            corpus_id: String::new(),
            top_k: DEFAULT_TOP_K,
            model: DEFAULT_MODEL.to_string(),
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
            api_endpoint: None,
            temperature: None,
            max_output_tokens: None,
            request_timeout_secs: None,
        }
    }
}

/// Partial configuration coming from a config file or the command line.
/// Every field is optional; set fields win over what is already there.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub project_id: Option<String>,
    pub location: Option<String>,
    pub corpus_id: Option<String>,
    pub top_k: Option<u32>,
    pub model: Option<String>,
    pub key_file: Option<PathBuf>,
    pub api_endpoint: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Initialize configuration from defaults, config file, environment and CLI, in that order
    pub async fn init(cli: &ConfigOverrides) -> Result<Self> {
        debug!("Initializing configuration");

        let mut config = Self::default();

        if let Some(file_config) = Self::load_from_file().await? {
            config.merge_with(file_config);
        }

        config.load_from_env();
        config.merge_with(cli.clone());

        Ok(config)
    }

    /// Candidate config file locations, highest priority first
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("./.ragchat.json"),
            PathBuf::from("./ragchat.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("ragchat").join("ragchat.json"));
        }

        paths
    }

    /// Load the first config file that exists
    pub async fn load_from_file() -> Result<Option<ConfigOverrides>> {
        for path in Self::config_paths() {
            if path.exists() {
                debug!("Loading configuration from: {}", path.display());
                let content = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let overrides: ConfigOverrides = serde_json::from_str(&content)
                    .with_context(|| format!("Invalid configuration in {}", path.display()))?;
                return Ok(Some(overrides));
            }
        }

        Ok(None)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Apply environment-style variables from any lookup function
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(project) = lookup("RAGCHAT_PROJECT").or_else(|| lookup("GOOGLE_CLOUD_PROJECT")) {
            self.project_id = Some(project);
        }

        if let Some(location) = lookup("RAGCHAT_LOCATION") {
            self.location = location;
        }

        if let Some(corpus) = lookup("RAGCHAT_CORPUS") {
            self.corpus_id = corpus;
        }

        if let Some(top_k) = lookup("RAGCHAT_TOP_K").and_then(|v| v.parse().ok()) {
            self.top_k = top_k;
        }

        if let Some(model) = lookup("RAGCHAT_MODEL") {
            self.model = model;
        }

        if let Some(key_file) = lookup("RAGCHAT_KEY_FILE")
            .or_else(|| lookup("GOOGLE_APPLICATION_CREDENTIALS"))
        {
            self.key_file = PathBuf::from(key_file);
        }

        if let Some(endpoint) = lookup("RAGCHAT_API_ENDPOINT") {
            self.api_endpoint = Some(endpoint);
        }

        if let Some(temperature) = lookup("RAGCHAT_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.temperature = Some(temperature);
        }

        if let Some(max_tokens) = lookup("RAGCHAT_MAX_OUTPUT_TOKENS").and_then(|v| v.parse().ok()) {
            self.max_output_tokens = Some(max_tokens);
        }

        if let Some(timeout) = lookup("RAGCHAT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = Some(timeout);
        }
    }

    /// Merge a partial configuration into this one
    pub fn merge_with(&mut self, other: ConfigOverrides) {
        if other.project_id.is_some() {
            self.project_id = other.project_id;
        }
        if let Some(location) = other.location {
            self.location = location;
        }
        if let Some(corpus_id) = other.corpus_id {
            self.corpus_id = corpus_id;
        }
        if let Some(top_k) = other.top_k {
            self.top_k = top_k;
        }
        if let Some(model) = other.model {
            self.model = model;
        }
        if let Some(key_file) = other.key_file {
            self.key_file = key_file;
        }
        if other.api_endpoint.is_some() {
            self.api_endpoint = other.api_endpoint;
        }
        if other.temperature.is_some() {
            self.temperature = other.temperature;
        }
        if other.max_output_tokens.is_some() {
            self.max_output_tokens = other.max_output_tokens;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.corpus_id.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "No RAG corpus configured. Set RAGCHAT_CORPUS, pass --corpus, or add corpus_id to ragchat.json"
            ));
        }

        if self.location.trim().is_empty() {
            return Err(anyhow::anyhow!("location is required"));
        }

        if self.model.trim().is_empty() {
            return Err(anyhow::anyhow!("Model is required"));
        }

        if self.top_k == 0 {
            return Err(anyhow::anyhow!("top_k must be greater than 0"));
        }

        if let Some(max_tokens) = self.max_output_tokens {
            if max_tokens == 0 {
                return Err(anyhow::anyhow!("max_output_tokens must be greater than 0"));
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(anyhow::anyhow!("temperature must be between 0.0 and 2.0"));
            }
        }

        if let Some(project) = &self.project_id {
            if project.trim().is_empty() {
                return Err(anyhow::anyhow!("project_id must not be empty when set"));
            }
        }

        Ok(())
    }
}
