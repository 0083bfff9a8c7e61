//! Core application wiring
//!
//! Startup runs strictly in order: validate config, load credentials, bind the
//! retrieval tool, build the model client, then create the session. A
//! credential failure stops everything before any chat state exists.

mod plain;

pub use plain::*;

use anyhow::{anyhow, Context, Result};
use std::{sync::Arc, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::{
    auth::{ServiceAccountKey, ServiceAccountTokenSource},
    config::Config,
    llm::{CorpusRef, LlmProvider, RetrievalConfig, RetrievalTool, VertexConfig, VertexProvider},
    session::{TurnHandler, TurnOutcome},
    tui, version,
};

pub const PAGE_TITLE: &str = "🤖 Vertex AI RAG Chat";

/// Title and caption shown above the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHeader {
    pub title: String,
    pub caption: String,
}

impl ChatHeader {
    pub fn new(corpus: &CorpusRef, location: &str) -> Self {
        Self {
            title: PAGE_TITLE.to_string(),
            caption: format!("Connected to Corpus: `{}` in `{}`", corpus.short_id(), location),
        }
    }
}

/// Main application structure
pub struct App {
    header: ChatHeader,
    handler: TurnHandler,
}

impl App {
    /// Load credentials and build the model client from configuration
    pub async fn new(config: Config) -> Result<Self> {
        debug!("Creating new App instance");
        config.validate()?;

        // Fatal on any error; the caller shows the static auth message.
        let key = ServiceAccountKey::from_file(&config.key_file).await?;
        info!("Loaded service account {}", key.client_email);

        let project_id = config
            .project_id
            .clone()
            .or_else(|| key.project_id.clone())
            .ok_or_else(|| anyhow!("No project id configured and the key file does not name one"))?;

        let mut builder = reqwest::Client::builder().user_agent(version::user_agent());
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().context("Failed to build HTTP client")?;

        let corpus = CorpusRef::resolve(&project_id, &config.location, &config.corpus_id);
        let retrieval = RetrievalConfig::new(corpus.clone(), config.top_k);
        let tool = RetrievalTool::bind(&retrieval);
        info!("Bound retrieval tool to {} (top_k={})", corpus, config.top_k);

        let tokens = Arc::new(ServiceAccountTokenSource::new(key, http_client.clone()));
        let provider = VertexProvider::new(
            VertexConfig {
                project_id,
                location: config.location.clone(),
                model: config.model.clone(),
                api_endpoint: config.api_endpoint.clone(),
            },
            tool,
            tokens,
            http_client,
        );

        Ok(Self::with_provider(&config, &corpus, Arc::new(provider)))
    }

    /// Build around any model client
    pub fn with_provider(config: &Config, corpus: &CorpusRef, provider: Arc<dyn LlmProvider>) -> Self {
        info!("Using {} model {}", provider.name(), provider.model());
        let handler = TurnHandler::new(provider)
            .with_generation(config.temperature, config.max_output_tokens);

        Self {
            header: ChatHeader::new(corpus, &config.location),
            handler,
        }
    }

    pub fn into_parts(self) -> (ChatHeader, TurnHandler) {
        (self.header, self.handler)
    }

    /// Run the TUI
    pub async fn run_interactive(self) -> Result<()> {
        info!("Starting interactive mode");
        let (header, handler) = self.into_parts();
        tui::run(header, handler).await
    }

    /// Line-based chat over stdin/stdout
    pub async fn run_plain(&mut self) -> Result<()> {
        info!("Starting plain mode");
        let mut out = PlainTranscript::new(std::io::stdout());
        out.header(&self.header)?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            out.prompt_marker()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let prompt = line.trim();
            if prompt.is_empty() {
                continue;
            }
            if matches!(prompt, "/quit" | "/exit") {
                break;
            }

            out.searching()?;
            let outcome = self.handler.handle_turn(prompt).await?;
            out.outcome(&outcome)?;
        }

        let stats = self.handler.session().stats();
        info!(
            "Session ended after {} turns in {}s ({} unanswered)",
            stats.total_turns,
            stats.elapsed_secs,
            stats.unanswered()
        );
        Ok(())
    }

    /// Run a single prompt non-interactively
    pub async fn run_once(&mut self, prompt: &str) -> Result<TurnOutcome> {
        info!("Running non-interactive prompt");
        Ok(self.handler.handle_turn(prompt).await?)
    }
}
