use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

use super::{config::ConfigCommand, run::RunCommand};
use crate::app::App;
use crate::config::{Config, ConfigOverrides};

/// ragchat - chat with your documents through Gemini on Vertex AI
#[derive(Parser, Debug)]
#[command(
    name = "ragchat",
    version,
    about = "Chat with your documents through Gemini on Vertex AI",
    long_about = r#"ragchat attaches a Vertex AI RAG corpus to a Gemini model as a retrieval tool
and lets you ask questions about the documents in it. Answers come with the
sources the service grounded them on.

Examples:
  ragchat --corpus 1111111                        # Start interactive mode
  ragchat --corpus 1111111 --plain                # Line-based chat on stdin/stdout
  ragchat --corpus 1111111 run "refund policy?"   # Run a single prompt
  ragchat config --check                          # Show the resolved configuration"#
)]
pub struct Cli {
    /// Current working directory
    #[arg(short = 'c', long = "cwd", global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    /// Write logs to this file
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,

    /// Service-account key file
    #[arg(short = 'k', long = "key-file", global = true)]
    pub key_file: Option<PathBuf>,

    /// Google Cloud project id
    #[arg(short = 'p', long = "project", global = true)]
    pub project: Option<String>,

    /// Region of the model and the corpus
    #[arg(short = 'l', long = "location", global = true)]
    pub location: Option<String>,

    /// RAG corpus id or full resource name
    #[arg(long = "corpus", global = true)]
    pub corpus: Option<String>,

    /// Number of chunks to retrieve per turn
    #[arg(long = "top-k", global = true)]
    pub top_k: Option<u32>,

    /// Model name
    #[arg(short = 'm', long = "model", global = true)]
    pub model: Option<String>,

    /// Use the line-based chat instead of the TUI
    #[arg(long = "plain")]
    pub plain: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single prompt non-interactively
    Run(RunCommand),

    /// Print the resolved configuration as JSON
    Config(ConfigCommand),
}

impl Cli {
    /// True when the full-screen TUI will own the terminal
    pub fn is_tui(&self) -> bool {
        self.command.is_none() && !self.plain
    }

    /// Flags that override file and environment configuration
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            project_id: self.project.clone(),
            location: self.location.clone(),
            corpus_id: self.corpus.clone(),
            top_k: self.top_k,
            model: self.model.clone(),
            key_file: self.key_file.clone(),
            ..ConfigOverrides::default()
        }
    }

    pub async fn execute(self) -> Result<()> {
        if self.debug {
            debug!("Debug logging enabled");
        }

        // Change working directory if specified
        if let Some(cwd) = &self.cwd {
            std::env::set_current_dir(cwd)
                .map_err(|e| anyhow::anyhow!("Failed to change directory to {}: {}", cwd.display(), e))?;
            info!("Changed working directory to: {}", cwd.display());
        }

        // Initialize configuration
        let config = Config::init(&self.overrides()).await?;
        debug!("Configuration initialized");

        match &self.command {
            Some(Commands::Run(run_cmd)) => run_cmd.execute(&config).await,
            Some(Commands::Config(config_cmd)) => config_cmd.execute(&config).await,
            None => self.start_chat(config).await,
        }
    }

    async fn start_chat(&self, config: Config) -> Result<()> {
        let mut app = App::new(config).await?;

        if self.plain {
            app.run_plain().await?;
        } else {
            app.run_interactive().await?;
        }

        info!("Application finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::parse_from([
            "ragchat",
            "--corpus",
            "1111111",
            "--location",
            "us-central1",
            "--top-k",
            "5",
            "--key-file",
            "keys/sa.json",
        ]);

        let overrides = cli.overrides();
        assert_eq!(overrides.corpus_id.as_deref(), Some("1111111"));
        assert_eq!(overrides.location.as_deref(), Some("us-central1"));
        assert_eq!(overrides.top_k, Some(5));
        assert_eq!(overrides.key_file, Some(PathBuf::from("keys/sa.json")));
        assert!(overrides.model.is_none());
        assert!(cli.is_tui());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ragchat", "run", "-q", "refund", "policy?", "--corpus", "42"]);
        assert!(!cli.is_tui());
        assert_eq!(cli.corpus.as_deref(), Some("42"));
        match cli.command {
            Some(Commands::Run(run)) => {
                assert!(run.quiet);
                assert_eq!(run.prompt, vec!["refund", "policy?"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_plain_mode_is_not_tui() {
        let cli = Cli::parse_from(["ragchat", "--plain"]);
        assert!(!cli.is_tui());
    }
}
