use anyhow::{anyhow, Result};
use clap::Args;
use std::io::{self, Read, Write};
use tracing::{debug, info};

use crate::app::{App, PlainTranscript};
use crate::config::Config;
use crate::session::TurnOutcome;

/// Run a single prompt non-interactively
#[derive(Debug, Args)]
pub struct RunCommand {
    /// The prompt to run. If not provided, will read from stdin
    pub prompt: Vec<String>,

    /// Print only the answer, without the spinner line or sources
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl RunCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        debug!("Executing run command");

        // Get the prompt either from arguments or stdin
        let prompt = self.get_prompt()?;

        if prompt.trim().is_empty() {
            return Err(anyhow!("No prompt provided. Use arguments or pipe input via stdin."));
        }

        info!("Running prompt: {}", prompt.chars().take(50).collect::<String>());

        let mut app = App::new(config.clone()).await?;
        let mut out = PlainTranscript::new(io::stdout());

        if !self.quiet {
            out.searching()?;
        }

        let outcome = app.run_once(prompt.trim()).await?;

        if self.quiet {
            if let Some(answer) = outcome.answer() {
                let mut stdout = out.into_inner();
                writeln!(stdout, "{}", answer)?;
            }
        } else {
            out.outcome(&outcome)?;
        }

        match outcome {
            TurnOutcome::Answered { .. } => Ok(()),
            TurnOutcome::Failed { error } => Err(error.into()),
        }
    }

    fn get_prompt(&self) -> Result<String> {
        if !self.prompt.is_empty() {
            // Join all arguments into a single prompt
            Ok(self.prompt.join(" "))
        } else {
            // Read from stdin
            debug!("Reading prompt from stdin");
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| anyhow!("Failed to read from stdin: {}", e))?;
            Ok(buffer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_words_are_joined() {
        let cmd = RunCommand {
            prompt: vec!["What".into(), "is".into(), "the".into(), "refund".into(), "policy?".into()],
            quiet: false,
        };
        assert_eq!(cmd.get_prompt().unwrap(), "What is the refund policy?");
    }

    #[tokio::test]
    async fn test_missing_key_file_fails_before_any_turn() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            corpus_id: "1111111".to_string(),
            key_file: dir.path().join("service-account.json"),
            ..Config::default()
        };
        let cmd = RunCommand { prompt: vec!["hello".into()], quiet: true };

        let err = cmd.execute(&config).await.unwrap_err();
        assert!(err.downcast_ref::<crate::auth::CredentialsError>().is_some());
    }
}
