//! Config command: show the configuration as resolved from files, env and flags

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;

/// Print the resolved configuration
#[derive(Debug, Args)]
pub struct ConfigCommand {
    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also validate the configuration
    #[arg(long)]
    pub check: bool,
}

impl ConfigCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        if self.check {
            config.validate()?;
        }

        let rendered = serde_json::to_string_pretty(config)?;

        match &self.output {
            Some(path) => {
                tokio::fs::write(path, format!("{}\n", rendered))
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Configuration written to {}", path.display());
            }
            None => println!("{}", rendered),
        }

        Ok(())
    }
}
