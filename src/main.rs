use anyhow::{Context, Result};
use clap::Parser;
use std::{fs::OpenOptions, path::PathBuf, sync::Mutex};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod auth;
mod cli;
mod config;
mod llm;
mod session;
mod tui;
mod version;

use auth::CredentialsError;
use cli::Cli;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up panic hook for graceful error recovery
    let restore_screen = cli.is_tui();
    std::panic::set_hook(Box::new(move |panic_info| {
        if restore_screen {
            let _ = tui::reset_terminal();
        }
        error!("Application panicked: {}", panic_info);
        eprintln!("ragchat panicked: {}", panic_info);
        std::process::exit(1);
    }));

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = dotenv {
        // Don't error if .env file doesn't exist, just log it
        tracing::debug!("No .env file found or error loading it: {}", e);
    }
    info!("Starting {}", version::full_version());

    // Execute CLI command
    if let Err(e) = cli.execute().await {
        if let Some(credentials) = e.downcast_ref::<CredentialsError>() {
            error!("{}", credentials);
            eprintln!("{}", credentials.user_message());
        } else {
            error!("Application error: {:#}", e);
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let default_directive = if cli.debug { "ragchat=debug" } else { "ragchat=info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into());

    // The TUI owns the terminal, so it always logs to a file
    let log_file = match &cli.log_file {
        Some(path) => Some(path.clone()),
        None if cli.is_tui() => default_log_file(),
        None => None,
    };

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
    }

    Ok(())
}

fn default_log_file() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("ragchat").join("ragchat.log"))
}
