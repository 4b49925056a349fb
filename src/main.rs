//! jaltol-chat - a minimal terminal chat client.
//!
//! Reads a line of input, posts it to the JaltolAI endpoint and shows the
//! user message and the bot reply in a scrolling transcript.

mod client;
mod config;
mod error;
mod protocol;
mod transcript;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ChatBackend, ChatSession, HttpBackend};
use config::Config;
use protocol::{render_reply, ChatRequest};
use std::process::Command as ProcessCommand;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jaltol-chat")]
#[command(author, version, about = "A minimal terminal chat client")]
#[command(long_about = "Chat with the JaltolAI endpoint.\n\nEnter sends, Esc quits, PageUp/PageDown scroll the transcript.")]
struct Cli {
    /// Initial message (pre-filled in the chat screen, sent directly with --pipe)
    #[arg(value_name = "QUERY")]
    query: Option<String>,

    /// No TUI, send QUERY once and print the reply (for scripting)
    #[arg(long)]
    pipe: bool,

    /// Override the chat endpoint URL
    #[arg(short = 'e', long, value_name = "URL")]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open configuration file in $EDITOR
    Config,
    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config) => {
            init_stderr_logging();
            handle_config()
        }
        Some(Commands::ShowConfig) => {
            init_stderr_logging();
            handle_show_config(cli.endpoint)
        }
        None => {
            let config = Config::load()?.with_endpoint(cli.endpoint);
            if cli.pipe {
                init_stderr_logging();
                handle_pipe(cli.query, config).await
            } else {
                init_file_logging()?;
                handle_chat(cli.query, config).await
            }
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::from_default_env()
        .add_directive("jaltol_chat=info".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap())
}

/// Log to stderr; stdout is reserved for replies.
fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Log to a file; the chat screen owns the terminal.
fn init_file_logging() -> Result<()> {
    let log_path = Config::log_path()?;
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Run the interactive chat screen.
async fn handle_chat(query: Option<String>, config: Config) -> Result<()> {
    info!("Chatting with {}", config.server.endpoint);

    let backend = HttpBackend::new(config.server.endpoint.clone());
    let (mut session, replies) = ChatSession::new(backend, config.ui);
    if let Some(query) = query {
        session.set_input(query);
    }

    client::run_tui(session, replies).await
}

/// Send one message and print the reply.
async fn handle_pipe(query: Option<String>, config: Config) -> Result<()> {
    let query = query.ok_or_else(|| anyhow::anyhow!("Query required in --pipe mode"))?;
    let backend = HttpBackend::new(config.server.endpoint);
    info!("Sending to {}", backend.endpoint());

    match backend.send(&ChatRequest::new(query)).await {
        Ok(reply) => {
            println!("{}", render_reply(&reply));
            Ok(())
        }
        Err(e) => {
            error!("Error: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle the config command.
fn handle_config() -> Result<()> {
    let config_path = Config::config_path()?;

    // Create default config if it doesn't exist
    if !config_path.exists() {
        Config::default().save()?;
        println!("Created default config at {}", config_path.display());
    }

    // Open in editor
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        eprintln!("Editor exited with non-zero status");
    }

    Ok(())
}

/// Handle the show-config command.
fn handle_show_config(endpoint: Option<String>) -> Result<()> {
    let config = Config::load()?.with_endpoint(endpoint);
    println!("# {}", Config::config_path()?.display());
    print!("{}", config.to_toml()?);
    Ok(())
}
