use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wm_core::{references, Backend, ChatService, Citation, Conversation, WorkspaceDirectory};
use wm_services::{HttpBackend, SimulatedBackend};

mod config;
mod markdown;
mod setup;
mod tui;

use config::{BackendKind, Config, Overrides};

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Most verbose
    Trace,
    /// Requests, replies and state transitions
    Debug,
    /// Completed turns and directory loads
    Info,
    /// Quiet: only warnings and errors
    Warn,
    /// Minimal: only errors
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "workmate")]
#[command(author, version, about = "WorkMate: ask questions about your workspace", long_about = None)]
pub struct Cli {
    /// Backend answering questions (overrides config)
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Base URL of the WorkMate API (overrides config)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Reply delay of the simulated backend in milliseconds
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long)]
    pub debug: bool,

    /// Write logs to file (JSON-lines format)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            backend: self.backend,
            base_url: self.base_url.clone(),
            latency_ms: self.latency_ms,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer with its sources
    Ask {
        /// The question to ask
        question: String,
    },
    /// List connected workspaces
    Workspaces,
    /// Show current configuration
    Config,
    /// Write a configuration template to ~/.config/workmate
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so it only runs without a subcommand on a tty
    let will_use_tui = cli.command.is_none() && atty::is(atty::Stream::Stdout);

    // Resolve log level: --debug overrides --log-level
    let log_level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };

    // Set up logging
    let filter = EnvFilter::new(log_level.as_filter());

    if will_use_tui && cli.log_file.is_none() {
        // TUI mode without log file: suppress all tracing output
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::sink)
            .init();
    } else if let Some(log_path) = &cli.log_file {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .init();
    }

    // Handle setup before config is required
    if matches!(&cli.command, Some(Commands::Setup)) {
        return setup::run();
    }

    let config = Config::load(&cli.overrides())?;
    let backend = create_backend(&config)?;

    match &cli.command {
        Some(Commands::Ask { question }) => ask(backend.as_chat(), question).await,
        Some(Commands::Workspaces) => list_workspaces(backend.as_ref()).await,
        Some(Commands::Config) => show_config(&config),
        Some(Commands::Setup) => unreachable!(),
        None if will_use_tui => tui::run_tui(&config, backend).await,
        None => {
            anyhow::bail!("Interactive mode needs a terminal; use `workmate ask <question>` instead")
        }
    }
}

fn create_backend(config: &Config) -> Result<Arc<dyn Backend>> {
    let backend: Arc<dyn Backend> = match config.backend {
        BackendKind::Simulated => {
            Arc::new(SimulatedBackend::new().with_latency(config.latency()))
        }
        BackendKind::Http => Arc::new(
            HttpBackend::with_timeout(config.request_timeout())
                .context("Failed to set up the http backend")?
                .with_base_url(&config.base_url),
        ),
    };
    Ok(backend)
}

/// One-shot question: print the rendered reply and the sources it cites.
async fn ask(service: &dyn ChatService, question: &str) -> Result<()> {
    let mut conversation = Conversation::new();
    let sent = conversation
        .submit(question, service)
        .await
        .with_context(|| format!("The {} backend could not answer", service.name()))?;
    if !sent {
        anyhow::bail!("Question is empty");
    }

    let Some(reply) = conversation.last_message() else {
        return Ok(());
    };

    let width = markdown::terminal_width();
    let text = markdown::render_to_text(&reply.content, &reply.citations, width);
    println!("{}", markdown::text_to_ansi(&text));

    let sources = cited_sources(&reply.content, &reply.citations);
    if !sources.is_empty() {
        println!();
        println!("Sources:");
        for citation in sources {
            println!("  [{}] {}: \"{}\"", citation.number, citation.source, citation.excerpt);
        }
    }
    Ok(())
}

/// Distinct citations referenced by `content`, in order of first reference.
fn cited_sources<'a>(content: &str, citations: &'a [Citation]) -> Vec<&'a Citation> {
    let mut sources: Vec<&Citation> = Vec::new();
    for citation in references(content, citations) {
        if !sources.iter().any(|c| c.number == citation.number) {
            sources.push(citation);
        }
    }
    sources
}

async fn list_workspaces(directory: &dyn Backend) -> Result<()> {
    let workspaces = directory
        .list_workspaces()
        .await
        .context("Failed to list workspaces")?;

    if workspaces.is_empty() {
        println!("No connected workspaces.");
        return Ok(());
    }

    println!("Connected workspaces:");
    for workspace in workspaces {
        let state = if workspace.connected { "connected" } else { "disconnected" };
        println!(
            "  {} ({} pages indexed, {})",
            workspace.name, workspace.page_count, state
        );
    }
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    match Config::config_path() {
        Ok(path) if path.exists() => println!("# Loaded from {}", path.display()),
        Ok(path) => println!("# No file at {}; showing defaults", path.display()),
        Err(_) => println!("# No config directory; showing defaults"),
    }
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
