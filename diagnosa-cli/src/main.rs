//! CLI entry point for diagnosa

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use diagnosa_agent::{SubmitError, TranscriptManager};
use diagnosa_core::config::{resolve_credential, Config, ConfigLoader, UiConfig, CREDENTIAL_NAME};
use diagnosa_core::logging::{init_logging, WorkerGuard};
use diagnosa_core::utils::mask_secret;
use diagnosa_core::{Role, Session, Turn};
use diagnosa_manager::{run_server, AppState, ChatInfo, Manager};
use diagnosa_providers::{GeminiClient, LLMProvider, ScriptedProvider, DEFAULT_API_BASE};
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

const EXIT_COMMAND: &str = "/exit";

#[derive(Parser, Debug)]
#[command(name = "diagnosa")]
#[command(about = "Disease diagnosis chatbot backed by the Gemini chat API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,

    /// Answer from a local echo provider instead of the remote model
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize diagnosa configuration
    Onboard,
    /// Serve the web chat
    Serve {
        /// Address to bind (defaults to gateway.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (defaults to gateway.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Chat in the terminal
    Chat,
    /// Send a single message in a fresh session
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: String,
    },
    /// Show status information
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Onboard => {
            run_onboard(&config_loader)?;
        }
        Commands::Serve { host, port } => {
            let (config, _log_guard) = load_config(&config_loader)?;
            let provider = build_provider(&config, cli.offline)?;
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            info!("Starting web chat on {}:{}", host, port);
            run_serve(&config, provider, host, port).await?;
        }
        Commands::Chat => {
            let (config, _log_guard) = load_config(&config_loader)?;
            let provider = build_provider(&config, cli.offline)?;
            info!("Starting terminal chat");
            run_chat(&config, provider).await?;
        }
        Commands::Ask { message } => {
            let (config, _log_guard) = load_config(&config_loader)?;
            let provider = build_provider(&config, cli.offline)?;
            run_ask(&config, provider, message).await?;
        }
        Commands::Status => {
            let (config, _log_guard) = load_config(&config_loader)?;
            run_status(&config_loader, &config);
        }
    }

    Ok(())
}

/// Load configuration and start logging; keep the guard alive while running
fn load_config(loader: &ConfigLoader) -> Result<(Config, WorkerGuard)> {
    let config = loader.load()?;
    let guard = init_logging(&config.logging);
    Ok((config, guard))
}

/// Resolve the credential and build the remote client.
///
/// A missing credential is fatal: the error propagates out of `main` before
/// any session exists.
fn build_provider(config: &Config, offline: bool) -> Result<Arc<dyn LLMProvider>> {
    if offline {
        warn!("Offline mode: replies are echoed locally");
        return Ok(Arc::new(ScriptedProvider::offline()));
    }

    let api_key = match resolve_credential(config) {
        Ok(key) => key,
        Err(e) => {
            error!("Startup halted: {}", e);
            return Err(e.into());
        }
    };
    info!(
        "Using model {} with key {}",
        config.model.name,
        mask_secret(&api_key)
    );
    Ok(Arc::new(GeminiClient::from_config(config, api_key)?))
}

fn run_onboard(loader: &ConfigLoader) -> Result<()> {
    println!("{}", style("Welcome to diagnosa!").bold().cyan());
    println!("Let's set up your configuration.\n");

    let config_path = loader.config_path();
    if config_path.exists() {
        let overwrite = Confirm::new()
            .with_prompt("Configuration already exists. Overwrite?")
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Onboard cancelled.");
            return Ok(());
        }
    }

    let mut config = Config::default();

    let api_key: String = Input::new()
        .with_prompt(format!(
            "Enter your Gemini API key (leave blank to use {})",
            CREDENTIAL_NAME
        ))
        .allow_empty(true)
        .interact_text()?;
    config.providers.gemini.api_key = api_key;

    config.model.name = Input::new()
        .with_prompt("Enter the model to use")
        .default(config.model.name.clone())
        .interact_text()?;

    config.gateway.port = Input::new()
        .with_prompt("Port for the web chat")
        .default(config.gateway.port)
        .interact_text()?;

    loader.save(&config)?;

    println!(
        "\n{}",
        style("Configuration saved successfully!").green().bold()
    );
    println!("Config location: {}", config_path.display());
    println!("\nYou can now run:");
    println!("  {} - Serve the web chat", style("diagnosa serve").cyan());
    println!("  {} - Chat in the terminal", style("diagnosa chat").cyan());
    println!(
        "  {} - Send a single message",
        style("diagnosa ask --message 'demam berdarah'").cyan()
    );

    Ok(())
}

async fn run_serve(
    config: &Config,
    provider: Arc<dyn LLMProvider>,
    host: String,
    port: u16,
) -> Result<()> {
    let transcripts = Arc::new(TranscriptManager::from_config(provider, config));

    let (api_tx, api_rx) = mpsc::channel(100);
    let manager =
        Manager::new(api_rx, transcripts).with_idle_limit(config.gateway.session_idle());
    let manager_handle = tokio::spawn(async move {
        if let Err(e) = manager.run().await {
            error!("Manager loop error: {}", e);
        }
    });

    let state = AppState {
        api_tx,
        info: Arc::new(ChatInfo::from_config(config)),
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    println!(
        "{} http://{}:{}",
        style("Serving chat on").green().bold(),
        host,
        port
    );
    let mut server =
        tokio::spawn(async move { run_server(state, &host, port, shutdown_rx).await });

    tokio::select! {
        res = &mut server => {
            // The server stopped on its own, most likely a bind failure.
            manager_handle.abort();
            return match res {
                Ok(result) => result,
                Err(e) => Err(e.into()),
            };
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            println!("\n{}", style("Shutting down...").yellow());
            let _ = shutdown_tx.send(());
        }
    }

    match server.await {
        Ok(Err(e)) => error!("Server error: {}", e),
        Err(e) => error!("Server task failed: {}", e),
        Ok(Ok(())) => {}
    }
    // Every AppState clone is gone with the server, so the manager loop ends.
    let _ = manager_handle.await;

    println!("{}", style("Server stopped.").green());
    Ok(())
}

async fn run_chat(config: &Config, provider: Arc<dyn LLMProvider>) -> Result<()> {
    let manager = TranscriptManager::from_config(provider, config);
    let mut session = Session::generate();

    print_header(&config.ui);
    for turn in manager.initialize(&mut session).turns() {
        print_turn(turn);
    }
    println!(
        "{}",
        style(format!("Type {} or press Ctrl-D to quit.", EXIT_COMMAND)).dim()
    );

    loop {
        let line: String = match Input::new()
            .with_prompt(config.ui.input_placeholder.as_str())
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(e) => {
                debug!("Input closed: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }
        if line.trim() == EXIT_COMMAND {
            break;
        }

        let spinner = waiting_spinner();
        let result = manager.exchange(&mut session, line).await;
        spinner.finish_and_clear();
        print_outcome(&result);
    }

    info!(
        "Chat session {} ended with {} turns",
        session.id,
        session.transcript().map_or(0, |t| t.len())
    );
    Ok(())
}

async fn run_ask(config: &Config, provider: Arc<dyn LLMProvider>, message: String) -> Result<()> {
    let manager = TranscriptManager::from_config(provider, config);
    let mut session = Session::generate();
    manager.initialize(&mut session);

    let result = manager.exchange(&mut session, message).await;
    print_outcome(&result);
    Ok(())
}

fn run_status(loader: &ConfigLoader, config: &Config) {
    println!("{}", style("diagnosa Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    let file_status = if loader.config_path().exists() {
        style("present").green()
    } else {
        style("missing (defaults in use)").yellow()
    };
    println!("  Config file: {}", file_status);
    println!("  Log directory: {}", config.logging.dir);
    println!();

    println!("{}", style("Model:").bold());
    println!("  Name: {}", config.model.name);
    println!("  Temperature: {}", config.model.temperature);
    println!("  Max output tokens: {}", config.model.max_output_tokens);
    println!("  Timeout: {}s", config.model.timeout_secs);
    println!(
        "  API base: {}",
        config
            .providers
            .gemini
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
    );
    let credential = match resolve_credential(config) {
        Ok(key) => style(format!("configured ({})", mask_secret(&key))).green(),
        Err(_) => style("not configured".to_string()).red(),
    };
    println!("  {}: {}", CREDENTIAL_NAME, credential);
    println!();

    println!("{}", style("Web chat:").bold());
    println!(
        "  Address: http://{}:{}",
        config.gateway.host, config.gateway.port
    );
    match config.gateway.session_idle() {
        Some(limit) => println!("  Idle sessions end after: {}s", limit.as_secs()),
        None => println!("  Idle sessions end after: never"),
    }
}

fn print_header(ui: &UiConfig) {
    println!("{}", style(&ui.title).bold().cyan());
    println!("{}\n", ui.description);
}

fn print_turn(turn: &Turn) {
    match turn.role {
        Role::User => println!("{} {}", style("Anda:").bold().blue(), turn.content),
        Role::Model => println!("{} {}", style("Asisten:").bold().green(), turn.content),
    }
}

fn print_outcome(result: &Result<String, SubmitError>) {
    match result {
        Ok(reply) => print_turn(&Turn::model(reply.as_str())),
        Err(e) if e.is_empty_reply() => println!("{}", style(e.notice()).yellow()),
        Err(e) => {
            eprintln!("{}", style(e.notice()).red());
            if let Some(hint) = e.hint() {
                eprintln!("{}", style(hint).cyan());
            }
        }
    }
}

fn waiting_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.set_message("Menunggu balasan...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
