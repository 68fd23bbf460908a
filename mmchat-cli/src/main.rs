//! CLI entry point for mmchat

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use mmchat_core::config::{Config, ConfigLoader};
use mmchat_core::logging::init_logging;
use mmchat_core::session::{HistoryStore, JsonDirStore, Role, SessionKey, SessionRegistry};
use mmchat_core::SessionController;
use mmchat_providers::build_collaborators;
use mmchat_server::{run_server, AppState, Manager};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "mmchat")]
#[command(about = "Multimodal chat with persistent sessions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List saved sessions
    Sessions,
    /// Print a saved session, most recent message first
    Show {
        /// Session key, e.g. 2024_05_17_14_30_00.json
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };
    let config = config_loader
        .load()
        .with_context(|| format!("loading {}", config_loader.config_path().display()))?;

    let _log_guard = init_logging(&config.logging);

    match cli.command {
        Commands::Serve { host, port } => {
            info!("Starting server");
            run_serve(config, host, port).await?;
        }
        Commands::Sessions => run_sessions(&config)?,
        Commands::Show { key } => run_show(&config, &key)?,
    }

    Ok(())
}

async fn run_serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", host, port))?;

    println!("{}", style("Starting mmchat...").bold().cyan());
    println!("Chat model: {}", config.providers.chat.model);
    println!("Sessions: {}", config.chat_history_path);

    let collaborators = build_collaborators(&config)?;
    let store = Arc::new(JsonDirStore::new(&config.chat_history_path));
    let controller = SessionController::new(store, collaborators);

    let (api_tx, api_rx) = mpsc::channel(100);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let manager_handle = tokio::spawn(async move {
        if let Err(e) = Manager::new(api_rx, controller).run().await {
            error!("Manager loop error: {}", e);
        }
    });
    let mut server_handle = tokio::spawn(run_server(AppState { api_tx }, addr, shutdown_rx));

    println!(
        "\n{}",
        style(format!("Listening on http://{}. Press Ctrl+C to stop.", addr)).green()
    );

    // bind failures end the server before any signal
    let stopped_early = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            false
        }
        result = &mut server_handle => {
            result??;
            true
        }
    };

    if !stopped_early {
        println!("\n{}", style("Shutting down...").yellow());
        let _ = shutdown_tx.send(());
        server_handle.await??;
    }

    // the manager stops once the server drops its command sender
    let _ = manager_handle.await;
    println!("{}", style("Server stopped.").green());
    Ok(())
}

fn run_sessions(config: &Config) -> Result<()> {
    let store = JsonDirStore::new(&config.chat_history_path);
    let registry = SessionRegistry::load(&store)?;

    println!("{}", style("Sessions").bold().cyan());
    println!("  Directory: {}\n", store.dir().display());
    for key in registry.keys() {
        if key.is_new() {
            println!("  {}", style(key).dim());
            continue;
        }
        match store.load(key) {
            Ok(history) => println!("  {} ({} messages)", style(key).bold(), history.len()),
            Err(e) => println!("  {} {}", style(key).bold(), style(e.kind()).red()),
        }
    }
    Ok(())
}

fn run_show(config: &Config, raw_key: &str) -> Result<()> {
    let key = SessionKey::parse(raw_key)?;
    if key.is_new() {
        anyhow::bail!("{} has no saved transcript", key);
    }

    let store = JsonDirStore::new(&config.chat_history_path);
    let history = store.load(&key)?;

    println!("{}", style(&key).bold().cyan());
    for message in history.iter().rev() {
        let speaker = match message.role {
            Role::Human => style("You").bold().cyan(),
            Role::Assistant => style("Assistant").bold().green(),
        };
        println!("\n{}: {}", speaker, message.content);
    }
    Ok(())
}
