// Overthinker - autonomous planner
// Main entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use overthinker::config::constants::DEFAULT_HTTP_ADDR;
use overthinker::config::ConfigStore;
use overthinker::engine::Engine;
use overthinker::prompts::PromptStore;
use overthinker::providers::HttpProvider;
use overthinker::scheduling::PlannerScheduler;
use overthinker::server::{self, AppState, ServerConfig};
use overthinker::storage::Storage;
use overthinker::Scope;

#[derive(Parser, Debug)]
#[command(name = "overthinker", version, about = "Autonomous goal planner")]
struct Cli {
    /// Project root holding config/, data/, prompts/ and ui/
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API and run the autopilot (default)
    Serve {
        /// Bind address
        #[arg(long, default_value = DEFAULT_HTTP_ADDR)]
        bind: String,
    },
    /// Run one iteration for a scope and print the plan
    Run {
        /// daily, weekly or yearly
        scope: Scope,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("overthinker=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let root = cli.root;

    let storage = Arc::new(Storage::new(root.join("data")));
    storage
        .init_dirs()
        .context("Failed to initialise data directories")?;

    let config_store = ConfigStore::new(&root);
    let provider = Arc::new(HttpProvider::new()?);
    let engine = Arc::new(Engine::new(
        Arc::clone(&storage),
        PromptStore::new(root.join("prompts")),
        provider,
    ));

    match cli.command.unwrap_or(Command::Serve {
        bind: DEFAULT_HTTP_ADDR.to_string(),
    }) {
        Command::Run { scope } => {
            let config = config_store.load()?;
            let result = engine.run_iteration(scope, &config).await?;
            eprintln!("✓ {} ({})", result.run_id, result.ts);
            println!("{}", result.plan_markdown);
            Ok(())
        }
        Command::Serve { bind } => {
            let mut scheduler = PlannerScheduler::new(Arc::clone(&engine), config_store.clone());
            if let Err(e) = scheduler.start() {
                tracing::error!("Scheduler not started: {}", e);
            }
            let scheduler = Arc::new(Mutex::new(scheduler));

            let state = AppState {
                engine,
                storage,
                config_store,
                scheduler: Arc::clone(&scheduler),
            };
            let server_config = ServerConfig {
                bind_address: bind,
                ui_dir: Some(root.join("ui")),
            };

            let result = server::serve(state, server_config, shutdown_signal()).await;
            scheduler.lock().await.shutdown();
            result
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
