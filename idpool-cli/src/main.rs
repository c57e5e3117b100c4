//! idpool CLI
//!
//! Command-line interface for fetching identity-pool credentials through the
//! shared credential cache.
//!
//! # Usage
//!
//! ```bash
//! # Credentials for an unauthenticated identity
//! idpool fetch
//!
//! # Credentials for a signed-in user, in credential-process form
//! idpool fetch --login accounts.google.com=<id token> --format credential-process
//!
//! # Drop the cached session
//! idpool clear
//! ```

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use idpool_core::cache::STORE_SERVICE;
use idpool_core::event::{CREDENTIALS_CLEARED, CREDENTIALS_FETCH_FAILED, CREDENTIALS_FETCHED};
use idpool_core::{
    AuthEvent, AuthEventEmitter, DefaultIdentityPoolOperations, FileMarker,
    HttpIdentityExchange, IdentityPoolOperations, LoginProvider, MemoryMarker, SecureStore,
    StoreMarker, create_store,
};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

mod config;
mod output;

use config::{CliConfig, StoreBackend};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "idpool")]
#[command(about = "Identity-pool credentials with a shared secure cache")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch credentials, reusing the cached session while it is valid
    Fetch {
        /// Login provider token (repeatable)
        #[arg(short, long = "login", value_name = "NAME=TOKEN")]
        logins: Vec<String>,

        /// Refresh even if the cached credentials are still valid
        #[arg(short, long)]
        force: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete the cached credentials and identity id
    Clear,

    /// Show the effective configuration
    Config,
}

type Operations = DefaultIdentityPoolOperations<Box<dyn SecureStore>, HttpIdentityExchange>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;

    init_logging(&config.log_level, cli.verbose);
    debug!("Loaded configuration from {:?}", config.config_path);

    match cli.command {
        Commands::Fetch { logins, force, format } => fetch(&config, &logins, force, format).await,
        Commands::Clear => clear(&config).await,
        Commands::Config => show_config(&config),
    }
}

fn init_logging(log_level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_operations(config: &CliConfig) -> Result<Operations> {
    let pool = config.pool()?;
    let owner = config.owner()?;

    let client = match &config.endpoint {
        Some(endpoint) => HttpIdentityExchange::with_endpoint(endpoint, &owner),
        None => HttpIdentityExchange::new(&pool, &owner),
    }
    .context("Failed to create identity-exchange client")?;
    info!("Using identity-exchange endpoint {}", client.endpoint());

    let store = create_store(config.store == StoreBackend::Keyring, STORE_SERVICE);
    let marker = marker_for(store.as_ref(), &config.data_dir);

    DefaultIdentityPoolOperations::open(pool, &owner, store, marker.as_ref(), client)
        .await
        .context("Failed to open credential cache")
}

/// First-run marker for the store actually in use.
///
/// Only a persistent store gets the on-disk flag, so a keyring that was
/// unreachable on this run is still purged once it becomes available.
fn marker_for(store: &dyn SecureStore, data_dir: &Path) -> Box<dyn StoreMarker> {
    if store.is_persistent() {
        Box::new(FileMarker::in_dir(data_dir))
    } else {
        Box::new(MemoryMarker::new())
    }
}

async fn fetch(config: &CliConfig, pairs: &[String], force: bool, format: OutputFormat) -> Result<()> {
    let logins = pairs
        .iter()
        .map(|pair| {
            LoginProvider::parse_pair(pair)
                .ok_or_else(|| anyhow!("Invalid login {:?}, expected NAME=TOKEN", pair))
        })
        .collect::<Result<Vec<_>>>()?;

    let operations = open_operations(config).await?;
    let emitter = AuthEventEmitter::new();
    let mut events = emitter.subscribe();

    let details = operations.fetch_identity_pool_details(&logins, force).await;
    let outcome = match details.error() {
        None => {
            emitter.notify(CREDENTIALS_FETCHED);
            Ok(())
        }
        Some(e) => {
            emitter.notify(CREDENTIALS_FETCH_FAILED);
            Err(anyhow!("Failed to fetch credentials: {}\nHint: {}", e, e.recovery_suggestion()))
        }
    };
    log_events(&mut events);
    outcome?;

    let credentials = details.credentials().map_err(|e| anyhow!("{}", e))?;
    let identity_id = details.identity_id().map_err(|e| anyhow!("{}", e))?;
    println!("{}", output::render(format, credentials, identity_id)?);
    Ok(())
}

async fn clear(config: &CliConfig) -> Result<()> {
    let operations = open_operations(config).await?;
    let emitter = AuthEventEmitter::new();
    let mut events = emitter.subscribe();

    if let Err(e) = operations.clear_credentials().await {
        bail!("Failed to clear credentials: {}\nHint: {}", e, e.recovery_suggestion());
    }
    emitter.notify(CREDENTIALS_CLEARED);
    log_events(&mut events);

    println!("Cleared cached credentials for pool {}", operations.pool().pool_id);
    Ok(())
}

fn show_config(config: &CliConfig) -> Result<()> {
    println!("# {}", config.config_path.display());
    print!("{}", toml::to_string_pretty(config).context("Failed to encode config")?);
    Ok(())
}

fn log_events(events: &mut broadcast::Receiver<AuthEvent>) {
    while let Ok(event) = events.try_recv() {
        debug!("Auth event: {}", event.name);
    }
}
