//! pagewatch CLI
//!
//! Local execution entry point. For AWS Lambda, use `pagewatch-lambda`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pagewatch::{
    error::Result,
    models::Config,
    notify,
    pipeline,
    services::{AddOutcome, WatchRegistry},
    storage::LocalStorage,
};

/// pagewatch - web page change notifier
#[derive(Parser, Debug)]
#[command(
    name = "pagewatch",
    version,
    about = "Notifies users when the text of a watched web page changes"
)]
struct Cli {
    /// Path to storage directory holding config, watch lists and snapshots
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one detection cycle over every registered URL
    Check,

    /// Register a URL for a user
    Add { user: String, url: String },

    /// List a user's registered URLs
    List { user: String },

    /// Remove a user's URL by its list number
    Remove { user: String, number: usize },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging; `--verbose` wins over the configured level.
fn init_logging(verbose: bool, configured: &str) {
    let level = if verbose { "debug" } else { configured };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.storage_dir.join("config.toml");
    let loaded = Config::load(&config_path);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.as_str())
        .unwrap_or("info");
    init_logging(cli.verbose, level);

    let config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            config_path.display(),
            e
        );
        Config::default()
    });
    let storage = Arc::new(LocalStorage::new(&cli.storage_dir));

    match cli.command {
        Command::Check => {
            config.validate()?;
            let sender = notify::from_config(&config.notify)?;
            let report = pipeline::run_detection(&config, storage, sender).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Add { user, url } => {
            let registry = WatchRegistry::new(storage.clone(), storage, config.messages);
            match registry.add(&user, &url).await? {
                AddOutcome::Added { index, url } => println!("{index}: {url}"),
                AddOutcome::AlreadyRegistered { url } => {
                    log::warn!("{} is already registered for {}", url, user)
                }
            }
        }

        Command::List { user } => {
            let registry = WatchRegistry::new(storage.clone(), storage, config.messages);
            println!("{}", registry.render_list(&user).await?);
        }

        Command::Remove { user, number } => {
            let registry = WatchRegistry::new(storage.clone(), storage, config.messages);
            let url = registry.remove(&user, number).await?;
            println!("{number}: {url}");
        }

        Command::Validate => {
            log::info!("Validating {}...", config_path.display());
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK");
        }
    }

    Ok(())
}
