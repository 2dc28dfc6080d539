//! blogsync CLI
//!
//! Watches a blog for new articles and notes, downloads them, rewrites
//! embedded images to a third-party host, and keeps per-article metadata.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use blogsync::{
    config::Config,
    error::Result,
    pipeline::{self, ContentRewriter, SyncEngine},
    services::{BlogClient, IdentityPool, ImageBed, RateLimiter},
    storage::{DocumentStore, MetadataStore},
};

/// blogsync - incremental blog downloader
#[derive(Parser, Debug)]
#[command(name = "blogsync", version, about = "Blog article monitor and downloader")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor for updates on an interval, downloading as they appear
    Watch,

    /// Run one incremental sync and exit
    Sync {
        /// Re-download everything, ignoring local state
        #[arg(long)]
        force: bool,
    },

    /// Check once whether the remote has newer content
    Check,

    /// Validate configuration and print effective settings
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Mask a token for display, keeping the last four characters.
fn mask_token(token: &str) -> String {
    let tail: String = token
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("********{tail}")
}

/// Wire up the shared components and the sync engine.
async fn build_engine(config: &Config) -> Result<SyncEngine> {
    let root = config.storage_root();

    let identities = Arc::new(IdentityPool::from_file(
        &config.identity.file,
        config.identity.change_interval,
    ));
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.max_requests,
        Duration::from_secs(config.rate_limit.window_secs),
    ));
    let client = Arc::new(BlogClient::new(&config.api, identities, limiter)?);
    let host = Arc::new(ImageBed::new(
        config.api.image_host_url.clone(),
        config.auth.token.clone(),
    ));
    let rewriter = Arc::new(ContentRewriter::new(
        Arc::clone(&client),
        host,
        root.join("temp"),
    ));
    let metadata = Arc::new(MetadataStore::open(root.join("message.json")).await?);
    let documents = Arc::new(DocumentStore::new(root.join("markdown")));

    Ok(SyncEngine::new(
        client,
        rewriter,
        metadata,
        documents,
        config.workers.max_workers,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli
        .config
        .or_else(|| std::env::var("CONFIG_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = Config::load_or_default(&config_path);

    if let Command::Validate = cli.command {
        config.validate()?;
        log::info!("Configuration OK");
        log::info!("- Token: {}", mask_token(&config.auth.token));
        log::info!("- Identity file: {}", config.identity.file);
        log::info!("- Storage path: {}", config.storage.path);
        log::info!("- Workers: {}", config.workers.max_workers);
        log::info!(
            "- Rate limit: {} req / {}s",
            config.rate_limit.max_requests,
            config.rate_limit.window_secs
        );
        log::info!("- Check interval: {}s", config.monitor.interval_secs);
        return Ok(());
    }

    // Fatal before any network activity.
    config.validate()?;

    let engine = build_engine(&config).await?;

    match cli.command {
        Command::Watch => {
            // First check runs immediately; forced re-download short-circuits
            // the loop entirely.
            if config.monitor.force_download {
                log::info!("Force download enabled, re-downloading everything...");
                let saved = engine.sync(true).await?;
                log::info!("Downloaded {} articles", saved.len());
                return Ok(());
            }

            let shutdown = CancellationToken::new();
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Interrupt received, shutting down...");
                    signal_token.cancel();
                }
            });

            pipeline::watch(
                &engine,
                Duration::from_secs(config.monitor.interval_secs),
                config.monitor.auto_download,
                shutdown,
            )
            .await;
        }

        Command::Sync { force } => {
            let saved = engine.sync(force).await?;
            log::info!("Sync complete: {} new documents", saved.len());
        }

        Command::Check => {
            if engine.check_updates().await? {
                log::info!(">>> New content available <<<");
            } else {
                log::info!(">>> Already up to date <<<");
            }
        }

        Command::Validate => unreachable!("handled above"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_keeps_last_four() {
        assert_eq!(mask_token("7ef80fab5e3a"), "********5e3a");
        assert_eq!(mask_token("abc"), "********abc");
    }
}
