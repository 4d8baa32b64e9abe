//! photosearch - index a photo directory and search it with text.

mod cli;

use anyhow::Context;
use clap::Parser;
use photosearch::config::LoggingYamlConfig;
use photosearch::{AppConfig, AssetLibrary, CancellationToken, PhotoSearch};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(root) = cli.library {
        config.library.root = root;
    }

    init_tracing(&config.logging);

    let app = PhotoSearch::from_config(&config).context("starting photosearch")?;

    match cli.command {
        Command::Index => {
            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("interrupt received, cancelling indexing");
                    on_ctrl_c.cancel();
                }
            });

            let report = app.index_library(&cancel).await?;
            println!(
                "indexed {} new, {} already indexed, {} failed, {} cancelled",
                report.encoded, report.skipped_existing, report.failed, report.cancelled
            );
            if let Some(Err(err)) = &report.saved {
                anyhow::bail!("embeddings were not saved: {err}");
            }
        }
        Command::Search { query, top_k } => {
            let query = query.join(" ");
            let hits = app.search(&query, top_k).await?;
            if hits.is_empty() {
                println!("no matches");
            }
            for hit in hits {
                println!("{}", hit.path.display());
            }
        }
        Command::Status => {
            let store = app.store();
            let listed = app.library().list_images().await?.len();
            println!("library:   {} ({listed} images)", config.library.root.display());
            println!("indexed:   {}", store.len());
            println!("stale:     {}", store.stale_ids().len());
            println!("model:     {} ({}d)", store.model_version(), store.dimension());
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(cfg: &LoggingYamlConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cfg.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
