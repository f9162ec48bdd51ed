//! # Latent Assets CLI (`lat`)
//!
//! Command-line client for the image search service. One-shot commands
//! cover uploading, searching, retagging, deleting, and fetching images;
//! `lat shell` opens an interactive session with staging and dialogs.
//!
//! ## Usage
//!
//! ```bash
//! lat --config ./config/lat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lat upload <path>...` | Stage image files/directories and upload them as one batch |
//! | `lat search "<text>"` | Query the index |
//! | `lat retag <path>` | Replace the tags of an indexed image |
//! | `lat delete <path>` | Remove an image from the index |
//! | `lat fetch <path>` | Download an image's asset bytes |
//! | `lat shell` | Interactive session |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (e.g. `RUST_LOG=latent_assets=debug`).

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use latent_assets::client::{HttpIndex, ImageIndex};
use latent_assets::config::{self, Config};
use latent_assets::controller::{AppController, QueryOutcome};
use latent_assets::files::collect_files;
use latent_assets::results::asset_basename;
use latent_assets::shell::Shell;
use latent_assets::tags::TagChipInput;

/// Latent Assets CLI: stage, tag, upload, search, and curate indexed images.
#[derive(Parser)]
#[command(
    name = "lat",
    about = "Latent Assets: client for a tagged-image search service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lat.toml`. When the file does not exist the
    /// service is assumed at `http://localhost:8000`.
    #[arg(long, global = true, default_value = "./config/lat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload image files as one batch.
    ///
    /// Directories are walked recursively. Files that are not images are
    /// skipped. Every file receives the same tags.
    Upload {
        /// Files or directories to upload.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Comma-separated tags applied to every file.
        #[arg(long)]
        tags: Option<String>,
    },

    /// Search indexed images by text.
    Search {
        /// The query text.
        text: String,

        /// Number of results to return (minimum 1).
        #[arg(long)]
        top_k: Option<i64>,

        /// Restrict or boost results by tag. Repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Replace the tags of an indexed image.
    Retag {
        /// Server path of the image, as printed by `search`.
        path: String,

        /// Comma-separated tags. Omit to clear all tags.
        #[arg(long)]
        tags: Option<String>,
    },

    /// Remove an image from the index.
    Delete {
        /// Server path of the image, as printed by `search`.
        path: String,

        /// Skip the confirmation and delete immediately.
        #[arg(long)]
        yes: bool,
    },

    /// Download the image behind a server path.
    Fetch {
        /// Server path of the image.
        path: String,

        /// Output file. Defaults to the path's file name.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Start an interactive session.
    Shell,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let cfg = config::load_or_minimal(&cli.config)?;
    let index: Arc<dyn ImageIndex> = Arc::new(HttpIndex::new(&cfg.api)?);

    match cli.command {
        Commands::Upload { paths, tags } => {
            run_upload(index, &cfg, &paths, tags.as_deref()).await?;
        }
        Commands::Search { text, top_k, tags } => {
            run_search(index, &cfg, &text, top_k, &tags).await?;
        }
        Commands::Retag { path, tags } => {
            let mut input = TagChipInput::new(cfg.tags.policy());
            input.type_str(tags.as_deref().unwrap_or(""));
            let tags = input.flush().to_vec();
            index.update_tags(&path, &tags).await?;
            println!("{}: {}", path, tags.join(", "));
        }
        Commands::Delete { path, yes } => {
            if !yes {
                println!(
                    "Would delete {} ({}). Re-run with --yes to confirm.",
                    path,
                    index.asset_url(&path)
                );
                return Ok(());
            }
            index.delete(&path).await?;
            println!("Deleted {}", path);
        }
        Commands::Fetch { path, out } => {
            let out = out.unwrap_or_else(|| PathBuf::from(asset_basename(&path)));
            let bytes = index.fetch_asset(&path).await?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Wrote {} bytes to {}", bytes.len(), out.display());
        }
        Commands::Shell => {
            let controller = AppController::new(index, &cfg);
            let mut shell = Shell::new(controller, std::io::stdout());
            shell
                .run(tokio::io::BufReader::new(tokio::io::stdin()))
                .await?;
        }
    }

    Ok(())
}

async fn run_upload(
    index: Arc<dyn ImageIndex>,
    cfg: &Config,
    paths: &[PathBuf],
    tags: Option<&str>,
) -> anyhow::Result<()> {
    let mut controller = AppController::new(index, cfg);
    let handles = collect_files(paths)?;
    let found = handles.len();
    let staged = controller.add_files(handles)?;
    if staged == 0 {
        println!("No image files to upload ({} files skipped).", found);
        return Ok(());
    }
    if let Some(tags) = tags {
        for i in 0..staged {
            controller.update_upload_tags(i, |t| t.type_str(tags))?;
        }
    }
    if found > staged {
        println!("Skipping {} non-image files.", found - staged);
    }

    match controller.submit_batch().await {
        Some(Ok(_)) => {
            println!("{}", controller.status().unwrap_or_default());
            Ok(())
        }
        Some(Err(e)) => bail!(e),
        None => Ok(()),
    }
}

async fn run_search(
    index: Arc<dyn ImageIndex>,
    cfg: &Config,
    text: &str,
    top_k: Option<i64>,
    tags: &[String],
) -> anyhow::Result<()> {
    let mut controller = AppController::new(index, cfg);
    if let Some(k) = top_k {
        controller.set_top_k(k);
    }
    for tag in tags {
        controller.tag_filter_mut().type_str(tag);
        controller.tag_filter_mut().flush();
    }

    match controller.run_query(text).await {
        None => {
            println!("Nothing to search for.");
        }
        Some(QueryOutcome::Failed) => {
            bail!("{}", controller.query_error().unwrap_or("query failed"));
        }
        Some(_) => {
            let mut out = std::io::stdout().lock();
            if controller.results().is_empty() {
                writeln!(out, "No results.")?;
            }
            for (i, result) in controller.results().iter().enumerate() {
                let marker = if result.tag_match { "  [tagged]" } else { "" };
                writeln!(out, "{}. {}{}", i + 1, result.path, marker)?;
                writeln!(out, "    url:  {}", controller.asset_url(&result.path))?;
                if !result.tags.is_empty() {
                    writeln!(out, "    tags: {}", result.tags.join(", "))?;
                }
            }
        }
    }
    Ok(())
}
