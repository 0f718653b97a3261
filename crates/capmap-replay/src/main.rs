//! capmap-replay binary.
//!
//! Reads `capmap.toml` (or the path given with `--config`), opens the SQLite
//! store, and replays a JSON-lines event file through the projections.

use std::{
  fs::File,
  io::BufReader,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use capmap_projectors::ProjectionPipeline;
use capmap_replay::{ReplayConfig, replay};
use capmap_store_sqlite::SqliteStore;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Replay capability events into the effective views")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "capmap.toml")]
  config: PathBuf,

  /// JSON-lines file of `{"eventType", "eventData"}` records.
  events: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CAPMAP"))
    .build()
    .context("failed to read config file")?;

  let replay_cfg: ReplayConfig = settings
    .try_deserialize()
    .context("failed to deserialise ReplayConfig")?;

  let store_path = expand_tilde(&replay_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let pipeline = ProjectionPipeline::new(Arc::new(store), &replay_cfg.propagation());

  let events = File::open(&cli.events)
    .with_context(|| format!("failed to open events file {:?}", cli.events))?;

  tracing::info!(
    events = %cli.events.display(),
    store = %store_path.display(),
    stale_inheritance = ?replay_cfg.stale_inheritance,
    "replaying"
  );
  let summary = replay(&pipeline, BufReader::new(events), replay_cfg.stop_on_error)
    .await
    .context("replay aborted")?;

  tracing::info!(
    applied = summary.applied,
    skipped = summary.skipped,
    failed = summary.failed,
    "replay finished"
  );
  if summary.failed > 0 {
    tracing::warn!("{} events failed; rerun after fixing them to converge", summary.failed);
  }

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
