//! Replays a captured capability event stream through the projection
//! pipeline.
//!
//! The input is JSON lines, one `{"eventType": ..., "eventData": {...}}`
//! record per line, in emission order. Because every projection is
//! idempotent, a stream can be replayed over an already-populated store.

use std::{io::BufRead, path::PathBuf};

use capmap_core::event::CapabilityEvent;
use capmap_projectors::{
  ProjectionBackend, ProjectionPipeline, Projector, PropagationSettings, StaleInheritancePolicy,
};
use serde::Deserialize;
use tracing::{debug, warn};

pub mod error;

pub use error::{Error, Result};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `capmap.toml` and `CAPMAP_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  #[serde(default)]
  pub stale_inheritance: StaleInheritancePolicy,
  /// Abort on the first bad line or failed event. When false, failures are
  /// logged and counted and the replay carries on.
  #[serde(default = "default_stop_on_error")]
  pub stop_on_error:     bool,
}

fn default_store_path() -> PathBuf { PathBuf::from("capmap.db") }

fn default_stop_on_error() -> bool { true }

impl ReplayConfig {
  pub fn propagation(&self) -> PropagationSettings {
    PropagationSettings {
      stale_inheritance: self.stale_inheritance,
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// One line of the event stream, as the event store hands it out.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
  pub event_type: String,
  #[serde(default)]
  pub event_data: serde_json::Value,
}

/// Counts reported at the end of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
  pub applied: usize,
  /// Records whose event type no projection knows.
  pub skipped: usize,
  pub failed:  usize,
}

fn parse_record(line: usize, text: &str) -> Result<EventRecord> {
  serde_json::from_str(text).map_err(|source| Error::Record { line, source })
}

async fn apply_record<S>(
  pipeline: &ProjectionPipeline<S>,
  line: usize,
  record: &EventRecord,
) -> Result<bool>
where
  S: ProjectionBackend,
{
  let failed = |source: capmap_projectors::Error| Error::Projection {
    line,
    event_type: record.event_type.clone(),
    source,
  };

  let data =
    serde_json::to_vec(&record.event_data).map_err(|source| Error::Record { line, source })?;
  let Some(event) = CapabilityEvent::decode(&record.event_type, &data)
    .map_err(|e| failed(e.into()))?
  else {
    debug!(line, event_type = %record.event_type, "skipping unknown event type");
    return Ok(false);
  };
  pipeline.project(&event).await.map_err(failed)?;
  Ok(true)
}

/// Feed every record from `reader` through `pipeline`, in order.
///
/// Blank lines are ignored. With `stop_on_error` the first failure is
/// returned; otherwise it is logged and counted.
pub async fn replay<S, R>(
  pipeline: &ProjectionPipeline<S>,
  reader: R,
  stop_on_error: bool,
) -> Result<ReplaySummary>
where
  S: ProjectionBackend,
  R: BufRead,
{
  let mut summary = ReplaySummary::default();

  for (index, text) in reader.lines().enumerate() {
    let line = index + 1;
    let text = text?;
    if text.trim().is_empty() {
      continue;
    }

    let outcome = match parse_record(line, &text) {
      Ok(record) => apply_record(pipeline, line, &record).await,
      Err(err) => Err(err),
    };
    match outcome {
      Ok(true) => summary.applied += 1,
      Ok(false) => summary.skipped += 1,
      Err(err) if stop_on_error => return Err(err),
      Err(err) => {
        warn!(error = %err, "event failed; continuing");
        summary.failed += 1;
      }
    }
  }

  Ok(summary)
}

#[cfg(test)]
mod tests;
