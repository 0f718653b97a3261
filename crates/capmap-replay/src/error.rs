//! Error type for `capmap-replay`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("line {line}: invalid event record: {source}")]
  Record {
    line:   usize,
    #[source]
    source: serde_json::Error,
  },

  #[error("line {line}: {event_type} failed: {source}")]
  Projection {
    line:       usize,
    event_type: String,
    #[source]
    source:     capmap_projectors::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
