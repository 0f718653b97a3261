//! Error types for `capmap-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("importance must be between 1 and 5, got {0}")]
  InvalidImportance(u8),

  #[error("unknown capability level: {0:?}")]
  UnknownLevel(String),

  #[error("malformed {event_type} payload: {source}")]
  MalformedEvent {
    event_type: String,
    #[source]
    source:     serde_json::Error,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
