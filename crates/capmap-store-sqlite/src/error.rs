//! Error type for `capmap-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] capmap_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A text column held a value outside its enumeration.
  #[error("invalid {column} value: {value:?}")]
  InvalidColumn { column: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
