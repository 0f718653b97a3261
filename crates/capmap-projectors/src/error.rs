//! Error type for `capmap-projectors`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("event error: {0}")]
  Event(#[from] capmap_core::Error),

  /// A lookup or write against a backend failed. The derived views may be
  /// stale until the event is redelivered.
  #[error("collaborator error: {0}")]
  Collaborator(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Box a backend error; used as `.map_err(collaborator)?`.
pub(crate) fn collaborator<E>(err: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Collaborator(Box::new(err))
}
