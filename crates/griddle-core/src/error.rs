//! Error types for `griddle-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid object name: {0:?}")]
  InvalidObjectName(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
