//! Error type for `griddle-warehouse-mem`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown table: {0}")]
  UnknownTable(String),

  #[error("unknown table or view: {0}")]
  UnknownRelation(String),

  #[error("unknown stream: {0}")]
  UnknownStream(String),

  #[error("unknown object: {0}")]
  UnknownObject(String),

  #[error("unknown warehouse: {0}")]
  UnknownWarehouse(String),

  #[error("object already exists: {0}")]
  ObjectExists(String),

  #[error("unknown column {column} in {object}")]
  UnknownColumn { object: String, column: String },

  #[error("column {column} in {object} is not a timestamp")]
  NotATimestamp { object: String, column: String },

  /// Raised in place of a statement armed with
  /// [`MemWarehouse::fail_next_merge`](crate::MemWarehouse::fail_next_merge).
  #[error("injected failure: {0}")]
  Injected(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
