//! The `Warehouse` trait — the session seam between pipeline logic and the
//! storage platform.
//!
//! Implemented by backends (`griddle-warehouse-mem` in this workspace; a
//! remote session in a deployment). Pipeline operations depend on this
//! abstraction, not on any concrete backend, and hold no session state of
//! their own.

use std::future::Future;

use crate::{ident::ObjectName, statement::Statement};

/// Abstraction over a live warehouse session.
///
/// Backend errors are propagated unmodified through pipeline operations; no
/// classification or recovery happens on this side of the seam. The
/// warehouse itself owns atomicity of merges and of stream-offset
/// advancement.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait Warehouse: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Execute a single statement.
  fn execute<'a>(
    &'a self,
    statement: &'a Statement,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Whether a table with this name exists. Used as the existence probe
  /// before first-time object creation; views and streams don't count.
  fn table_exists<'a>(
    &'a self,
    table: &'a ObjectName,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Ordered column names of a table, view, or stream. Stream schemas
  /// include the engine's `METADATA$...` bookkeeping columns.
  fn columns_of<'a>(
    &'a self,
    object: &'a ObjectName,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;
}
