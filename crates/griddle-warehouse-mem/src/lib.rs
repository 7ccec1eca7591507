//! In-memory warehouse backend.
//!
//! Interprets the `griddle-core` statement model against plain in-memory
//! state: tables hold rows, views are recomputed from their defining query
//! on every read, and change streams track a baseline snapshot that
//! advances transactionally when consumed. Faithful enough to exercise the
//! pipeline end to end; not a database.

mod eval;
mod warehouse;

pub mod error;

pub use error::{Error, Result};
pub use warehouse::{MemWarehouse, Row};
