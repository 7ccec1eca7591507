//! Core types and trait definitions for the griddle warehouse pipeline.
//!
//! This crate is deliberately free of I/O and backend dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod error;
pub mod ident;
pub mod query;
pub mod statement;
pub mod warehouse;

pub use error::{Error, Result};
