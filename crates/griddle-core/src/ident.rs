//! Qualified object names.
//!
//! Warehouse objects (tables, views, streams) are addressed as
//! `SCHEMA.NAME`, or as a bare `NAME` resolved against the session's
//! current schema.

use std::fmt;

use crate::{Error, Result};

/// A possibly schema-qualified object name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectName {
  pub schema: Option<String>,
  pub name:   String,
}

impl ObjectName {
  pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
    Self { schema: Some(schema.into()), name: name.into() }
  }

  pub fn bare(name: impl Into<String>) -> Self {
    Self { schema: None, name: name.into() }
  }

  /// Parse `"SCHEMA.NAME"` or `"NAME"`.
  pub fn parse(s: &str) -> Result<Self> {
    let parts: Vec<&str> = s.split('.').collect();
    match parts.as_slice() {
      [name] if !name.is_empty() => Ok(Self::bare(*name)),
      [schema, name] if !schema.is_empty() && !name.is_empty() => {
        Ok(Self::new(*schema, *name))
      }
      _ => Err(Error::InvalidObjectName(s.to_owned())),
    }
  }
}

impl fmt::Display for ObjectName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.schema {
      Some(schema) => write!(f, "{schema}.{}", self.name),
      None => write!(f, "{}", self.name),
    }
  }
}
