//! The wire-level statement forms issued to the warehouse.
//!
//! These render to the exact SQL text the storage platform expects. A
//! backend either sends the rendered text over a remote session or
//! interprets the typed variants directly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ident::ObjectName, query::SelectQuery};

// ─── Warehouse sizes ─────────────────────────────────────────────────────────

/// The compute-size ladder accepted by
/// `ALTER WAREHOUSE ... SET WAREHOUSE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WarehouseSize {
  XSmall,
  Small,
  Medium,
  Large,
  XLarge,
  XxLarge,
}

impl WarehouseSize {
  pub fn as_sql(self) -> &'static str {
    match self {
      Self::XSmall => "XSMALL",
      Self::Small => "SMALL",
      Self::Medium => "MEDIUM",
      Self::Large => "LARGE",
      Self::XLarge => "XLARGE",
      Self::XxLarge => "XXLARGE",
    }
  }
}

impl fmt::Display for WarehouseSize {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_sql())
  }
}

// ─── Stream sources ──────────────────────────────────────────────────────────

/// What a change stream is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSource {
  Table(ObjectName),
  View(ObjectName),
}

impl StreamSource {
  pub fn object(&self) -> &ObjectName {
    match self {
      Self::Table(name) | Self::View(name) => name,
    }
  }

  fn keyword(&self) -> &'static str {
    match self {
      Self::Table(_) => "TABLE",
      Self::View(_) => "VIEW",
    }
  }
}

// ─── Column types ────────────────────────────────────────────────────────────

/// Column types the pipeline declares when altering tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
  Timestamp,
  Date,
  Number,
  Text,
}

impl ColumnType {
  pub fn as_sql(self) -> &'static str {
    match self {
      Self::Timestamp => "TIMESTAMP",
      Self::Date => "DATE",
      Self::Number => "NUMBER",
      Self::Text => "TEXT",
    }
  }
}

// ─── Merge assignments ───────────────────────────────────────────────────────

/// Right-hand side of a merge assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeValue {
  /// Copy the named column from the merge source.
  SourceColumn(String),
  /// The processing timestamp at merge execution.
  CurrentTimestamp,
}

/// One `column = value` pair, applied on both merge branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeAssignment {
  pub column: String,
  pub value:  MergeValue,
}

impl MergeValue {
  fn render(&self) -> String {
    match self {
      Self::SourceColumn(column) => format!("S.{column}"),
      Self::CurrentTimestamp => "CURRENT_TIMESTAMP()".to_owned(),
    }
  }
}

// ─── Statement ───────────────────────────────────────────────────────────────

/// A single operation issued to the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
  /// `CREATE OR REPLACE VIEW <name> AS <query>`.
  CreateViewAs { name: ObjectName, query: SelectQuery },

  /// `CREATE [OR REPLACE] STREAM <name> ON <source>`. With
  /// `show_initial_rows`, the first read emits every existing source row as
  /// a synthetic insert; replacement drops unconsumed history.
  CreateStream {
    name:              ObjectName,
    source:            StreamSource,
    or_replace:        bool,
    show_initial_rows: bool,
  },

  /// `CREATE TABLE <name> LIKE <like>` — copies the column shape, no rows.
  CreateTableLike { name: ObjectName, like: ObjectName },

  /// `ALTER TABLE <table> ADD COLUMN <column> <ty>` (nullable).
  AddColumn {
    table:  ObjectName,
    column: String,
    ty:     ColumnType,
  },

  /// `ALTER WAREHOUSE <warehouse> SET WAREHOUSE_SIZE = <size>`.
  AlterWarehouseSize {
    warehouse:           String,
    size:                WarehouseSize,
    wait_for_completion: bool,
  },

  /// `MERGE INTO <target> USING <source> ON T.<key> = S.<key>`: matched
  /// rows are updated with the assignment set, unmatched rows inserted with
  /// the same set. Consuming a stream source advances its offset.
  Merge {
    target:      ObjectName,
    source:      ObjectName,
    key:         String,
    assignments: Vec<MergeAssignment>,
  },
}

impl Statement {
  pub fn to_sql(&self) -> String {
    match self {
      Self::CreateViewAs { name, query } => {
        format!("CREATE OR REPLACE VIEW {name} AS\n{}", query.to_sql())
      }

      Self::CreateStream { name, source, or_replace, show_initial_rows } => {
        let mut sql = format!(
          "CREATE {}STREAM {name} ON {} {}",
          if *or_replace { "OR REPLACE " } else { "" },
          source.keyword(),
          source.object(),
        );
        if *show_initial_rows {
          sql.push_str(" SHOW_INITIAL_ROWS = TRUE");
        }
        sql
      }

      Self::CreateTableLike { name, like } => {
        format!("CREATE TABLE {name} LIKE {like}")
      }

      Self::AddColumn { table, column, ty } => {
        format!("ALTER TABLE {table} ADD COLUMN {column} {}", ty.as_sql())
      }

      Self::AlterWarehouseSize { warehouse, size, wait_for_completion } => {
        let mut sql =
          format!("ALTER WAREHOUSE {warehouse} SET WAREHOUSE_SIZE = {size}");
        if *wait_for_completion {
          sql.push_str(" WAIT_FOR_COMPLETION = TRUE");
        }
        sql
      }

      Self::Merge { target, source, key, assignments } => {
        let updates = assignments
          .iter()
          .map(|a| format!("T.{} = {}", a.column, a.value.render()))
          .collect::<Vec<_>>()
          .join(", ");
        let insert_columns = assignments
          .iter()
          .map(|a| a.column.as_str())
          .collect::<Vec<_>>()
          .join(", ");
        let insert_values = assignments
          .iter()
          .map(|a| a.value.render())
          .collect::<Vec<_>>()
          .join(", ");

        format!(
          "MERGE INTO {target} T\n\
           USING {source} S\n\
           ON T.{key} = S.{key}\n\
           WHEN MATCHED THEN UPDATE SET {updates}\n\
           WHEN NOT MATCHED THEN INSERT ({insert_columns}) VALUES ({insert_values})"
        )
      }
    }
  }
}
