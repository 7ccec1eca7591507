//! [`MemWarehouse`] — the in-memory implementation of [`Warehouse`].

use std::{
  collections::BTreeMap,
  sync::{Arc, Mutex, MutexGuard},
};

use chrono::{SecondsFormat, Utc};
use griddle_core::{
  ident::ObjectName,
  query::SelectQuery,
  statement::{MergeAssignment, MergeValue, Statement, StreamSource, WarehouseSize},
  warehouse::Warehouse,
};
use serde_json::Value;

use crate::{Error, Result, eval::eval_query};

/// A single row: column name → JSON value. Missing columns read as null.
pub type Row = BTreeMap<String, Value>;

/// Bookkeeping columns a change stream adds to its source's schema.
const STREAM_METADATA_COLUMNS: [&str; 3] =
  ["METADATA$ACTION", "METADATA$ISUPDATE", "METADATA$ROW_ID"];

// ─── State ───────────────────────────────────────────────────────────────────

pub(crate) struct Table {
  pub(crate) columns: Vec<String>,
  pub(crate) rows:    Vec<Row>,
}

struct Stream {
  source:   StreamSource,
  /// Rows of the source as of the last consumption (or stream creation).
  baseline: Vec<Row>,
}

#[derive(Default)]
pub(crate) struct State {
  pub(crate) tables: BTreeMap<String, Table>,
  pub(crate) views:  BTreeMap<String, SelectQuery>,
  streams:           BTreeMap<String, Stream>,
  warehouses:        BTreeMap<String, WarehouseSize>,
  size_history:      Vec<(String, WarehouseSize)>,
  fail_next_merge:   bool,
}

// ─── Read helpers ────────────────────────────────────────────────────────────

fn relation_rows(state: &State, key: &str) -> Result<Vec<Row>> {
  if let Some(table) = state.tables.get(key) {
    return Ok(table.rows.clone());
  }
  if let Some(query) = state.views.get(key) {
    return eval_query(state, query);
  }
  Err(Error::UnknownRelation(key.to_owned()))
}

fn relation_columns(state: &State, key: &str) -> Result<Vec<String>> {
  if let Some(table) = state.tables.get(key) {
    return Ok(table.columns.clone());
  }
  if let Some(query) = state.views.get(key) {
    return Ok(query.output_columns());
  }
  Err(Error::UnknownRelation(key.to_owned()))
}

fn source_rows(state: &State, source: &StreamSource) -> Result<Vec<Row>> {
  relation_rows(state, &source.object().to_string())
}

/// Rows of the stream's source that are new or changed since the baseline —
/// a multiset difference by whole-row equality.
fn stream_delta(state: &State, stream: &Stream) -> Result<Vec<Row>> {
  let current = source_rows(state, &stream.source)?;
  let mut remaining = stream.baseline.clone();
  let mut delta = Vec::new();
  for row in current {
    if let Some(i) = remaining.iter().position(|b| b == &row) {
      remaining.swap_remove(i);
    } else {
      delta.push(row);
    }
  }
  Ok(delta)
}

// ─── MemWarehouse ────────────────────────────────────────────────────────────

/// An in-memory warehouse. Cloning is cheap; clones share state.
#[derive(Clone, Default)]
pub struct MemWarehouse {
  state: Arc<Mutex<State>>,
}

impl MemWarehouse {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, State> {
    self
      .state
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  // ── Seeding ───────────────────────────────────────────────────────────────

  /// Register a virtual warehouse at an initial compute size.
  pub fn create_warehouse(&self, name: &str, size: WarehouseSize) {
    self.lock().warehouses.insert(name.to_owned(), size);
  }

  /// Create an empty base table with the given column order.
  pub fn create_table(&self, name: &ObjectName, columns: &[&str]) -> Result<()> {
    let mut state = self.lock();
    let key = name.to_string();
    if state.tables.contains_key(&key) || state.views.contains_key(&key) {
      return Err(Error::ObjectExists(key));
    }
    state.tables.insert(key, Table {
      columns: columns.iter().map(|c| (*c).to_owned()).collect(),
      rows:    Vec::new(),
    });
    Ok(())
  }

  /// Append rows to a base table. Row keys must be known columns.
  pub fn insert_rows(&self, name: &ObjectName, rows: Vec<Row>) -> Result<()> {
    let mut state = self.lock();
    let key = name.to_string();
    let table = state
      .tables
      .get_mut(&key)
      .ok_or_else(|| Error::UnknownTable(key.clone()))?;
    for row in &rows {
      for column in row.keys() {
        if !table.columns.contains(column) {
          return Err(Error::UnknownColumn {
            object: key.clone(),
            column: column.clone(),
          });
        }
      }
    }
    table.rows.extend(rows);
    Ok(())
  }

  /// Mutate every row of a base table in place. Seam for simulating
  /// upstream changes in tests and local runs.
  pub fn update_rows(
    &self,
    name: &ObjectName,
    mut f: impl FnMut(&mut Row),
  ) -> Result<()> {
    let mut state = self.lock();
    let key = name.to_string();
    let table = state
      .tables
      .get_mut(&key)
      .ok_or_else(|| Error::UnknownTable(key))?;
    for row in &mut table.rows {
      f(row);
    }
    Ok(())
  }

  // ── Inspection ────────────────────────────────────────────────────────────

  /// Current rows of a table or view. Views are recomputed from their
  /// defining query, so the result always reflects live base-table state.
  pub fn rows_of(&self, name: &ObjectName) -> Result<Vec<Row>> {
    relation_rows(&self.lock(), &name.to_string())
  }

  /// Unconsumed rows of a stream — a peek; the stream's offset does not
  /// advance.
  pub fn pending_rows(&self, name: &ObjectName) -> Result<Vec<Row>> {
    let state = self.lock();
    let key = name.to_string();
    let stream = state
      .streams
      .get(&key)
      .ok_or(Error::UnknownStream(key))?;
    stream_delta(&state, stream)
  }

  /// Current compute size of a virtual warehouse.
  pub fn warehouse_size(&self, name: &str) -> Result<WarehouseSize> {
    self
      .lock()
      .warehouses
      .get(name)
      .copied()
      .ok_or_else(|| Error::UnknownWarehouse(name.to_owned()))
  }

  /// Every size change applied so far, in order.
  pub fn size_history(&self) -> Vec<(String, WarehouseSize)> {
    self.lock().size_history.clone()
  }

  /// Arm the next merge statement to fail after validation, leaving target
  /// rows and stream offsets untouched. Test seam for exercising error
  /// paths.
  pub fn fail_next_merge(&self) {
    self.lock().fail_next_merge = true;
  }
}

// ─── Merge execution ─────────────────────────────────────────────────────────

fn execute_merge(
  state: &mut State,
  target: &ObjectName,
  source: &ObjectName,
  key: &str,
  assignments: &[MergeAssignment],
) -> Result<()> {
  let target_key = target.to_string();
  let source_key = source.to_string();

  if !state.tables.contains_key(&target_key) {
    return Err(Error::UnknownTable(target_key));
  }

  let (delta, current) = {
    let stream = state
      .streams
      .get(&source_key)
      .ok_or_else(|| Error::UnknownStream(source_key.clone()))?;
    (stream_delta(state, stream)?, source_rows(state, &stream.source)?)
  };

  if state.fail_next_merge {
    state.fail_next_merge = false;
    return Err(Error::Injected("merge"));
  }

  // Validate the assignment set before touching rows or offsets.
  if let Some(table) = state.tables.get(&target_key) {
    for assignment in assignments {
      if !table.columns.contains(&assignment.column) {
        return Err(Error::UnknownColumn {
          object: target_key.clone(),
          column: assignment.column.clone(),
        });
      }
    }
  }

  // Consume the stream; the offset advances atomically with the merge.
  if let Some(stream) = state.streams.get_mut(&source_key) {
    stream.baseline = current;
  }

  let processed_at =
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));
  let merged = delta.len();

  if let Some(table) = state.tables.get_mut(&target_key) {
    for source_row in delta {
      let mut assigned = Row::new();
      for assignment in assignments {
        let value = match &assignment.value {
          MergeValue::SourceColumn(column) => {
            source_row.get(column).cloned().unwrap_or(Value::Null)
          }
          MergeValue::CurrentTimestamp => processed_at.clone(),
        };
        assigned.insert(assignment.column.clone(), value);
      }

      let key_value = source_row.get(key).cloned().unwrap_or(Value::Null);
      match table
        .rows
        .iter_mut()
        .find(|row| row.get(key) == Some(&key_value))
      {
        Some(existing) => existing.extend(assigned),
        None => table.rows.push(assigned),
      }
    }
  }

  tracing::debug!(table = %target_key, rows = merged, "merge applied");
  Ok(())
}

// ─── Warehouse impl ──────────────────────────────────────────────────────────

impl Warehouse for MemWarehouse {
  type Error = Error;

  async fn execute(&self, statement: &Statement) -> Result<()> {
    tracing::debug!(sql = %statement.to_sql(), "execute");
    let mut state = self.lock();

    match statement {
      Statement::CreateViewAs { name, query } => {
        let key = name.to_string();
        if state.tables.contains_key(&key) {
          return Err(Error::ObjectExists(key));
        }
        state.views.insert(key, query.clone());
        Ok(())
      }

      Statement::CreateStream { name, source, or_replace, show_initial_rows } => {
        let key = name.to_string();
        if !or_replace && state.streams.contains_key(&key) {
          return Err(Error::ObjectExists(key));
        }
        let baseline = if *show_initial_rows {
          Vec::new()
        } else {
          source_rows(&state, source)?
        };
        state
          .streams
          .insert(key, Stream { source: source.clone(), baseline });
        Ok(())
      }

      Statement::CreateTableLike { name, like } => {
        let key = name.to_string();
        if state.tables.contains_key(&key) || state.views.contains_key(&key) {
          return Err(Error::ObjectExists(key));
        }
        let columns = relation_columns(&state, &like.to_string())?;
        state
          .tables
          .insert(key, Table { columns, rows: Vec::new() });
        Ok(())
      }

      Statement::AddColumn { table, column, .. } => {
        let key = table.to_string();
        let t = state
          .tables
          .get_mut(&key)
          .ok_or_else(|| Error::UnknownTable(key.clone()))?;
        if t.columns.contains(column) {
          return Err(Error::ObjectExists(format!("{key}.{column}")));
        }
        t.columns.push(column.clone());
        Ok(())
      }

      Statement::AlterWarehouseSize { warehouse, size, .. } => {
        if !state.warehouses.contains_key(warehouse) {
          return Err(Error::UnknownWarehouse(warehouse.clone()));
        }
        state.warehouses.insert(warehouse.clone(), *size);
        state.size_history.push((warehouse.clone(), *size));
        Ok(())
      }

      Statement::Merge { target, source, key, assignments } => {
        execute_merge(&mut state, target, source, key, assignments)
      }
    }
  }

  async fn table_exists(&self, table: &ObjectName) -> Result<bool> {
    Ok(self.lock().tables.contains_key(&table.to_string()))
  }

  async fn columns_of(&self, object: &ObjectName) -> Result<Vec<String>> {
    let state = self.lock();
    let key = object.to_string();

    if let Ok(columns) = relation_columns(&state, &key) {
      return Ok(columns);
    }
    if let Some(stream) = state.streams.get(&key) {
      let mut columns =
        relation_columns(&state, &stream.source.object().to_string())?;
      columns.extend(STREAM_METADATA_COLUMNS.iter().map(|c| (*c).to_owned()));
      return Ok(columns);
    }
    Err(Error::UnknownObject(key))
  }
}
