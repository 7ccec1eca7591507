//! Evaluation of [`SelectQuery`] against in-memory state.
//!
//! Implements exactly the shapes the query model can express: projected
//! base-table scans, inner `USING` joins, and a final column list.

use griddle_core::query::{Expr, SelectItem, SelectQuery, TableScan};
use serde_json::Value;

use crate::{
  Error, Result,
  warehouse::{Row, State, Table},
};

pub(crate) fn eval_query(state: &State, query: &SelectQuery) -> Result<Vec<Row>> {
  let mut rows = eval_scan(state, &query.base)?;
  for join in &query.joins {
    let right = eval_scan(state, &join.scan)?;
    rows = join_using(rows, right, &join.using);
  }

  if query.projection.is_empty() {
    return Ok(rows);
  }
  let label = query.base.table.to_string();
  rows
    .into_iter()
    .map(|row| project(&label, row, &query.projection))
    .collect()
}

fn project(label: &str, row: Row, columns: &[String]) -> Result<Row> {
  let mut out = Row::new();
  for column in columns {
    let value = row.get(column).cloned().ok_or_else(|| Error::UnknownColumn {
      object: format!("join over {label}"),
      column: column.clone(),
    })?;
    out.insert(column.clone(), value);
  }
  Ok(out)
}

// ─── Scans ───────────────────────────────────────────────────────────────────

fn eval_scan(state: &State, scan: &TableScan) -> Result<Vec<Row>> {
  let key = scan.table.to_string();
  let table = state
    .tables
    .get(&key)
    .ok_or_else(|| Error::UnknownTable(key.clone()))?;
  table
    .rows
    .iter()
    .map(|row| eval_items(&key, table, row, &scan.items))
    .collect()
}

fn eval_items(
  object: &str,
  table: &Table,
  row: &Row,
  items: &[SelectItem],
) -> Result<Row> {
  let mut out = Row::new();
  for item in items {
    let value = match &item.expr {
      Expr::Column(column) => {
        ensure_column(object, table, column)?;
        row.get(column).cloned().unwrap_or(Value::Null)
      }
      Expr::ToDate(column) => {
        ensure_column(object, table, column)?;
        to_date(object, column, row.get(column))?
      }
    };
    out.insert(item.output_name().to_owned(), value);
  }
  Ok(out)
}

fn ensure_column(object: &str, table: &Table, column: &str) -> Result<()> {
  if table.columns.iter().any(|c| c == column) {
    Ok(())
  } else {
    Err(Error::UnknownColumn {
      object: object.to_owned(),
      column: column.to_owned(),
    })
  }
}

/// Date part of an RFC 3339 timestamp value; null passes through.
fn to_date(object: &str, column: &str, value: Option<&Value>) -> Result<Value> {
  match value {
    None | Some(Value::Null) => Ok(Value::Null),
    Some(Value::String(s)) => {
      let ts = chrono::DateTime::parse_from_rfc3339(s).map_err(|_| {
        Error::NotATimestamp {
          object: object.to_owned(),
          column: column.to_owned(),
        }
      })?;
      Ok(Value::String(ts.date_naive().to_string()))
    }
    Some(_) => Err(Error::NotATimestamp {
      object: object.to_owned(),
      column: column.to_owned(),
    }),
  }
}

// ─── Joins ───────────────────────────────────────────────────────────────────

/// Inner equi-join. `USING` key columns keep the left copy; a null key never
/// matches, per SQL semantics.
fn join_using(left: Vec<Row>, right: Vec<Row>, using: &[String]) -> Vec<Row> {
  let mut out = Vec::new();
  for l in &left {
    for r in &right {
      let matched = using.iter().all(|k| match (l.get(k), r.get(k)) {
        (Some(a), Some(b)) if !a.is_null() && !b.is_null() => a == b,
        _ => false,
      });
      if matched {
        let mut row = l.clone();
        for (column, value) in r {
          row.entry(column.clone()).or_insert_with(|| value.clone());
        }
        out.push(row);
      }
    }
  }
  out
}
