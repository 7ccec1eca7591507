//! Relational query model for view definitions.
//!
//! Small by design: only the shapes the pipeline emits — base-table scans
//! with explicit projections, inner equi-joins on named key columns, and a
//! final output column list. A query renders to a single `SELECT` statement.

use crate::ident::ObjectName;

// ─── Projection items ────────────────────────────────────────────────────────

/// A column expression inside a scan's projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
  /// A plain column reference.
  Column(String),
  /// `TO_DATE(<column>)` — the date part of a timestamp column.
  ToDate(String),
}

/// One item of a scan's projection, with an optional output alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
  pub expr:  Expr,
  pub alias: Option<String>,
}

impl SelectItem {
  pub fn column(name: impl Into<String>) -> Self {
    Self { expr: Expr::Column(name.into()), alias: None }
  }

  pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
    Self { expr: Expr::Column(name.into()), alias: Some(alias.into()) }
  }

  pub fn to_date(name: impl Into<String>, alias: impl Into<String>) -> Self {
    Self { expr: Expr::ToDate(name.into()), alias: Some(alias.into()) }
  }

  /// The name this item contributes to the scan's output relation.
  pub fn output_name(&self) -> &str {
    match (&self.alias, &self.expr) {
      (Some(alias), _) => alias,
      (None, Expr::Column(name) | Expr::ToDate(name)) => name,
    }
  }

  fn render(&self) -> String {
    let rendered = match &self.expr {
      Expr::Column(name) => name.clone(),
      Expr::ToDate(name) => format!("TO_DATE({name})"),
    };
    match &self.alias {
      Some(alias) => format!("{rendered} AS {alias}"),
      None => rendered,
    }
  }
}

// ─── Relations ───────────────────────────────────────────────────────────────

/// A base-table scan with an explicit projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScan {
  pub table: ObjectName,
  pub alias: String,
  pub items: Vec<SelectItem>,
}

impl TableScan {
  pub fn new(
    table: ObjectName,
    alias: impl Into<String>,
    items: Vec<SelectItem>,
  ) -> Self {
    Self { table, alias: alias.into(), items }
  }

  /// Names of the columns this scan produces, in order.
  pub fn output_columns(&self) -> impl Iterator<Item = &str> {
    self.items.iter().map(SelectItem::output_name)
  }

  fn render(&self) -> String {
    let items = self
      .items
      .iter()
      .map(SelectItem::render)
      .collect::<Vec<_>>()
      .join(", ");
    format!("(SELECT {items} FROM {}) {}", self.table, self.alias)
  }
}

/// An inner equi-join against a further scan, `USING` the named key columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
  pub scan:  TableScan,
  pub using: Vec<String>,
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// A left-deep chain of inner joins with a final projection.
///
/// Rows of the base relation that find no match in a joined relation are
/// dropped; this is the only join semantics the pipeline uses. `USING` key
/// columns appear once in the join result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
  pub base:       TableScan,
  pub joins:      Vec<Join>,
  /// Final output column list. Empty means every column of the join result.
  pub projection: Vec<String>,
}

impl SelectQuery {
  pub fn from(base: TableScan) -> Self {
    Self { base, joins: Vec::new(), projection: Vec::new() }
  }

  pub fn join(mut self, scan: TableScan, using: &[&str]) -> Self {
    self.joins.push(Join {
      scan,
      using: using.iter().map(|k| (*k).to_owned()).collect(),
    });
    self
  }

  pub fn select(mut self, columns: &[&str]) -> Self {
    self.projection = columns.iter().map(|c| (*c).to_owned()).collect();
    self
  }

  /// Names of the columns this query produces, in order.
  pub fn output_columns(&self) -> Vec<String> {
    if !self.projection.is_empty() {
      return self.projection.clone();
    }
    let mut out: Vec<String> =
      self.base.output_columns().map(str::to_owned).collect();
    for join in &self.joins {
      for column in join.scan.output_columns() {
        if !out.iter().any(|c| c == column) {
          out.push(column.to_owned());
        }
      }
    }
    out
  }

  pub fn to_sql(&self) -> String {
    let projection = if self.projection.is_empty() {
      "*".to_owned()
    } else {
      self.projection.join(", ")
    };

    let mut sql = format!("SELECT {projection}\nFROM {}", self.base.render());
    for join in &self.joins {
      sql.push_str(&format!(
        "\nJOIN {} USING ({})",
        join.scan.render(),
        join.using.join(", ")
      ));
    }
    sql
  }
}
