//! The incremental orders merge procedure.
//!
//! Invoked repeatedly on a schedule. The first run creates the target table
//! with the view's column shape plus a `META_UPDATED_AT` timestamp, and
//! attaches a change stream to the new table. Every run then upserts
//! pending rows from the view's change stream into the target, keyed on
//! `ORDER_DETAIL_ID`, under a temporarily scaled-up warehouse.
//!
//! Reading the stream advances its offset transactionally, so two merge
//! invocations must not run concurrently against the same stream.

use griddle_core::{
  statement::{ColumnType, MergeAssignment, MergeValue, Statement, StreamSource},
  warehouse::Warehouse,
};

use crate::{config::PipelineConfig, scale::with_scaled_warehouse};

/// Unique key of the target table; one row per order line item.
pub const ORDER_KEY: &str = "ORDER_DETAIL_ID";

/// Metadata column appended to the view's shape on the target table.
pub const META_UPDATED_AT: &str = "META_UPDATED_AT";

// ─── Statements ──────────────────────────────────────────────────────────────

/// Statements that build the target table and its stream on first run.
pub fn target_table_statements(config: &PipelineConfig) -> Vec<Statement> {
  vec![
    Statement::CreateTableLike {
      name: config.orders_table_name(),
      like: config.flattened_view_name(),
    },
    Statement::AddColumn {
      table:  config.orders_table_name(),
      column: META_UPDATED_AT.into(),
      ty:     ColumnType::Timestamp,
    },
    Statement::CreateStream {
      name:              config.orders_stream_name(),
      source:            StreamSource::Table(config.orders_table_name()),
      or_replace:        false,
      show_initial_rows: false,
    },
  ]
}

/// The merge statement for a source stream exposing `source_columns`.
///
/// Every source column is copied verbatim except the engine's bookkeeping
/// columns, excluded by name-substring match on `METADATA`; the processing
/// timestamp is set on both merge branches.
pub fn merge_statement(
  config: &PipelineConfig,
  source_columns: &[String],
) -> Statement {
  let mut assignments: Vec<MergeAssignment> = source_columns
    .iter()
    .filter(|column| !column.contains("METADATA"))
    .map(|column| MergeAssignment {
      column: column.clone(),
      value:  MergeValue::SourceColumn(column.clone()),
    })
    .collect();
  assignments.push(MergeAssignment {
    column: META_UPDATED_AT.into(),
    value:  MergeValue::CurrentTimestamp,
  });

  Statement::Merge {
    target: config.orders_table_name(),
    source: config.flattened_view_stream_name(),
    key: ORDER_KEY.into(),
    assignments,
  }
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Create the target table and its stream if this is the first run.
pub async fn ensure_orders_table<W: Warehouse>(
  warehouse: &W,
  config: &PipelineConfig,
) -> Result<(), W::Error> {
  if warehouse.table_exists(&config.orders_table_name()).await? {
    return Ok(());
  }
  tracing::info!(
    table = %config.orders_table_name(),
    "creating orders table and stream"
  );
  for statement in target_table_statements(config) {
    warehouse.execute(&statement).await?;
  }
  Ok(())
}

/// Upsert pending change-stream rows into the target table.
///
/// Runs under a scoped warehouse upscale; compute returns to the idle size
/// whether or not the merge succeeds.
pub async fn merge_order_updates<W: Warehouse>(
  warehouse: &W,
  config: &PipelineConfig,
) -> Result<(), W::Error> {
  let source_columns = warehouse
    .columns_of(&config.flattened_view_stream_name())
    .await?;
  let statement = merge_statement(config, &source_columns);

  with_scaled_warehouse(warehouse, config, async || {
    tracing::info!(table = %config.orders_table_name(), "merging order updates");
    warehouse.execute(&statement).await
  })
  .await
}

/// Procedure entry point: ensure the target exists, then merge.
///
/// `args` carries the caller's optional string arguments; they are logged
/// and otherwise unused.
pub async fn process_orders<W: Warehouse>(
  warehouse: &W,
  config: &PipelineConfig,
  args: &[String],
) -> Result<String, W::Error> {
  if !args.is_empty() {
    tracing::debug!(?args, "ignoring extra procedure arguments");
  }
  ensure_orders_table(warehouse, config).await?;
  merge_order_updates(warehouse, config).await?;
  Ok(format!("Successfully processed {}", config.orders_table))
}
