//! Local pipeline runs against the in-memory warehouse.
//!
//! Seeds the six raw tables from JSON fixture files (one array-of-objects
//! file per table), then runs the view, stream, and merge stages end to
//! end. Useful for validating pipeline changes without a live warehouse.

use std::path::Path;

use anyhow::Context as _;
use griddle_pipeline::{PipelineConfig, flatten, orders};
use griddle_warehouse_mem::{MemWarehouse, Row};

/// The raw tables and their fixture file names (lowercased, `.json`).
const RAW_TABLES: [&str; 6] =
  ["ORDER_DETAIL", "ORDER_HEADER", "TRUCK", "MENU", "FRANCHISE", "LOCATION"];

pub async fn run(config: &PipelineConfig, fixtures: &Path) -> anyhow::Result<()> {
  let warehouse = MemWarehouse::new();
  warehouse.create_warehouse(&config.warehouse, config.idle_size);

  for table in RAW_TABLES {
    let path = fixtures.join(format!("{}.json", table.to_lowercase()));
    let raw = std::fs::read_to_string(&path)
      .with_context(|| format!("reading fixture {}", path.display()))?;
    let rows: Vec<Row> = serde_json::from_str(&raw)
      .with_context(|| format!("parsing fixture {}", path.display()))?;

    let name = config.raw_table(table);
    let columns = fixture_columns(&rows);
    let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
    warehouse.create_table(&name, &column_refs)?;
    let count = rows.len();
    warehouse.insert_rows(&name, rows)?;
    tracing::info!(table = %name, rows = count, "seeded fixture");
  }

  flatten::create_flattened_view(&warehouse, config).await?;
  flatten::create_view_stream(&warehouse, config).await?;
  let status = orders::process_orders(&warehouse, config, &[]).await?;

  let target_rows = warehouse.rows_of(&config.orders_table_name())?;
  tracing::info!(
    rows = target_rows.len(),
    warehouse_size = %warehouse.warehouse_size(&config.warehouse)?,
    "{status}"
  );
  Ok(())
}

/// Union of keys across all fixture rows, in first-seen order.
fn fixture_columns(rows: &[Row]) -> Vec<String> {
  let mut columns: Vec<String> = Vec::new();
  for row in rows {
    for column in row.keys() {
      if !columns.iter().any(|c| c == column) {
        columns.push(column.clone());
      }
    }
  }
  columns
}
