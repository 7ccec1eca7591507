//! Pipeline object names and warehouse sizing.

use griddle_core::{ident::ObjectName, statement::WarehouseSize};
use serde::Deserialize;

/// Names of the warehouse objects the pipeline owns, plus compute sizing
/// for the merge step. The defaults reproduce the standard deployment
/// layout; every field can be overridden from configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Schema holding the raw ingested POS tables.
  pub raw_schema:            String,
  /// Schema holding the harmonized view and target table.
  pub harmonized_schema:     String,
  pub flattened_view:        String,
  pub flattened_view_stream: String,
  pub orders_table:          String,
  pub orders_stream:         String,
  /// The virtual warehouse the merge runs on.
  pub warehouse:             String,
  /// Compute size while the merge executes.
  pub merge_size:            WarehouseSize,
  /// Compute size restored after the merge.
  pub idle_size:             WarehouseSize,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      raw_schema:            "RAW_POS".into(),
      harmonized_schema:     "HARMONIZED".into(),
      flattened_view:        "POS_FLATTENED_V".into(),
      flattened_view_stream: "POS_FLATTENED_V_STREAM".into(),
      orders_table:          "ORDERS".into(),
      orders_stream:         "ORDERS_STREAM".into(),
      warehouse:             "POS_WH".into(),
      merge_size:            WarehouseSize::XLarge,
      idle_size:             WarehouseSize::XSmall,
    }
  }
}

impl PipelineConfig {
  pub fn raw_table(&self, name: &str) -> ObjectName {
    ObjectName::new(&self.raw_schema, name)
  }

  pub fn flattened_view_name(&self) -> ObjectName {
    ObjectName::new(&self.harmonized_schema, &self.flattened_view)
  }

  pub fn flattened_view_stream_name(&self) -> ObjectName {
    ObjectName::new(&self.harmonized_schema, &self.flattened_view_stream)
  }

  pub fn orders_table_name(&self) -> ObjectName {
    ObjectName::new(&self.harmonized_schema, &self.orders_table)
  }

  pub fn orders_stream_name(&self) -> ObjectName {
    ObjectName::new(&self.harmonized_schema, &self.orders_stream)
  }
}
