//! The flattened POS view and its change stream.
//!
//! Six raw tables are joined into one denormalized relation: franchise onto
//! truck, truck and location onto order header, order header and menu onto
//! order detail. Inner joins throughout, so order lines without a matching
//! header, truck, franchise, location, or menu item are dropped.

use griddle_core::{
  query::{SelectItem, SelectQuery, TableScan},
  statement::{Statement, StreamSource},
  warehouse::Warehouse,
};

use crate::config::PipelineConfig;

// ─── View definition ─────────────────────────────────────────────────────────

/// The defining query of the flattened view: six scans, five equi-joins,
/// and the fixed output column list.
pub fn flattened_view_query(config: &PipelineConfig) -> SelectQuery {
  let order_detail = TableScan::new(config.raw_table("ORDER_DETAIL"), "OD", vec![
    SelectItem::column("ORDER_DETAIL_ID"),
    SelectItem::column("LINE_NUMBER"),
    SelectItem::column("MENU_ITEM_ID"),
    SelectItem::column("QUANTITY"),
    SelectItem::column("UNIT_PRICE"),
    SelectItem::column("PRICE"),
    SelectItem::column("ORDER_ID"),
  ]);

  let order_header = TableScan::new(config.raw_table("ORDER_HEADER"), "OH", vec![
    SelectItem::column("ORDER_ID"),
    SelectItem::column("TRUCK_ID"),
    SelectItem::column("ORDER_TS"),
    SelectItem::to_date("ORDER_TS", "ORDER_TS_DATE"),
    SelectItem::column("ORDER_AMOUNT"),
    SelectItem::column("ORDER_TAX_AMOUNT"),
    SelectItem::column("ORDER_DISCOUNT_AMOUNT"),
    SelectItem::column("LOCATION_ID"),
    SelectItem::column("ORDER_TOTAL"),
  ]);

  let truck = TableScan::new(config.raw_table("TRUCK"), "T", vec![
    SelectItem::column("TRUCK_ID"),
    SelectItem::column("PRIMARY_CITY"),
    SelectItem::column("REGION"),
    SelectItem::column("COUNTRY"),
    SelectItem::column("FRANCHISE_FLAG"),
    SelectItem::column("FRANCHISE_ID"),
  ]);

  let menu = TableScan::new(config.raw_table("MENU"), "M", vec![
    SelectItem::column("MENU_ITEM_ID"),
    SelectItem::column("TRUCK_BRAND_NAME"),
    SelectItem::column("MENU_TYPE"),
    SelectItem::column("MENU_ITEM_NAME"),
  ]);

  let franchise = TableScan::new(config.raw_table("FRANCHISE"), "F", vec![
    SelectItem::column("FRANCHISE_ID"),
    SelectItem::aliased("FIRST_NAME", "FRANCHISEE_FIRST_NAME"),
    SelectItem::aliased("LAST_NAME", "FRANCHISEE_LAST_NAME"),
  ]);

  let location = TableScan::new(config.raw_table("LOCATION"), "L", vec![
    SelectItem::column("LOCATION_ID"),
  ]);

  SelectQuery::from(order_detail)
    .join(order_header, &["ORDER_ID"])
    .join(truck, &["TRUCK_ID"])
    .join(franchise, &["FRANCHISE_ID"])
    .join(location, &["LOCATION_ID"])
    .join(menu, &["MENU_ITEM_ID"])
    .select(&[
      "ORDER_ID",
      "TRUCK_ID",
      "ORDER_TS",
      "ORDER_TS_DATE",
      "ORDER_DETAIL_ID",
      "LINE_NUMBER",
      "TRUCK_BRAND_NAME",
      "MENU_TYPE",
      "PRIMARY_CITY",
      "REGION",
      "COUNTRY",
      "FRANCHISE_FLAG",
      "FRANCHISE_ID",
      "FRANCHISEE_FIRST_NAME",
      "FRANCHISEE_LAST_NAME",
      "LOCATION_ID",
      "MENU_ITEM_ID",
      "MENU_ITEM_NAME",
      "QUANTITY",
      "UNIT_PRICE",
      "PRICE",
      "ORDER_AMOUNT",
      "ORDER_TAX_AMOUNT",
      "ORDER_DISCOUNT_AMOUNT",
      "ORDER_TOTAL",
    ])
}

/// `CREATE OR REPLACE VIEW` for the flattened view.
pub fn view_statement(config: &PipelineConfig) -> Statement {
  Statement::CreateViewAs {
    name:  config.flattened_view_name(),
    query: flattened_view_query(config),
  }
}

/// The change stream over the view. `SHOW_INITIAL_ROWS` makes the first
/// read emit every existing row as a synthetic insert; replacement drops
/// unconsumed history.
pub fn view_stream_statement(config: &PipelineConfig) -> Statement {
  Statement::CreateStream {
    name:              config.flattened_view_stream_name(),
    source:            StreamSource::View(config.flattened_view_name()),
    or_replace:        true,
    show_initial_rows: true,
  }
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Publish (or re-publish) the flattened view.
pub async fn create_flattened_view<W: Warehouse>(
  warehouse: &W,
  config: &PipelineConfig,
) -> Result<(), W::Error> {
  tracing::info!(view = %config.flattened_view_name(), "creating flattened view");
  warehouse.execute(&view_statement(config)).await
}

/// Attach (or re-attach) the change stream to the flattened view.
pub async fn create_view_stream<W: Warehouse>(
  warehouse: &W,
  config: &PipelineConfig,
) -> Result<(), W::Error> {
  tracing::info!(
    stream = %config.flattened_view_stream_name(),
    "creating view stream"
  );
  warehouse.execute(&view_stream_statement(config)).await
}
