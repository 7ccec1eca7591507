//! End-to-end pipeline tests against the in-memory warehouse.

use griddle_core::{
  statement::{Statement, WarehouseSize},
  warehouse::Warehouse as _,
};
use griddle_warehouse_mem::{Error as MemError, MemWarehouse, Row};
use serde_json::{Value, json};

use crate::{config::PipelineConfig, flatten, orders};

fn rows(value: Value) -> Vec<Row> {
  serde_json::from_value(value).expect("fixture rows")
}

/// Seed the six raw tables with a small, fully-joined data set plus one
/// orphan order line whose order header does not exist.
fn seeded() -> (MemWarehouse, PipelineConfig) {
  let wh = MemWarehouse::new();
  let config = PipelineConfig::default();
  wh.create_warehouse(&config.warehouse, config.idle_size);

  wh.create_table(&config.raw_table("ORDER_DETAIL"), &[
    "ORDER_DETAIL_ID",
    "LINE_NUMBER",
    "MENU_ITEM_ID",
    "QUANTITY",
    "UNIT_PRICE",
    "PRICE",
    "ORDER_ID",
  ])
  .unwrap();
  wh.insert_rows(
    &config.raw_table("ORDER_DETAIL"),
    rows(json!([
      { "ORDER_DETAIL_ID": 1001, "LINE_NUMBER": 1, "MENU_ITEM_ID": 10,
        "QUANTITY": 2, "UNIT_PRICE": 3.5, "PRICE": 7.0, "ORDER_ID": 1 },
      { "ORDER_DETAIL_ID": 1002, "LINE_NUMBER": 2, "MENU_ITEM_ID": 11,
        "QUANTITY": 1, "UNIT_PRICE": 9.0, "PRICE": 9.0, "ORDER_ID": 1 },
      { "ORDER_DETAIL_ID": 1003, "LINE_NUMBER": 1, "MENU_ITEM_ID": 10,
        "QUANTITY": 3, "UNIT_PRICE": 3.5, "PRICE": 10.5, "ORDER_ID": 2 },
      { "ORDER_DETAIL_ID": 1099, "LINE_NUMBER": 1, "MENU_ITEM_ID": 10,
        "QUANTITY": 1, "UNIT_PRICE": 3.5, "PRICE": 3.5, "ORDER_ID": 99 },
    ])),
  )
  .unwrap();

  wh.create_table(&config.raw_table("ORDER_HEADER"), &[
    "ORDER_ID",
    "TRUCK_ID",
    "ORDER_TS",
    "ORDER_AMOUNT",
    "ORDER_TAX_AMOUNT",
    "ORDER_DISCOUNT_AMOUNT",
    "LOCATION_ID",
    "ORDER_TOTAL",
  ])
  .unwrap();
  wh.insert_rows(
    &config.raw_table("ORDER_HEADER"),
    rows(json!([
      { "ORDER_ID": 1, "TRUCK_ID": 7, "ORDER_TS": "2024-06-01T11:42:05Z",
        "ORDER_AMOUNT": 16.0, "ORDER_TAX_AMOUNT": 1.2,
        "ORDER_DISCOUNT_AMOUNT": 0.0, "LOCATION_ID": 100, "ORDER_TOTAL": 17.2 },
      { "ORDER_ID": 2, "TRUCK_ID": 7, "ORDER_TS": "2024-06-02T09:15:30Z",
        "ORDER_AMOUNT": 10.5, "ORDER_TAX_AMOUNT": 0.8,
        "ORDER_DISCOUNT_AMOUNT": 0.5, "LOCATION_ID": 100, "ORDER_TOTAL": 10.8 },
    ])),
  )
  .unwrap();

  wh.create_table(&config.raw_table("TRUCK"), &[
    "TRUCK_ID",
    "PRIMARY_CITY",
    "REGION",
    "COUNTRY",
    "FRANCHISE_FLAG",
    "FRANCHISE_ID",
  ])
  .unwrap();
  wh.insert_rows(
    &config.raw_table("TRUCK"),
    rows(json!([
      { "TRUCK_ID": 7, "PRIMARY_CITY": "Seattle", "REGION": "WA",
        "COUNTRY": "United States", "FRANCHISE_FLAG": 1, "FRANCHISE_ID": 5 },
    ])),
  )
  .unwrap();

  wh.create_table(&config.raw_table("MENU"), &[
    "MENU_ITEM_ID",
    "TRUCK_BRAND_NAME",
    "MENU_TYPE",
    "MENU_ITEM_NAME",
  ])
  .unwrap();
  wh.insert_rows(
    &config.raw_table("MENU"),
    rows(json!([
      { "MENU_ITEM_ID": 10, "TRUCK_BRAND_NAME": "Freezing Point",
        "MENU_TYPE": "Ice Cream", "MENU_ITEM_NAME": "Mango Sticky Rice" },
      { "MENU_ITEM_ID": 11, "TRUCK_BRAND_NAME": "Freezing Point",
        "MENU_TYPE": "Ice Cream", "MENU_ITEM_NAME": "Popsicle" },
    ])),
  )
  .unwrap();

  wh.create_table(&config.raw_table("FRANCHISE"), &[
    "FRANCHISE_ID",
    "FIRST_NAME",
    "LAST_NAME",
  ])
  .unwrap();
  wh.insert_rows(
    &config.raw_table("FRANCHISE"),
    rows(json!([
      { "FRANCHISE_ID": 5, "FIRST_NAME": "Alma", "LAST_NAME": "Reyes" },
    ])),
  )
  .unwrap();

  wh.create_table(&config.raw_table("LOCATION"), &["LOCATION_ID"]).unwrap();
  wh.insert_rows(
    &config.raw_table("LOCATION"),
    rows(json!([{ "LOCATION_ID": 100 }])),
  )
  .unwrap();

  (wh, config)
}

async fn seeded_with_view() -> (MemWarehouse, PipelineConfig) {
  let (wh, config) = seeded();
  flatten::create_flattened_view(&wh, &config).await.unwrap();
  flatten::create_view_stream(&wh, &config).await.unwrap();
  (wh, config)
}

fn key_of(row: &Row) -> &Value {
  &row[orders::ORDER_KEY]
}

// ─── View definition ─────────────────────────────────────────────────────────

#[test]
fn view_query_produces_the_fixed_column_list() {
  let config = PipelineConfig::default();
  let columns = flatten::flattened_view_query(&config).output_columns();
  assert_eq!(columns.len(), 25);
  assert_eq!(columns[0], "ORDER_ID");
  assert_eq!(columns[3], "ORDER_TS_DATE");
  assert_eq!(columns[24], "ORDER_TOTAL");
}

#[test]
fn view_stream_statement_shows_initial_rows() {
  let config = PipelineConfig::default();
  assert_eq!(
    flatten::view_stream_statement(&config).to_sql(),
    "CREATE OR REPLACE STREAM HARMONIZED.POS_FLATTENED_V_STREAM \
     ON VIEW HARMONIZED.POS_FLATTENED_V SHOW_INITIAL_ROWS = TRUE"
  );
}

#[test]
fn merge_statement_excludes_stream_bookkeeping_columns() {
  let config = PipelineConfig::default();
  let source_columns: Vec<String> =
    ["ORDER_DETAIL_ID", "QUANTITY", "METADATA$ACTION", "METADATA$ISUPDATE"]
      .iter()
      .map(|c| (*c).to_owned())
      .collect();

  let Statement::Merge { assignments, key, .. } =
    orders::merge_statement(&config, &source_columns)
  else {
    panic!("expected a merge statement");
  };

  assert_eq!(key, orders::ORDER_KEY);
  let columns: Vec<&str> =
    assignments.iter().map(|a| a.column.as_str()).collect();
  assert_eq!(columns, ["ORDER_DETAIL_ID", "QUANTITY", "META_UPDATED_AT"]);
}

// ─── Flattened view ──────────────────────────────────────────────────────────

#[tokio::test]
async fn view_flattens_and_drops_orphan_lines() {
  let (wh, config) = seeded_with_view().await;
  let flattened = wh.rows_of(&config.flattened_view_name()).unwrap();

  // Three joined lines; the orphan (order 99) is dropped.
  assert_eq!(flattened.len(), 3);
  let first = flattened
    .iter()
    .find(|r| key_of(r) == &json!(1001))
    .unwrap();
  assert_eq!(first["TRUCK_BRAND_NAME"], json!("Freezing Point"));
  assert_eq!(first["FRANCHISEE_FIRST_NAME"], json!("Alma"));
  assert_eq!(first["ORDER_TS_DATE"], json!("2024-06-01"));
  assert_eq!(first["ORDER_TOTAL"], json!(17.2));
}

// ─── Initial load ────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_run_loads_every_view_row_exactly_once() {
  let (wh, config) = seeded_with_view().await;

  let status = orders::process_orders(&wh, &config, &[]).await.unwrap();
  assert_eq!(status, "Successfully processed ORDERS");

  let target = wh.rows_of(&config.orders_table_name()).unwrap();
  assert_eq!(target.len(), 3);

  let mut keys: Vec<&Value> = target.iter().map(key_of).collect();
  keys.sort_by_key(|v| v.as_i64());
  keys.dedup();
  assert_eq!(keys.len(), 3);

  assert!(target.iter().all(|r| r[orders::META_UPDATED_AT].is_string()));
}

// ─── Idempotence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_run_with_no_changes_leaves_target_unchanged() {
  let (wh, config) = seeded_with_view().await;

  orders::process_orders(&wh, &config, &[]).await.unwrap();
  let before = wh.rows_of(&config.orders_table_name()).unwrap();

  orders::process_orders(&wh, &config, &[]).await.unwrap();
  assert_eq!(wh.rows_of(&config.orders_table_name()).unwrap(), before);
}

// ─── Incremental behaviour ───────────────────────────────────────────────────

#[tokio::test]
async fn new_order_line_is_inserted_on_next_run() {
  let (wh, config) = seeded_with_view().await;
  orders::process_orders(&wh, &config, &[]).await.unwrap();

  wh.insert_rows(
    &config.raw_table("ORDER_DETAIL"),
    rows(json!([
      { "ORDER_DETAIL_ID": 1004, "LINE_NUMBER": 2, "MENU_ITEM_ID": 11,
        "QUANTITY": 2, "UNIT_PRICE": 9.0, "PRICE": 18.0, "ORDER_ID": 2 },
    ])),
  )
  .unwrap();
  orders::process_orders(&wh, &config, &[]).await.unwrap();

  let target = wh.rows_of(&config.orders_table_name()).unwrap();
  assert_eq!(target.len(), 4);
  assert!(target.iter().any(|r| key_of(r) == &json!(1004)));
}

#[tokio::test]
async fn source_update_propagates_without_duplicating() {
  let (wh, config) = seeded_with_view().await;
  orders::process_orders(&wh, &config, &[]).await.unwrap();

  let before = wh.rows_of(&config.orders_table_name()).unwrap();
  let stale_meta = before
    .iter()
    .find(|r| key_of(r) == &json!(1003))
    .unwrap()[orders::META_UPDATED_AT]
    .clone();

  wh.update_rows(&config.raw_table("ORDER_DETAIL"), |row| {
    if row["ORDER_DETAIL_ID"] == json!(1003) {
      row.insert("QUANTITY".into(), json!(9));
    }
  })
  .unwrap();
  orders::process_orders(&wh, &config, &[]).await.unwrap();

  let target = wh.rows_of(&config.orders_table_name()).unwrap();
  assert_eq!(target.len(), 3);

  let updated = target.iter().find(|r| key_of(r) == &json!(1003)).unwrap();
  assert_eq!(updated["QUANTITY"], json!(9));

  // RFC 3339 with fixed precision compares chronologically as a string.
  let refreshed = updated[orders::META_UPDATED_AT].as_str().unwrap();
  assert!(refreshed >= stale_meta.as_str().unwrap());

  // Untouched rows keep their original processing timestamp.
  let untouched = target.iter().find(|r| key_of(r) == &json!(1001)).unwrap();
  let was = before.iter().find(|r| key_of(r) == &json!(1001)).unwrap();
  assert_eq!(untouched[orders::META_UPDATED_AT], was[orders::META_UPDATED_AT]);
}

// ─── Schema shape ────────────────────────────────────────────────────────────

#[tokio::test]
async fn target_schema_is_view_shape_plus_metadata_timestamp() {
  let (wh, config) = seeded_with_view().await;
  orders::process_orders(&wh, &config, &[]).await.unwrap();

  let mut expected = wh
    .columns_of(&config.flattened_view_name())
    .await
    .unwrap();
  expected.push(orders::META_UPDATED_AT.to_owned());

  let actual = wh.columns_of(&config.orders_table_name()).await.unwrap();
  assert_eq!(actual, expected);
}

// ─── Resource symmetry ───────────────────────────────────────────────────────

#[tokio::test]
async fn warehouse_returns_to_idle_size_after_merge() {
  let (wh, config) = seeded_with_view().await;
  orders::process_orders(&wh, &config, &[]).await.unwrap();

  assert_eq!(
    wh.warehouse_size(&config.warehouse).unwrap(),
    WarehouseSize::XSmall
  );
  let sizes: Vec<WarehouseSize> =
    wh.size_history().into_iter().map(|(_, size)| size).collect();
  assert_eq!(sizes, [WarehouseSize::XLarge, WarehouseSize::XSmall]);
}

#[tokio::test]
async fn warehouse_returns_to_idle_size_when_merge_fails() {
  let (wh, config) = seeded_with_view().await;

  wh.fail_next_merge();
  let err = orders::process_orders(&wh, &config, &[]).await.unwrap_err();
  assert!(matches!(err, MemError::Injected(_)));

  assert_eq!(
    wh.warehouse_size(&config.warehouse).unwrap(),
    WarehouseSize::XSmall
  );

  // Nothing was consumed; the next run catches up in full.
  orders::process_orders(&wh, &config, &[]).await.unwrap();
  assert_eq!(wh.rows_of(&config.orders_table_name()).unwrap().len(), 3);
}
