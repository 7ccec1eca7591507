//! Scoped warehouse resizing around expensive operations.

use griddle_core::{statement::Statement, warehouse::Warehouse};

use crate::config::PipelineConfig;

/// Run `body` with the warehouse scaled to `merge_size`, restoring
/// `idle_size` afterwards on every exit path.
///
/// The upscale waits for completion so the body actually runs on the larger
/// warehouse; the restore does not. If both the body and the restore fail,
/// the body's error wins and the restore failure is logged.
pub async fn with_scaled_warehouse<W, T, F>(
  warehouse: &W,
  config: &PipelineConfig,
  body: F,
) -> Result<T, W::Error>
where
  W: Warehouse,
  F: AsyncFnOnce() -> Result<T, W::Error>,
{
  warehouse
    .execute(&Statement::AlterWarehouseSize {
      warehouse:           config.warehouse.clone(),
      size:                config.merge_size,
      wait_for_completion: true,
    })
    .await?;

  let result = body().await;

  let restored = warehouse
    .execute(&Statement::AlterWarehouseSize {
      warehouse:           config.warehouse.clone(),
      size:                config.idle_size,
      wait_for_completion: false,
    })
    .await;

  match (result, restored) {
    (Ok(value), Ok(())) => Ok(value),
    (Ok(_), Err(restore)) => Err(restore),
    (Err(body_err), Ok(())) => Err(body_err),
    (Err(body_err), Err(restore)) => {
      tracing::warn!(error = %restore, "failed to restore warehouse size");
      Err(body_err)
    }
  }
}
