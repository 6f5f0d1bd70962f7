//! Add-to-cart flow: validate the request, admit the item, then hand the
//! atomic check-and-set to the store.

use nyama_flow::{Ctx, Flow, StageControl};

use crate::errors::AppError;
use crate::flows::contexts::AddToCartCtx;

pub fn add_to_cart_flow() -> Flow<AddToCartCtx, AppError> {
  let mut flow = Flow::new(&[
    ("validate_request", false, None),
    ("admit_item", false, None),
    ("reserve_row", false, None),
  ]);

  flow.on_stage("validate_request", |ctx: Ctx<AddToCartCtx>| async move {
    let quantity = ctx.read().quantity;
    if quantity < 1 {
      return Err(AppError::Validation("Quantity must be at least 1".to_string()));
    }
    Ok(StageControl::Continue)
  });

  // Early availability check for a clean error before any write. The store
  // re-checks under the row lock, so this is not the authoritative gate.
  flow.on_stage("admit_item", |ctx: Ctx<AddToCartCtx>| async move {
    let (state, item_id) = {
      let guard = ctx.read();
      (guard.state.clone(), guard.item_id)
    };
    let item = state
      .store
      .item(item_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;
    if !item.is_orderable() {
      return Err(AppError::Unavailable(format!("{} is not available for ordering", item.name)));
    }
    Ok(StageControl::Continue)
  });

  flow.on_stage("reserve_row", |ctx: Ctx<AddToCartCtx>| async move {
    let (state, user_id, item_id, quantity, note) = {
      let guard = ctx.read();
      (
        guard.state.clone(),
        guard.user_id,
        guard.item_id,
        guard.quantity,
        guard.note.clone(),
      )
    };
    let row = state.store.add_cart_item(user_id, item_id, quantity, note).await?;
    tracing::info!(user_id = %user_id, item_id = %item_id, quantity = row.quantity, "cart row reserved");
    ctx.write().row = Some(row);
    Ok(StageControl::Continue)
  });

  flow
}
