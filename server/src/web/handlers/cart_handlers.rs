use actix_web::{web, HttpResponse};
use nyama_flow::{Ctx, FlowOutcome};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::flows::contexts::AddToCartCtx;
use crate::models::{CartItem, CatalogItem};
use crate::pricing::{self, to_decimal, CartSummaryView};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
  pub item_id: Uuid,
  pub quantity: i32,
  pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
  pub quantity: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartLineView {
  id: Uuid,
  item_id: Uuid,
  name: String,
  quantity: i32,
  unit_price: f64,
  line_total: f64,
  note: Option<String>,
}

impl CartLineView {
  fn from_line(row: &CartItem, item: &CatalogItem) -> Self {
    CartLineView {
      id: row.id,
      item_id: item.id,
      name: item.name.clone(),
      quantity: row.quantity,
      unit_price: to_decimal(item.price_cents),
      line_total: to_decimal(item.price_cents * i64::from(row.quantity)),
      note: row.note.clone(),
    }
  }
}

fn cart_view(lines: &[(CartItem, CatalogItem)]) -> serde_json::Value {
  let items: Vec<CartLineView> = lines.iter().map(|(r, i)| CartLineView::from_line(r, i)).collect();
  let summary = CartSummaryView::from(pricing::summarize(lines));
  json!({ "items": items, "summary": summary })
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, payload, auth_user),
  fields(user_id = %auth_user.user_id, item_id = %payload.item_id, quantity = %payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<AddToCartRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let ctx = Ctx::new(AddToCartCtx {
    state: app_state.get_ref().clone(),
    user_id: auth_user.user_id,
    item_id: payload.item_id,
    quantity: payload.quantity,
    note: payload.note.clone(),
    row: None,
  });

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let row = ctx.read().row.clone().ok_or_else(|| {
        warn!("add-to-cart flow completed without a cart row");
        AppError::Internal("Cart update completed, but item details are unavailable.".to_string())
      })?;
      info!(row_id = %row.id, quantity = row.quantity, "item added to cart");
      Ok(HttpResponse::Ok().json(row))
    }
    FlowOutcome::Halted => Err(AppError::Internal("Cart update halted unexpectedly".to_string())),
  }
}

#[instrument(name = "handler::view_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn view_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let lines = app_state.store.cart_with_items(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(cart_view(&lines)))
}

#[instrument(
  name = "handler::update_cart_item",
  skip(app_state, path, payload, auth_user),
  fields(user_id = %auth_user.user_id, row_id = %path, quantity = %payload.quantity)
)]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<UpdateCartItemRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let row = app_state
    .store
    .set_cart_quantity(auth_user.user_id, path.into_inner(), payload.quantity)
    .await?;
  Ok(HttpResponse::Ok().json(row))
}

#[instrument(
  name = "handler::remove_cart_item",
  skip(app_state, path, auth_user),
  fields(user_id = %auth_user.user_id, row_id = %path)
)]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  app_state.store.remove_cart_item(auth_user.user_id, path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::clear_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn clear_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  app_state.store.clear_cart(auth_user.user_id).await?;
  Ok(HttpResponse::NoContent().finish())
}
