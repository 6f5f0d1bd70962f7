use actix_web::{web, HttpResponse};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::list_catalog", skip(app_state))]
pub async fn list_catalog_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let items = app_state.store.list_items().await?;
  Ok(HttpResponse::Ok().json(items))
}

#[instrument(name = "handler::get_catalog_item", skip(app_state, path), fields(item_id = %path))]
pub async fn get_catalog_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let id = path.into_inner();
  let item = app_state
    .store
    .item(id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Item {} not found", id)))?;
  Ok(HttpResponse::Ok().json(item))
}
