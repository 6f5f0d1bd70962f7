use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::payments::{PaymentMethod, PaymentNotice};
use crate::pricing::to_decimal;
use crate::reconcile;
use crate::state::AppState;
use crate::web::extractors::{AdminKey, AuthenticatedUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
  /// Payment method tag; when present the provider is polled before the
  /// status is returned.
  pub method: Option<String>,
  pub transaction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
  /// Provider-style status string, mapped through the same transition
  /// table as webhooks (`SUCCESSFUL`, `FAILED`, ...).
  pub status: String,
  pub transaction_id: Option<String>,
}

fn booking_status_view(booking: &crate::models::Booking) -> serde_json::Value {
  json!({
    "reference": booking.reference,
    "status": booking.status,
    "paymentStatus": booking.payment_status,
    "paymentReference": booking.payment_reference,
    "amount": to_decimal(booking.amount_cents),
    "currency": booking.currency,
    "updatedAt": booking.updated_at,
  })
}

#[instrument(
  name = "handler::booking_status",
  skip(app_state, path, query, auth_user),
  fields(reference = %path, user_id = %auth_user.user_id)
)]
pub async fn booking_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  query: web::Query<StatusQuery>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let reference = path.into_inner();
  let booking = app_state
    .store
    .booking_by_reference(&reference)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", reference)))?;
  if booking.user_id != auth_user.user_id {
    warn!("booking status requested by a non-owner");
    return Err(AppError::Auth("Booking does not belong to the authenticated user".to_string()));
  }

  let method = match &query.method {
    Some(tag) => Some(
      PaymentMethod::from_tag(tag).ok_or_else(|| AppError::Validation(format!("Unknown payment method '{}'", tag)))?,
    ),
    None => None,
  };

  // Poll the provider when a method was named; the write is skipped when
  // the report maps to the state the booking already holds.
  let booking = match method {
    Some(method) => {
      let provider = app_state
        .providers
        .get(method)
        .ok_or_else(|| AppError::Config(format!("{} provider is not configured", method.tag())))?;
      let transaction_id = query
        .transaction_id
        .as_deref()
        .or(booking.payment_reference.as_deref());
      let report = provider.lookup_status(&booking.reference, transaction_id).await?;
      info!(provider_status = %report.provider_status, source = method.tag(), "provider polled");
      let write = reconcile::apply_report(app_state.store.as_ref(), "status-poll", &booking, &report).await?;
      write.booking().clone()
    }
    None => booking,
  };

  Ok(HttpResponse::Ok().json(booking_status_view(&booking)))
}

#[instrument(name = "handler::override_status", skip(app_state, path, payload, _admin), fields(reference = %path))]
pub async fn override_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  payload: web::Json<OverrideRequest>,
  _admin: AdminKey,
) -> Result<HttpResponse, AppError> {
  let reference = path.into_inner();
  let notice = PaymentNotice {
    reference: reference.clone(),
    provider_status: payload.status.clone(),
    transaction_id: payload.transaction_id.clone(),
    raw: json!({
      "status": payload.status,
      "transactionId": payload.transaction_id,
    }),
  };

  let write = reconcile::apply_notice(app_state.store.as_ref(), "manual-override", &notice).await?;
  info!(changed = write.changed(), "manual status override applied");
  Ok(HttpResponse::Ok().json(booking_status_view(write.booking())))
}
