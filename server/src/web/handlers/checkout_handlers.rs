use actix_web::{web, HttpResponse};
use nyama_flow::{Ctx, FlowOutcome};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::flows::contexts::{ActiveCollection, CheckoutCtx};
use crate::payments::PaymentMethod;
use crate::pricing::to_decimal;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
  /// Payment method tag: `mtn-momo` or `orange-money`.
  pub method: String,
  /// Wallet number the provider should bill.
  pub payer_msisdn: String,
}

#[instrument(
  name = "handler::start_checkout",
  skip(app_state, payload, auth_user),
  fields(user_id = %auth_user.user_id, method = %payload.method)
)]
pub async fn start_checkout_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let method = PaymentMethod::from_tag(&payload.method)
    .ok_or_else(|| AppError::Validation(format!("Unknown payment method '{}'", payload.method)))?;
  if payload.payer_msisdn.trim().is_empty() {
    return Err(AppError::Validation("payerMsisdn is required".to_string()));
  }

  let ctx = Ctx::new(CheckoutCtx {
    state: app_state.get_ref().clone(),
    user_id: auth_user.user_id,
    method,
    payer_msisdn: payload.payer_msisdn.trim().to_string(),
    summary: None,
    booking: None,
    collection: ActiveCollection::None,
  });

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let guard = ctx.read();
      let booking = guard
        .booking
        .as_ref()
        .ok_or_else(|| AppError::Internal("Checkout completed without a booking".to_string()))?;
      let transaction_id = guard.collection.report().and_then(|r| r.transaction_id);
      info!(reference = %booking.reference, "checkout initiated");
      Ok(HttpResponse::Created().json(json!({
        "reference": booking.reference,
        "status": booking.status,
        "paymentStatus": booking.payment_status,
        "amount": to_decimal(booking.amount_cents),
        "currency": booking.currency,
        "provider": method.tag(),
        "transactionId": transaction_id,
      })))
    }
    FlowOutcome::Halted => Err(AppError::Internal("Checkout halted unexpectedly".to_string())),
  }
}
