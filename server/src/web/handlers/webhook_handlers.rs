use actix_web::{web, HttpRequest, HttpResponse};
use nyama_flow::{Ctx, FlowOutcome};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::flows::contexts::WebhookCtx;
use crate::payments::PaymentMethod;
use crate::state::AppState;

#[instrument(
  name = "handler::payment_webhook",
  skip(app_state, req, provider_tag, body),
  fields(provider = %provider_tag, payload_bytes = body.len())
)]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  provider_tag: web::Path<String>,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let tag = provider_tag.into_inner();
  let method = PaymentMethod::from_tag(&tag)
    .ok_or_else(|| AppError::NotFound(format!("Unknown payment provider '{}'", tag)))?;

  let signature = req
    .headers()
    .get("X-Signature")
    .and_then(|h| h.to_str().ok())
    .map(String::from);

  let ctx = Ctx::new(WebhookCtx {
    state: app_state.get_ref().clone(),
    method,
    raw: body.to_vec(),
    signature,
    notice: None,
    write: None,
  });

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let guard = ctx.read();
      let write = guard
        .write
        .as_ref()
        .ok_or_else(|| AppError::Internal("Webhook flow completed without a reconciliation result".to_string()))?;
      let message = if write.changed() {
        "Payment status updated"
      } else {
        "Payment status already reconciled"
      };
      info!(reference = %write.booking().reference, changed = write.changed(), "webhook processed");
      Ok(HttpResponse::Ok().json(json!({ "success": true, "message": message })))
    }
    // Providers retry on non-2xx; a halted flow still acknowledges.
    FlowOutcome::Halted => Ok(HttpResponse::Ok().json(json!({ "success": false, "message": "Webhook acknowledged" }))),
  }
}
