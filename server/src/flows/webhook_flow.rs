//! Webhook flow: authenticate the body, normalize it into a provider
//! agnostic notice, then apply the reconciliation transition.

use std::sync::Arc;

use nyama_flow::{Ctx, Flow, SkipWhen, StageControl};

use crate::errors::AppError;
use crate::flows::contexts::WebhookCtx;
use crate::payments::signature;
use crate::reconcile;

pub fn webhook_flow() -> Flow<WebhookCtx, AppError> {
  // Signature verification only runs when the provider carries a webhook
  // secret; sandbox deployments accept unsigned callbacks.
  let skip_unsigned: SkipWhen<WebhookCtx> = Arc::new(|ctx: Ctx<WebhookCtx>| {
    let guard = ctx.read();
    guard
      .state
      .providers
      .get(guard.method)
      .map_or(true, |p| p.webhook_secret().is_none())
  });

  let mut flow = Flow::new(&[
    ("verify_signature", false, Some(skip_unsigned)),
    ("parse_notice", false, None),
    ("apply_transition", false, None),
  ]);

  flow.on_stage("verify_signature", |ctx: Ctx<WebhookCtx>| async move {
    let (provider, raw, sig) = {
      let guard = ctx.read();
      (guard.state.providers.get(guard.method), guard.raw.clone(), guard.signature.clone())
    };
    let provider = provider.ok_or_else(|| AppError::Config("payment provider is not configured".to_string()))?;
    if let Some(secret) = provider.webhook_secret() {
      signature::verify_hmac_sha256(secret, &raw, sig.as_deref())?;
    }
    Ok(StageControl::Continue)
  });

  flow.on_stage("parse_notice", |ctx: Ctx<WebhookCtx>| async move {
    let (provider, raw) = {
      let guard = ctx.read();
      (guard.state.providers.get(guard.method), guard.raw.clone())
    };
    let provider = provider.ok_or_else(|| AppError::Config("payment provider is not configured".to_string()))?;
    let notice = provider.parse_webhook(&raw)?;
    tracing::info!(reference = %notice.reference, provider_status = %notice.provider_status, "webhook normalized");
    ctx.write().notice = Some(notice);
    Ok(StageControl::Continue)
  });

  flow.on_stage("apply_transition", |ctx: Ctx<WebhookCtx>| async move {
    let (state, method, notice) = {
      let guard = ctx.read();
      (guard.state.clone(), guard.method, guard.notice.clone())
    };
    let notice =
      notice.ok_or_else(|| AppError::Internal("transition applied before the webhook was parsed".to_string()))?;
    let write = reconcile::apply_notice(state.store.as_ref(), method.tag(), &notice).await?;
    ctx.write().write = Some(write);
    Ok(StageControl::Continue)
  });

  flow
}
