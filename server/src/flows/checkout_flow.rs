//! Checkout flow: price the cart, open a pending booking, route the
//! collection request to the chosen provider, then record the initiation.

use std::sync::Arc;

use nyama_flow::{Ctx, Flow, FlowError, StageControl};

use crate::errors::AppError;
use crate::flows::contexts::{ActiveCollection, CheckoutCtx, MomoCollectionCtx, OrangeCollectionCtx};
use crate::models::Booking;
use crate::payments::PaymentMethod;
use crate::pricing;

fn momo_collection_flow() -> Flow<MomoCollectionCtx, AppError> {
  let mut flow = Flow::new(&[("request_momo_collection", false, None)]);
  flow.on_stage("request_momo_collection", |ctx: Ctx<MomoCollectionCtx>| async move {
    let (state, booking, msisdn) = {
      let guard = ctx.read();
      (guard.state.clone(), guard.booking.clone(), guard.payer_msisdn.clone())
    };
    let provider = state
      .providers
      .get(PaymentMethod::MtnMomo)
      .ok_or_else(|| AppError::Config("MTN MoMo provider is not configured".to_string()))?;
    let report = provider.request_collection(&booking, &msisdn).await?;
    ctx.write().report = Some(report);
    Ok(StageControl::Continue)
  });
  flow
}

fn orange_collection_flow() -> Flow<OrangeCollectionCtx, AppError> {
  let mut flow = Flow::new(&[("request_orange_collection", false, None)]);
  flow.on_stage("request_orange_collection", |ctx: Ctx<OrangeCollectionCtx>| async move {
    let (state, booking, msisdn) = {
      let guard = ctx.read();
      (guard.state.clone(), guard.booking.clone(), guard.payer_msisdn.clone())
    };
    let provider = state
      .providers
      .get(PaymentMethod::OrangeMoney)
      .ok_or_else(|| AppError::Config("Orange Money provider is not configured".to_string()))?;
    let report = provider.request_collection(&booking, &msisdn).await?;
    ctx.write().report = Some(report);
    Ok(StageControl::Continue)
  });
  flow
}

fn extract_momo(ctx: Ctx<CheckoutCtx>) -> Result<Ctx<MomoCollectionCtx>, FlowError> {
  let mut guard = ctx.write();
  let booking = guard
    .booking
    .clone()
    .ok_or_else(|| FlowError::Internal("collection routed before a booking was opened".to_string()))?;
  let sub = Ctx::new(MomoCollectionCtx {
    state: guard.state.clone(),
    booking,
    payer_msisdn: guard.payer_msisdn.clone(),
    report: None,
  });
  guard.collection = ActiveCollection::Momo(sub.clone());
  Ok(sub)
}

fn extract_orange(ctx: Ctx<CheckoutCtx>) -> Result<Ctx<OrangeCollectionCtx>, FlowError> {
  let mut guard = ctx.write();
  let booking = guard
    .booking
    .clone()
    .ok_or_else(|| FlowError::Internal("collection routed before a booking was opened".to_string()))?;
  let sub = Ctx::new(OrangeCollectionCtx {
    state: guard.state.clone(),
    booking,
    payer_msisdn: guard.payer_msisdn.clone(),
    report: None,
  });
  guard.collection = ActiveCollection::Orange(sub.clone());
  Ok(sub)
}

pub fn checkout_flow() -> Flow<CheckoutCtx, AppError> {
  let mut flow = Flow::new(&[
    ("price_cart", false, None),
    ("open_booking", false, None),
    ("route_collection", false, None),
    ("record_initiation", false, None),
  ]);

  flow.on_stage("price_cart", |ctx: Ctx<CheckoutCtx>| async move {
    let (state, user_id) = {
      let guard = ctx.read();
      (guard.state.clone(), guard.user_id)
    };
    let lines = state.store.cart_with_items(user_id).await?;
    if lines.is_empty() {
      return Err(AppError::Validation("Cart is empty".to_string()));
    }
    let summary = pricing::summarize(&lines);
    tracing::info!(user_id = %user_id, total_cents = summary.total_cents, "cart priced for checkout");
    ctx.write().summary = Some(summary);
    Ok(StageControl::Continue)
  });

  flow.on_stage("open_booking", |ctx: Ctx<CheckoutCtx>| async move {
    let (state, user_id, summary) = {
      let guard = ctx.read();
      (guard.state.clone(), guard.user_id, guard.summary)
    };
    let summary = summary.ok_or_else(|| AppError::Internal("booking opened before the cart was priced".to_string()))?;
    let booking = Booking::new_pending(user_id, summary.total_cents, &state.config.currency);
    state.store.create_booking(&booking).await?;
    tracing::info!(reference = %booking.reference, amount_cents = booking.amount_cents, "booking opened");
    ctx.write().booking = Some(booking);
    Ok(StageControl::Continue)
  });

  flow
    .branches_for_stage("route_collection")
    .arm(Arc::new(momo_collection_flow()), extract_momo, |ctx: Ctx<CheckoutCtx>| {
      ctx.read().method == PaymentMethod::MtnMomo
    })
    .arm(Arc::new(orange_collection_flow()), extract_orange, |ctx: Ctx<CheckoutCtx>| {
      ctx.read().method == PaymentMethod::OrangeMoney
    })
    .require_match()
    .seal(false);

  flow.on_stage("record_initiation", |ctx: Ctx<CheckoutCtx>| async move {
    let (state, user_id, booking, report) = {
      let guard = ctx.read();
      (
        guard.state.clone(),
        guard.user_id,
        guard.booking.clone(),
        guard.collection.report(),
      )
    };
    let booking =
      booking.ok_or_else(|| AppError::Internal("initiation recorded before a booking was opened".to_string()))?;
    if let Some(txn) = report.and_then(|r| r.transaction_id) {
      state.store.set_payment_reference(&booking.reference, &txn).await?;
    }
    state.store.clear_cart(user_id).await?;
    Ok(StageControl::Continue)
  });

  flow
}
