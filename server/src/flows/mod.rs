//! Staged workflows behind the write-path endpoints. Handlers build a
//! context, hand it to the [`FlowSet`], and read results back out of the
//! context afterwards.

pub mod cart_flow;
pub mod checkout_flow;
pub mod contexts;
pub mod webhook_flow;

use nyama_flow::FlowSet;

use crate::errors::AppError;

pub fn register_all_flows(flows: &FlowSet<AppError>) {
  flows.insert(cart_flow::add_to_cart_flow());
  flows.insert(checkout_flow::checkout_flow());
  flows.insert(webhook_flow::webhook_flow());
  tracing::info!("All application flows registered.");
}
