//! Mobile-money provider integrations.
//!
//! Each provider implements [`PaymentProvider`]; the registry hands out the
//! right implementation for a payment method tag. Provider payloads differ in
//! shape, so every implementation normalizes its webhook body into a
//! [`PaymentNotice`] before reconciliation sees it.

pub mod momo;
pub mod orange;
pub mod signature;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::Result;
use crate::models::Booking;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
  MtnMomo,
  OrangeMoney,
}

impl PaymentMethod {
  /// URL/tag form used on webhook routes and checkout requests.
  pub fn tag(&self) -> &'static str {
    match self {
      PaymentMethod::MtnMomo => "mtn-momo",
      PaymentMethod::OrangeMoney => "orange-money",
    }
  }

  pub fn from_tag(tag: &str) -> Option<Self> {
    match tag {
      "mtn-momo" => Some(PaymentMethod::MtnMomo),
      "orange-money" => Some(PaymentMethod::OrangeMoney),
      _ => None,
    }
  }
}

/// What a provider reported about a payment, either from a collection
/// request or a status lookup.
#[derive(Debug, Clone)]
pub struct ProviderReport {
  pub provider_status: String,
  pub transaction_id: Option<String>,
}

/// Provider-agnostic view of a webhook payload. `reference` is the booking
/// reference the provider echoes back; `raw` keeps the original body for the
/// audit trail.
#[derive(Debug, Clone)]
pub struct PaymentNotice {
  pub reference: String,
  pub provider_status: String,
  pub transaction_id: Option<String>,
  pub raw: serde_json::Value,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
  fn method(&self) -> PaymentMethod;

  /// HMAC secret for webhook signatures. `None` disables verification
  /// (sandbox mode).
  fn webhook_secret(&self) -> Option<&str>;

  /// Asks the provider to collect the booking total from the payer's
  /// mobile-money wallet.
  async fn request_collection(&self, booking: &Booking, payer_msisdn: &str) -> Result<ProviderReport>;

  /// Polls the provider for the current state of a payment.
  async fn lookup_status(&self, reference: &str, transaction_id: Option<&str>) -> Result<ProviderReport>;

  /// Decodes a webhook body into the provider-agnostic notice.
  fn parse_webhook(&self, payload: &[u8]) -> Result<PaymentNotice>;
}

#[derive(Default)]
pub struct ProviderRegistry {
  providers: HashMap<PaymentMethod, Arc<dyn PaymentProvider>>,
}

impl ProviderRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, provider: Arc<dyn PaymentProvider>) {
    self.providers.insert(provider.method(), provider);
  }

  pub fn get(&self, method: PaymentMethod) -> Option<Arc<dyn PaymentProvider>> {
    self.providers.get(&method).cloned()
  }
}
