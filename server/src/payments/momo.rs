//! MTN Mobile Money collections client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::Booking;
use crate::payments::{PaymentMethod, PaymentNotice, PaymentProvider, ProviderReport};

pub struct MomoProvider {
  http: reqwest::Client,
  base_url: String,
  api_key: Option<String>,
  webhook_secret: Option<String>,
}

impl MomoProvider {
  pub fn new(http: reqwest::Client, base_url: String, api_key: Option<String>, webhook_secret: Option<String>) -> Self {
    Self {
      http,
      base_url,
      api_key,
      webhook_secret,
    }
  }

  fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.api_key {
      Some(key) => req.bearer_auth(key),
      None => req,
    }
  }
}

/// `requesttopay` status lookup response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MomoStatusResponse {
  status: String,
  financial_transaction_id: Option<String>,
}

/// Webhook body MTN posts to our callback. `external_id` echoes the booking
/// reference we sent on collection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MomoWebhook {
  external_id: Option<String>,
  status: Option<String>,
  financial_transaction_id: Option<String>,
}

#[async_trait]
impl PaymentProvider for MomoProvider {
  fn method(&self) -> PaymentMethod {
    PaymentMethod::MtnMomo
  }

  fn webhook_secret(&self) -> Option<&str> {
    self.webhook_secret.as_deref()
  }

  #[tracing::instrument(skip(self, booking, payer_msisdn), fields(reference = %booking.reference))]
  async fn request_collection(&self, booking: &Booking, payer_msisdn: &str) -> Result<ProviderReport> {
    // MTN keys the collection on a caller-chosen reference id; that id is
    // also how the payment is looked up later.
    let reference_id = Uuid::new_v4().to_string();
    let url = format!("{}/collection/v1_0/requesttopay", self.base_url);
    let body = json!({
      "amount": format!("{}.{:02}", booking.amount_cents / 100, booking.amount_cents % 100),
      "currency": booking.currency,
      "externalId": booking.reference,
      "payer": { "partyIdType": "MSISDN", "partyId": payer_msisdn },
      "payerMessage": format!("Payment for booking {}", booking.reference),
      "payeeNote": booking.reference,
    });

    let response = self
      .authorize(self.http.post(&url))
      .header("X-Reference-Id", &reference_id)
      .json(&body)
      .send()
      .await
      .map_err(upstream)?;

    if !response.status().is_success() {
      return Err(AppError::Upstream(format!(
        "MTN MoMo rejected collection request: HTTP {}",
        response.status()
      )));
    }

    // requesttopay is accepted asynchronously; the payment starts pending.
    Ok(ProviderReport {
      provider_status: "PENDING".to_string(),
      transaction_id: Some(reference_id),
    })
  }

  #[tracing::instrument(skip(self))]
  async fn lookup_status(&self, reference: &str, transaction_id: Option<&str>) -> Result<ProviderReport> {
    let key = transaction_id.unwrap_or(reference);
    let url = format!("{}/collection/v1_0/requesttopay/{}", self.base_url, key);

    let response = self.authorize(self.http.get(&url)).send().await.map_err(upstream)?;
    if !response.status().is_success() {
      return Err(AppError::Upstream(format!(
        "MTN MoMo status lookup failed: HTTP {}",
        response.status()
      )));
    }

    let status: MomoStatusResponse = response
      .json()
      .await
      .map_err(|e| AppError::Upstream(format!("MTN MoMo returned an unparseable status body: {}", e)))?;

    Ok(ProviderReport {
      provider_status: status.status,
      transaction_id: status.financial_transaction_id.or_else(|| transaction_id.map(String::from)),
    })
  }

  fn parse_webhook(&self, payload: &[u8]) -> Result<PaymentNotice> {
    let raw: serde_json::Value = serde_json::from_slice(payload)
      .map_err(|e| AppError::Validation(format!("Malformed MTN MoMo webhook body: {}", e)))?;
    let webhook: MomoWebhook = serde_json::from_value(raw.clone())
      .map_err(|e| AppError::Validation(format!("Malformed MTN MoMo webhook body: {}", e)))?;

    let reference = webhook
      .external_id
      .filter(|r| !r.is_empty())
      .ok_or_else(|| AppError::Validation("MTN MoMo webhook is missing externalId".to_string()))?;

    Ok(PaymentNotice {
      reference,
      provider_status: webhook.status.unwrap_or_default(),
      transaction_id: webhook.financial_transaction_id,
      raw,
    })
  }
}

fn upstream(err: reqwest::Error) -> AppError {
  if err.is_timeout() {
    AppError::Upstream("MTN MoMo request timed out".to_string())
  } else {
    AppError::Upstream(format!("MTN MoMo request failed: {}", err))
  }
}
