//! Orange Money web-payment client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::errors::{AppError, Result};
use crate::models::Booking;
use crate::payments::{PaymentMethod, PaymentNotice, PaymentProvider, ProviderReport};

pub struct OrangeProvider {
  http: reqwest::Client,
  base_url: String,
  api_token: Option<String>,
  webhook_secret: Option<String>,
}

impl OrangeProvider {
  pub fn new(
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    webhook_secret: Option<String>,
  ) -> Self {
    Self {
      http,
      base_url,
      api_token,
      webhook_secret,
    }
  }

  fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.api_token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }
}

#[derive(Debug, Deserialize)]
struct OrangePayResponse {
  pay_token: Option<String>,
  status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrangeStatusResponse {
  status: String,
  txnid: Option<String>,
}

/// Webhook body Orange posts to the notification URL. `order_id` echoes the
/// booking reference.
#[derive(Debug, Deserialize)]
struct OrangeWebhook {
  order_id: Option<String>,
  status: Option<String>,
  txnid: Option<String>,
}

#[async_trait]
impl PaymentProvider for OrangeProvider {
  fn method(&self) -> PaymentMethod {
    PaymentMethod::OrangeMoney
  }

  fn webhook_secret(&self) -> Option<&str> {
    self.webhook_secret.as_deref()
  }

  #[tracing::instrument(skip(self, booking, payer_msisdn), fields(reference = %booking.reference))]
  async fn request_collection(&self, booking: &Booking, payer_msisdn: &str) -> Result<ProviderReport> {
    let url = format!("{}/omcoreapis/1.0.2/mp/pay", self.base_url);
    let body = json!({
      "order_id": booking.reference,
      "amount": format!("{}.{:02}", booking.amount_cents / 100, booking.amount_cents % 100),
      "currency": booking.currency,
      "subscriber_msisdn": payer_msisdn,
      "description": format!("Payment for booking {}", booking.reference),
    });

    let response = self.authorize(self.http.post(&url)).json(&body).send().await.map_err(upstream)?;
    if !response.status().is_success() {
      return Err(AppError::Upstream(format!(
        "Orange Money rejected payment request: HTTP {}",
        response.status()
      )));
    }

    let pay: OrangePayResponse = response
      .json()
      .await
      .map_err(|e| AppError::Upstream(format!("Orange Money returned an unparseable body: {}", e)))?;

    Ok(ProviderReport {
      provider_status: pay.status.unwrap_or_else(|| "PENDING".to_string()),
      transaction_id: pay.pay_token,
    })
  }

  #[tracing::instrument(skip(self))]
  async fn lookup_status(&self, reference: &str, transaction_id: Option<&str>) -> Result<ProviderReport> {
    let url = format!("{}/omcoreapis/1.0.2/mp/paymentstatus/{}", self.base_url, reference);

    let response = self.authorize(self.http.get(&url)).send().await.map_err(upstream)?;
    if !response.status().is_success() {
      return Err(AppError::Upstream(format!(
        "Orange Money status lookup failed: HTTP {}",
        response.status()
      )));
    }

    let status: OrangeStatusResponse = response
      .json()
      .await
      .map_err(|e| AppError::Upstream(format!("Orange Money returned an unparseable status body: {}", e)))?;

    Ok(ProviderReport {
      provider_status: status.status,
      transaction_id: status.txnid.or_else(|| transaction_id.map(String::from)),
    })
  }

  fn parse_webhook(&self, payload: &[u8]) -> Result<PaymentNotice> {
    let raw: serde_json::Value = serde_json::from_slice(payload)
      .map_err(|e| AppError::Validation(format!("Malformed Orange Money webhook body: {}", e)))?;
    let webhook: OrangeWebhook = serde_json::from_value(raw.clone())
      .map_err(|e| AppError::Validation(format!("Malformed Orange Money webhook body: {}", e)))?;

    let reference = webhook
      .order_id
      .filter(|r| !r.is_empty())
      .ok_or_else(|| AppError::Validation("Orange Money webhook is missing order_id".to_string()))?;

    Ok(PaymentNotice {
      reference,
      provider_status: webhook.status.unwrap_or_default(),
      transaction_id: webhook.txnid,
      raw,
    })
  }
}

fn upstream(err: reqwest::Error) -> AppError {
  if err.is_timeout() {
    AppError::Upstream("Orange Money request timed out".to_string())
  } else {
    AppError::Upstream(format!("Orange Money request failed: {}", err))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn provider() -> OrangeProvider {
    OrangeProvider::new(reqwest::Client::new(), "http://localhost:0".to_string(), None, None)
  }

  #[test]
  fn webhook_parses_into_a_notice() {
    let body = br#"{"order_id":"BK-200","status":"SUCCESS","txnid":"OM-77"}"#;
    let notice = provider().parse_webhook(body).unwrap();
    assert_eq!(notice.reference, "BK-200");
    assert_eq!(notice.provider_status, "SUCCESS");
    assert_eq!(notice.transaction_id.as_deref(), Some("OM-77"));
  }

  #[test]
  fn webhook_without_order_id_is_rejected() {
    let err = provider().parse_webhook(br#"{"status":"SUCCESS"}"#).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
  }
}
