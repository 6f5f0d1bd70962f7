use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of the booking itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
  PendingPayment,
  Confirmed,
  Cancelled,
}

/// Lifecycle of the payment attached to a booking. `Refunded` is never set by
/// reconciliation; it exists as a persisted value written by back-office
/// tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
  Refunded,
}

/// Append-only record of one reconciliation input (webhook, status poll or
/// manual override). Entries are deduplicated on (transaction_id, digest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
  pub at: DateTime<Utc>,
  /// Where the input came from: a provider tag, "status-poll" or
  /// "manual-override".
  pub source: String,
  pub provider_status: String,
  pub transaction_id: Option<String>,
  /// Lowercase hex SHA-256 of the raw payload bytes.
  pub payload_digest: String,
  pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
  pub id: Uuid,
  pub user_id: Uuid,
  /// Human-readable correlation key, e.g. `BK-9F3A2C`. Providers echo it
  /// back in webhooks.
  pub reference: String,
  pub status: BookingStatus,
  pub payment_status: PaymentStatus,
  /// Provider-side transaction identifier, once known.
  pub payment_reference: Option<String>,
  pub amount_cents: i64,
  pub currency: String,
  pub audit: Vec<AuditEntry>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Booking {
  /// Opens a booking in the initial state, awaiting payment.
  pub fn new_pending(user_id: Uuid, amount_cents: i64, currency: &str) -> Self {
    let now = Utc::now();
    Booking {
      id: Uuid::new_v4(),
      user_id,
      reference: new_reference(),
      status: BookingStatus::PendingPayment,
      payment_status: PaymentStatus::Pending,
      payment_reference: None,
      amount_cents,
      currency: currency.to_string(),
      audit: Vec::new(),
      created_at: now,
      updated_at: now,
    }
  }
}

fn new_reference() -> String {
  let raw = Uuid::new_v4().simple().to_string();
  format!("BK-{}", &raw[..10].to_uppercase())
}
