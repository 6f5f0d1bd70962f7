//! Payment reconciliation: maps provider status strings onto the booking
//! state machine and feeds the audit trail. Every path into a booking's
//! payment state (webhook, status poll, manual override) goes through here.

use chrono::Utc;

use crate::errors::Result;
use crate::models::{AuditEntry, Booking, BookingStatus, PaymentStatus};
use crate::payments::{signature, PaymentNotice, ProviderReport};
use crate::store::{ReconcileWrite, Store};

/// Maps a provider status string onto the (payment, booking) status pair.
/// Matching is case-insensitive; anything unrecognized keeps the booking
/// waiting rather than guessing.
pub fn transition(provider_status: &str) -> (PaymentStatus, BookingStatus) {
  let s = provider_status.trim();
  if s.eq_ignore_ascii_case("SUCCESSFUL") || s.eq_ignore_ascii_case("SUCCESS") {
    (PaymentStatus::Completed, BookingStatus::Confirmed)
  } else if s.eq_ignore_ascii_case("FAILED") || s.eq_ignore_ascii_case("FAILURE") {
    (PaymentStatus::Failed, BookingStatus::Cancelled)
  } else {
    (PaymentStatus::Pending, BookingStatus::PendingPayment)
  }
}

/// Builds the audit entry for a notice. The digest covers the raw payload so
/// byte-identical replays dedupe even when the provider omits a transaction
/// id.
pub fn audit_entry(source: &str, notice: &PaymentNotice) -> AuditEntry {
  let raw_bytes = notice.raw.to_string().into_bytes();
  AuditEntry {
    at: Utc::now(),
    source: source.to_string(),
    provider_status: notice.provider_status.clone(),
    transaction_id: notice.transaction_id.clone(),
    payload_digest: signature::sha256_hex(&raw_bytes),
    payload: notice.raw.clone(),
  }
}

/// Applies a normalized notice to the booking it references.
pub async fn apply_notice(store: &dyn Store, source: &str, notice: &PaymentNotice) -> Result<ReconcileWrite> {
  let (payment_status, booking_status) = transition(&notice.provider_status);
  let entry = audit_entry(source, notice);
  let write = store
    .record_payment_outcome(
      &notice.reference,
      payment_status,
      booking_status,
      notice.transaction_id.clone(),
      entry,
    )
    .await?;

  tracing::info!(
    reference = %notice.reference,
    provider_status = %notice.provider_status,
    changed = write.changed(),
    "reconciled payment notice"
  );
  Ok(write)
}

/// Applies a polled provider report to an already-loaded booking. When the
/// report maps to the state the booking already holds, the write (and the
/// audit append) is skipped entirely.
pub async fn apply_report(
  store: &dyn Store,
  source: &str,
  booking: &Booking,
  report: &ProviderReport,
) -> Result<ReconcileWrite> {
  let (payment_status, booking_status) = transition(&report.provider_status);
  if booking.payment_status == payment_status && booking.status == booking_status {
    return Ok(ReconcileWrite::Unchanged(booking.clone()));
  }

  let notice = PaymentNotice {
    reference: booking.reference.clone(),
    provider_status: report.provider_status.clone(),
    transaction_id: report.transaction_id.clone(),
    raw: serde_json::json!({
      "status": report.provider_status,
      "transactionId": report.transaction_id,
    }),
  };
  apply_notice(store, source, &notice).await
}
