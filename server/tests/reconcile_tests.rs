mod common;

use uuid::Uuid;

use nyama_server::errors::AppError;
use nyama_server::models::{BookingStatus, PaymentStatus};
use nyama_server::payments::{PaymentNotice, ProviderReport};
use nyama_server::reconcile;

use common::{seed_booking, test_state};

fn notice(reference: &str, status: &str, transaction_id: Option<&str>) -> PaymentNotice {
  PaymentNotice {
    reference: reference.to_string(),
    provider_status: status.to_string(),
    transaction_id: transaction_id.map(String::from),
    raw: serde_json::json!({
      "externalId": reference,
      "status": status,
      "financialTransactionId": transaction_id,
    }),
  }
}

#[tokio::test]
async fn a_successful_notice_confirms_the_booking() {
  let state = test_state();
  seed_booking(state.store.as_ref(), "BK-100", Uuid::new_v4(), 357_750).await;

  let write = reconcile::apply_notice(state.store.as_ref(), "mtn-momo", &notice("BK-100", "SUCCESSFUL", Some("TX-1")))
    .await
    .unwrap();

  assert!(write.changed());
  let booking = write.booking();
  assert_eq!(booking.status, BookingStatus::Confirmed);
  assert_eq!(booking.payment_status, PaymentStatus::Completed);
  assert_eq!(booking.payment_reference.as_deref(), Some("TX-1"));
  assert_eq!(booking.audit.len(), 1);
  assert_eq!(booking.audit[0].source, "mtn-momo");
  assert_eq!(booking.audit[0].provider_status, "SUCCESSFUL");
}

#[tokio::test]
async fn a_failed_notice_cancels_the_booking() {
  let state = test_state();
  seed_booking(state.store.as_ref(), "BK-100", Uuid::new_v4(), 357_750).await;

  let write = reconcile::apply_notice(state.store.as_ref(), "mtn-momo", &notice("BK-100", "FAILED", Some("TX-1")))
    .await
    .unwrap();

  let booking = write.booking();
  assert_eq!(booking.status, BookingStatus::Cancelled);
  assert_eq!(booking.payment_status, PaymentStatus::Failed);
}

#[tokio::test]
async fn an_unrecognized_status_keeps_the_booking_waiting() {
  let state = test_state();
  seed_booking(state.store.as_ref(), "BK-100", Uuid::new_v4(), 357_750).await;

  let write = reconcile::apply_notice(state.store.as_ref(), "mtn-momo", &notice("BK-100", "PROCESSING", None))
    .await
    .unwrap();

  let booking = write.booking();
  assert_eq!(booking.status, BookingStatus::PendingPayment);
  assert_eq!(booking.payment_status, PaymentStatus::Pending);
  // The audit trail still records the input.
  assert_eq!(booking.audit.len(), 1);
}

#[tokio::test]
async fn an_unknown_reference_is_not_found() {
  let state = test_state();
  let err = reconcile::apply_notice(state.store.as_ref(), "mtn-momo", &notice("BK-404", "SUCCESSFUL", None))
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn a_replayed_notice_changes_nothing() {
  let state = test_state();
  seed_booking(state.store.as_ref(), "BK-100", Uuid::new_v4(), 357_750).await;
  let n = notice("BK-100", "SUCCESSFUL", Some("TX-1"));

  let first = reconcile::apply_notice(state.store.as_ref(), "mtn-momo", &n).await.unwrap();
  assert!(first.changed());

  let second = reconcile::apply_notice(state.store.as_ref(), "mtn-momo", &n).await.unwrap();
  assert!(!second.changed());
  assert_eq!(second.booking().audit.len(), 1);
  assert_eq!(second.booking().status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn a_different_payload_for_the_same_transaction_is_still_audited() {
  let state = test_state();
  seed_booking(state.store.as_ref(), "BK-100", Uuid::new_v4(), 357_750).await;

  reconcile::apply_notice(state.store.as_ref(), "mtn-momo", &notice("BK-100", "PENDING", Some("TX-1")))
    .await
    .unwrap();
  let write = reconcile::apply_notice(state.store.as_ref(), "mtn-momo", &notice("BK-100", "SUCCESSFUL", Some("TX-1")))
    .await
    .unwrap();

  assert!(write.changed());
  assert_eq!(write.booking().audit.len(), 2);
}

#[tokio::test]
async fn polling_skips_the_write_when_nothing_would_change() {
  let state = test_state();
  seed_booking(state.store.as_ref(), "BK-100", Uuid::new_v4(), 357_750).await;

  let report = ProviderReport {
    provider_status: "SUCCESSFUL".to_string(),
    transaction_id: Some("TX-9".to_string()),
  };
  let booking = state.store.booking_by_reference("BK-100").await.unwrap().unwrap();
  let first = reconcile::apply_report(state.store.as_ref(), "status-poll", &booking, &report).await.unwrap();
  assert!(first.changed());
  assert_eq!(first.booking().audit.len(), 1);

  // Same report against the now-confirmed booking: guard short-circuits,
  // no audit churn.
  let confirmed = state.store.booking_by_reference("BK-100").await.unwrap().unwrap();
  let second = reconcile::apply_report(state.store.as_ref(), "status-poll", &confirmed, &report).await.unwrap();
  assert!(!second.changed());
  let final_booking = state.store.booking_by_reference("BK-100").await.unwrap().unwrap();
  assert_eq!(final_booking.audit.len(), 1);
}
