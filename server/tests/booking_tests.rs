mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use uuid::Uuid;

use nyama_server::models::{BookingStatus, PaymentStatus};

use common::{seed_booking, stubbed_state, test_state, StubProvider};

macro_rules! app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state.clone()))
        .configure(nyama_server::web::routes::configure_app_routes),
    )
    .await
  };
}

#[actix_web::test]
async fn status_without_a_method_returns_the_stored_state() {
  let state = test_state();
  let user = Uuid::new_v4();
  seed_booking(state.store.as_ref(), "BK-100", user, 357_750).await;
  let app = app!(state);

  let req = test::TestRequest::get()
    .uri("/api/v1/bookings/BK-100/status")
    .insert_header(("X-User-ID", user.to_string()))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let json: serde_json::Value = test::read_body_json(resp).await;
  assert_eq!(json["reference"], "BK-100");
  assert_eq!(json["status"], "PENDING_PAYMENT");
  assert_eq!(json["paymentStatus"], "PENDING");
  assert_eq!(json["amount"], 3577.5);
}

#[actix_web::test]
async fn status_is_denied_to_non_owners_and_unknown_references() {
  let state = test_state();
  let owner = Uuid::new_v4();
  seed_booking(state.store.as_ref(), "BK-100", owner, 100_000).await;
  let app = app!(state);

  let req = test::TestRequest::get()
    .uri("/api/v1/bookings/BK-100/status")
    .insert_header(("X-User-ID", Uuid::new_v4().to_string()))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::get()
    .uri("/api/v1/bookings/BK-404/status")
    .insert_header(("X-User-ID", owner.to_string()))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn polling_reconciles_the_provider_answer_once() {
  let stub = StubProvider::new();
  stub.set_lookup("SUCCESSFUL", Some("TX-9"));
  let state = stubbed_state(stub);
  let user = Uuid::new_v4();
  seed_booking(state.store.as_ref(), "BK-100", user, 357_750).await;
  let app = app!(state);

  for _ in 0..2 {
    let req = test::TestRequest::get()
      .uri("/api/v1/bookings/BK-100/status?method=mtn-momo")
      .insert_header(("X-User-ID", user.to_string()))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["status"], "CONFIRMED");
    assert_eq!(json["paymentStatus"], "COMPLETED");
  }

  // First poll wrote the transition; the second found nothing to change.
  let booking = state.store.booking_by_reference("BK-100").await.unwrap().unwrap();
  assert_eq!(booking.status, BookingStatus::Confirmed);
  assert_eq!(booking.payment_reference.as_deref(), Some("TX-9"));
  assert_eq!(booking.audit.len(), 1);
}

#[actix_web::test]
async fn polling_an_unregistered_provider_is_an_error() {
  // The stub registry only answers for mtn-momo; naming orange-money must
  // surface a configuration error, not silently return the stored state.
  let state = stubbed_state(StubProvider::new());
  let user = Uuid::new_v4();
  seed_booking(state.store.as_ref(), "BK-100", user, 100_000).await;
  let app = app!(state);

  let req = test::TestRequest::get()
    .uri("/api/v1/bookings/BK-100/status?method=orange-money")
    .insert_header(("X-User-ID", user.to_string()))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  let json: serde_json::Value = test::read_body_json(resp).await;
  assert_eq!(json["error"], "Configuration issue");
}

#[actix_web::test]
async fn manual_override_requires_the_admin_key() {
  let state = test_state();
  seed_booking(state.store.as_ref(), "BK-100", Uuid::new_v4(), 100_000).await;
  let app = app!(state);

  let body = serde_json::json!({ "status": "FAILED", "transactionId": "MANUAL-1" });

  let req = test::TestRequest::post()
    .uri("/api/v1/admin/bookings/BK-100/status")
    .set_json(&body)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::post()
    .uri("/api/v1/admin/bookings/BK-100/status")
    .insert_header(("X-Admin-Key", "wrong"))
    .set_json(&body)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::post()
    .uri("/api/v1/admin/bookings/BK-100/status")
    .insert_header(("X-Admin-Key", "test-admin-key"))
    .set_json(&body)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let booking = state.store.booking_by_reference("BK-100").await.unwrap().unwrap();
  assert_eq!(booking.status, BookingStatus::Cancelled);
  assert_eq!(booking.payment_status, PaymentStatus::Failed);
  assert_eq!(booking.payment_reference.as_deref(), Some("MANUAL-1"));
  assert_eq!(booking.audit.len(), 1);
  assert_eq!(booking.audit[0].source, "manual-override");
}
