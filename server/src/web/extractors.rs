//! Request extractors: caller identity and the admin override guard.

use actix_web::{web, FromRequest, HttpRequest};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// Caller identity, taken from the `X-User-ID` header. Stands in for real
/// session auth; everything downstream only sees the user id.
#[derive(Debug)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    if let Some(header) = req.headers().get("X-User-ID") {
      if let Ok(raw) = header.to_str() {
        if let Ok(user_id) = Uuid::parse_str(raw) {
          return futures_util::future::ready(Ok(AuthenticatedUser { user_id }));
        }
      }
    }
    warn!("AuthenticatedUser extractor: missing or invalid X-User-ID header");
    futures_util::future::ready(Err(AppError::Auth(
      "User authentication required. Missing or invalid X-User-ID header.".to_string(),
    )))
  }
}

/// Admin guard for the manual override endpoint. Requires `X-Admin-Key` to
/// match the configured key; an unset key disables the endpoint.
#[derive(Debug)]
pub struct AdminKey;

impl FromRequest for AdminKey {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let result = match req.app_data::<web::Data<AppState>>() {
      None => Err(AppError::Internal("application state missing from request".to_string())),
      Some(state) => match &state.config.admin_key {
        None => Err(AppError::Auth("Manual override is disabled".to_string())),
        Some(expected) => {
          let presented = req.headers().get("X-Admin-Key").and_then(|h| h.to_str().ok());
          if presented == Some(expected.as_str()) {
            Ok(AdminKey)
          } else {
            warn!("AdminKey extractor: missing or incorrect X-Admin-Key header");
            Err(AppError::Auth("Invalid admin key".to_string()))
          }
        }
      },
    };
    futures_util::future::ready(result)
  }
}
