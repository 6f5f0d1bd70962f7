use actix_web::{HttpResponse, ResponseError};
use nyama_flow::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Item Unavailable: {0}")]
  Unavailable(String),

  #[error("Cannot add {requested} more items. Only {remaining} more available")]
  InsufficientStock { requested: i32, remaining: i32 },

  #[error("Payment Provider Unreachable: {0}")]
  Upstream(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Flow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    if err.is::<sqlx::Error>() {
      if let Ok(db_err) = err.downcast::<sqlx::Error>() {
        return AppError::Sqlx(db_err);
      }
      return AppError::Internal("database error lost during downcast".to_string());
    }
    AppError::Internal(err.to_string())
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Unavailable(m) => HttpResponse::Conflict().json(json!({"error": m})),
      AppError::InsufficientStock { remaining, .. } => HttpResponse::Conflict().json(json!({
        "error": self.to_string(),
        "remaining": remaining,
      })),
      AppError::Upstream(m) => {
        HttpResponse::BadGateway().json(json!({"error": "Payment provider unreachable", "detail": m}))
      }
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Flow { source } => {
        tracing::error!(flow_error_source = ?source, "workflow error details");
        HttpResponse::InternalServerError()
          .json(json!({"error": "Workflow processing error", "detail": source.to_string()}))
      }
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
