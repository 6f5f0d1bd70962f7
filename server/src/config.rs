use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  /// Shared secret for the manual status override endpoint. Unset disables
  /// the endpoint entirely.
  pub admin_key: Option<String>,

  /// ISO currency code carried on bookings.
  pub currency: String,

  /// Wall-clock ceiling for any single provider HTTP call.
  pub provider_timeout_ms: u64,

  // MTN Mobile Money
  pub momo_base_url: String,
  pub momo_api_key: Option<String>,
  pub momo_webhook_secret: Option<String>,

  // Orange Money
  pub orange_base_url: String,
  pub orange_api_token: Option<String>,
  pub orange_webhook_secret: Option<String>,

  /// Insert demo catalog rows on startup.
  pub seed_demo: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let opt_env = |var_name: &str| env::var(var_name).ok().filter(|v| !v.is_empty());

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;

    let admin_key = opt_env("ADMIN_API_KEY");
    let currency = get_env("BOOKING_CURRENCY").unwrap_or_else(|_| "XAF".to_string());
    let provider_timeout_ms = get_env("PROVIDER_TIMEOUT_MS")
      .unwrap_or_else(|_| "8000".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid PROVIDER_TIMEOUT_MS: {}", e)))?;

    let momo_base_url =
      get_env("MOMO_BASE_URL").unwrap_or_else(|_| "https://sandbox.momodeveloper.mtn.com".to_string());
    let momo_api_key = opt_env("MOMO_API_KEY");
    let momo_webhook_secret = opt_env("MOMO_WEBHOOK_SECRET");

    let orange_base_url = get_env("ORANGE_BASE_URL").unwrap_or_else(|_| "https://api.orange.com".to_string());
    let orange_api_token = opt_env("ORANGE_API_TOKEN");
    let orange_webhook_secret = opt_env("ORANGE_WEBHOOK_SECRET");

    let seed_demo = get_env("SEED_DEMO")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DEMO value: {}", e)))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      admin_key,
      currency,
      provider_timeout_ms,
      momo_base_url,
      momo_api_key,
      momo_webhook_secret,
      orange_base_url,
      orange_api_token,
      orange_webhook_secret,
      seed_demo,
    })
  }
}
