//! Shared fixtures for the server integration tests. Everything runs
//! against the in-memory store and stub/sandbox providers; no network, no
//! database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use uuid::Uuid;

use nyama_flow::FlowSet;
use nyama_server::config::AppConfig;
use nyama_server::errors::{AppError, Result};
use nyama_server::flows;
use nyama_server::models::{Availability, Booking, CatalogItem, ItemKind};
use nyama_server::payments::{
  momo::MomoProvider, orange::OrangeProvider, PaymentMethod, PaymentNotice, PaymentProvider, ProviderRegistry,
  ProviderReport,
};
use nyama_server::state::AppState;
use nyama_server::store::{MemoryStore, Store};

static TRACING: Lazy<()> = Lazy::new(|| {
  let subscriber = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .finish();
  let _ = tracing::subscriber::set_global_default(subscriber);
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    database_url: "postgres://unused".to_string(),
    admin_key: Some("test-admin-key".to_string()),
    currency: "XAF".to_string(),
    provider_timeout_ms: 8_000,
    momo_base_url: "http://127.0.0.1:0".to_string(),
    momo_api_key: None,
    momo_webhook_secret: None,
    orange_base_url: "http://127.0.0.1:0".to_string(),
    orange_api_token: None,
    orange_webhook_secret: None,
    seed_demo: false,
  }
}

/// State with the real provider clients in sandbox mode (no secrets). Good
/// for anything that never performs an outbound provider call, plus webhook
/// parsing which is pure.
pub fn test_state() -> AppState {
  test_state_with(test_config(), None)
}

/// Same, but webhook bodies must carry a valid HMAC signature.
pub fn signed_state(secret: &str) -> AppState {
  let mut config = test_config();
  config.momo_webhook_secret = Some(secret.to_string());
  config.orange_webhook_secret = Some(secret.to_string());
  test_state_with(config, None)
}

/// State whose provider registry answers collection/lookup calls from a
/// canned [`StubProvider`] instead of the network.
pub fn stubbed_state(stub: Arc<StubProvider>) -> AppState {
  test_state_with(test_config(), Some(stub))
}

fn test_state_with(config: AppConfig, stub: Option<Arc<StubProvider>>) -> AppState {
  setup_tracing();

  let http = reqwest::Client::new();
  let mut providers = ProviderRegistry::new();
  match stub {
    Some(stub) => providers.register(stub),
    None => {
      providers.register(Arc::new(MomoProvider::new(
        http.clone(),
        config.momo_base_url.clone(),
        config.momo_api_key.clone(),
        config.momo_webhook_secret.clone(),
      )));
      providers.register(Arc::new(OrangeProvider::new(
        http,
        config.orange_base_url.clone(),
        config.orange_api_token.clone(),
        config.orange_webhook_secret.clone(),
      )));
    }
  }

  let flow_set = Arc::new(FlowSet::<AppError>::new());
  flows::register_all_flows(&flow_set);

  AppState {
    store: Arc::new(MemoryStore::new()),
    flows: flow_set,
    providers: Arc::new(providers),
    config: Arc::new(config),
  }
}

/// Programmable provider standing in for MTN MoMo.
pub struct StubProvider {
  pub lookup_report: Mutex<ProviderReport>,
  pub collection_report: ProviderReport,
}

impl StubProvider {
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      lookup_report: Mutex::new(ProviderReport {
        provider_status: "PENDING".to_string(),
        transaction_id: None,
      }),
      collection_report: ProviderReport {
        provider_status: "PENDING".to_string(),
        transaction_id: Some("STUB-TX-1".to_string()),
      },
    })
  }

  pub fn set_lookup(&self, provider_status: &str, transaction_id: Option<&str>) {
    *self.lookup_report.lock() = ProviderReport {
      provider_status: provider_status.to_string(),
      transaction_id: transaction_id.map(String::from),
    };
  }
}

#[async_trait]
impl PaymentProvider for StubProvider {
  fn method(&self) -> PaymentMethod {
    PaymentMethod::MtnMomo
  }

  fn webhook_secret(&self) -> Option<&str> {
    None
  }

  async fn request_collection(&self, _booking: &Booking, _payer_msisdn: &str) -> Result<ProviderReport> {
    Ok(self.collection_report.clone())
  }

  async fn lookup_status(&self, _reference: &str, _transaction_id: Option<&str>) -> Result<ProviderReport> {
    Ok(self.lookup_report.lock().clone())
  }

  fn parse_webhook(&self, payload: &[u8]) -> Result<PaymentNotice> {
    let raw: serde_json::Value =
      serde_json::from_slice(payload).map_err(|e| AppError::Validation(format!("bad stub webhook: {}", e)))?;
    let reference = raw["externalId"]
      .as_str()
      .map(String::from)
      .ok_or_else(|| AppError::Validation("stub webhook missing externalId".to_string()))?;
    Ok(PaymentNotice {
      reference,
      provider_status: raw["status"].as_str().unwrap_or_default().to_string(),
      transaction_id: raw["financialTransactionId"].as_str().map(String::from),
      raw,
    })
  }
}

pub async fn seed_item(store: &dyn Store, name: &str, price_cents: i64, stock: Option<i32>) -> CatalogItem {
  seed_item_with(store, name, price_cents, stock, Availability::Available).await
}

pub async fn seed_item_with(
  store: &dyn Store,
  name: &str,
  price_cents: i64,
  stock: Option<i32>,
  availability: Availability,
) -> CatalogItem {
  let now = Utc::now();
  let item = CatalogItem {
    id: Uuid::new_v4(),
    name: name.to_string(),
    kind: ItemKind::Meal,
    price_cents,
    availability,
    stock,
    created_at: now,
    updated_at: now,
  };
  store.upsert_item(&item).await.unwrap();
  item
}

pub async fn seed_booking(store: &dyn Store, reference: &str, user_id: Uuid, amount_cents: i64) -> Booking {
  let mut booking = Booking::new_pending(user_id, amount_cents, "XAF");
  booking.reference = reference.to_string();
  store.create_booking(&booking).await.unwrap();
  booking
}
