use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::{web as actix_data, App, HttpServer};
use nyama_flow::FlowSet;
use sqlx::PgPool;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

use nyama_server::config::AppConfig;
use nyama_server::errors::AppError;
use nyama_server::flows;
use nyama_server::payments::{momo::MomoProvider, orange::OrangeProvider, ProviderRegistry};
use nyama_server::seed;
use nyama_server::state::AppState;
use nyama_server::store::PgStore;
use nyama_server::web::routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting ordering backend...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      panic!("Configuration error: {}", e);
    }
  };

  let db_pool = match PgPool::connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      panic!("Database connection error: {}", e);
    }
  };
  let store = Arc::new(PgStore::new(db_pool.clone()));

  if app_config.seed_demo {
    if let Err(e) = seed::seed_demo_catalog(store.as_ref()).await {
      tracing::error!(error = %e, "Failed to seed demo catalog.");
    }
  }

  let http = match reqwest::Client::builder()
    .timeout(Duration::from_millis(app_config.provider_timeout_ms))
    .build()
  {
    Ok(client) => client,
    Err(e) => {
      tracing::error!(error = %e, "Failed to build the provider HTTP client.");
      panic!("HTTP client error: {}", e);
    }
  };

  let mut providers = ProviderRegistry::new();
  providers.register(Arc::new(MomoProvider::new(
    http.clone(),
    app_config.momo_base_url.clone(),
    app_config.momo_api_key.clone(),
    app_config.momo_webhook_secret.clone(),
  )));
  providers.register(Arc::new(OrangeProvider::new(
    http,
    app_config.orange_base_url.clone(),
    app_config.orange_api_token.clone(),
    app_config.orange_webhook_secret.clone(),
  )));

  let flow_set = Arc::new(FlowSet::<AppError>::new());
  flows::register_all_flows(&flow_set);

  let app_state = AppState {
    store,
    flows: flow_set,
    providers: Arc::new(providers),
    config: app_config.clone(),
  };

  // Periodic system sampler: uptime and pool stats.
  let sampler_pool = db_pool.clone();
  let started = Instant::now();
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(Duration::from_secs(30));
    loop {
      ticker.tick().await;
      tracing::info!(
        uptime_secs = started.elapsed().as_secs(),
        pool_size = sampler_pool.size(),
        pool_idle = sampler_pool.num_idle(),
        "system sampler"
      );
    }
  });

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(routes::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
