use crate::config::AppConfig;
use crate::errors::AppError;
use crate::payments::ProviderRegistry;
use crate::store::Store;
use nyama_flow::FlowSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub flows: Arc<FlowSet<AppError>>,
  pub providers: Arc<ProviderRegistry>,
  pub config: Arc<AppConfig>,
}
