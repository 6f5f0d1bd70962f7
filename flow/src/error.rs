use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Framework-level failures. Application errors flowing out of hooks use the
/// flow's own `E` parameter; `FlowError` covers the engine's concerns only.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("no handler registered for required stage '{stage}'")]
  MissingHandler { stage: String },

  #[error("stage '{stage}' is not part of the flow definition")]
  UnknownStage { stage: String },

  #[error("branch extractor failed in stage '{stage}': {source}")]
  BranchExtraction {
    stage: String,
    #[source]
    source: AnyhowError,
  },

  #[error("no branch arm matched in stage '{stage}'")]
  NoArmMatched { stage: String },

  #[error("context type mismatch during dispatch (expected {expected})")]
  ContextMismatch { expected: String },

  #[error("no flow registered for context type {type_name}")]
  Unregistered { type_name: String },

  #[error("hook failure: {source}")]
  Hook {
    #[source]
    source: AnyhowError,
  },

  #[error("internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::Hook { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
