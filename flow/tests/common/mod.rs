#![allow(dead_code)]

use nyama_flow::{Ctx, FlowError, StageControl};
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct TestCtx {
  pub counter: i32,
  pub trail: Vec<String>,
  pub route: Option<String>,
  pub arm_a_ran: bool,
  pub arm_b_ran: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ArmCtxA {
  pub input: String,
  pub output: String,
}

#[derive(Clone, Debug, Default)]
pub struct ArmCtxB {
  pub input: String,
  pub output: String,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow framework error: {0}")]
  Flow(String),

  #[error("test hook failed: {0}")]
  Hook(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    // Stringified so the test error stays Eq-comparable.
    TestError::Flow(format!("{fe:?}"))
  }
}

pub fn trail_hook(
  stage: &'static str,
) -> impl Fn(Ctx<TestCtx>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<StageControl, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: Ctx<TestCtx>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.trail.push(stage.to_string());
      Ok(StageControl::Continue)
    })
  }
}

pub fn failing_hook(
  stage: &'static str,
  message: &'static str,
) -> impl Fn(Ctx<TestCtx>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<StageControl, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: Ctx<TestCtx>| {
    Box::pin(async move {
      ctx.write().trail.push(stage.to_string());
      Err(TestError::Hook(message.to_string()))
    })
  }
}

use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
