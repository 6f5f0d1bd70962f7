//! `FlowSet<E>`: a type-keyed registry dispatching a `Ctx<T>` to the flow
//! registered for `T`, with the context type erased at the storage layer.

use crate::ctx::Ctx;
use crate::error::FlowError;
use crate::flow::{Flow, FlowOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Type-erased runner stored in the registry. `AE` is the error type the
/// registry surfaces to its callers.
#[async_trait]
trait AnyFlowRunner<AE>: Send + Sync
where
  AE: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` must contain a `Ctx<T>` for the runner's `T`.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<FlowOutcome, AE>;
}

struct FlowRunner<T, HE, AE>
where
  T: 'static + Send + Sync,
  HE: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AE: std::error::Error + From<HE> + From<FlowError> + Send + Sync + 'static,
{
  flow: Arc<Flow<T, HE>>,
  _phantom: PhantomData<fn() -> (HE, AE)>,
}

#[async_trait]
impl<T, HE, AE> AnyFlowRunner<AE> for FlowRunner<T, HE, AE>
where
  T: 'static + Send + Sync,
  HE: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AE: std::error::Error + From<HE> + From<FlowError> + Send + Sync + 'static,
{
  #[instrument(
    name = "FlowRunner::run_erased",
    skip_all,
    fields(target_ctx_type = %std::any::type_name::<T>()),
    err(Display)
  )]
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<FlowOutcome, AE> {
    let ctx = match ctx_obj.downcast::<Ctx<T>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected = std::any::type_name::<Ctx<T>>();
        event!(Level::ERROR, "context object type mismatch, expected {expected}");
        return Err(AE::from(FlowError::ContextMismatch {
          expected: expected.to_string(),
        }));
      }
    };
    self.flow.run(ctx).await.map_err(AE::from)
  }
}

/// Registry of flows keyed by their context data type.
pub struct FlowSet<AE = FlowError>
where
  AE: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  runners: Mutex<HashMap<TypeId, Arc<dyn AnyFlowRunner<AE>>>>,
}

impl<AE> FlowSet<AE>
where
  AE: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      runners: Mutex::new(HashMap::new()),
    }
  }

  /// Registers `flow` under its context type `T`, replacing any previous
  /// registration for the same type.
  pub fn insert<T, HE>(&self, flow: Flow<T, HE>)
  where
    T: 'static + Send + Sync,
    HE: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AE: From<HE>,
  {
    event!(
      Level::DEBUG,
      ctx_type = %std::any::type_name::<T>(),
      "registering flow"
    );
    let runner = FlowRunner::<T, HE, AE> {
      flow: Arc::new(flow),
      _phantom: PhantomData,
    };
    self.runners.lock().insert(TypeId::of::<T>(), Arc::new(runner));
  }

  /// Runs the flow registered for `T` over `ctx`.
  pub async fn run<T>(&self, ctx: Ctx<T>) -> Result<FlowOutcome, AE>
  where
    T: 'static + Send + Sync,
  {
    // The guard drops before the await below.
    let runner = self.runners.lock().get(&TypeId::of::<T>()).cloned();

    let Some(runner) = runner else {
      let type_name = std::any::type_name::<T>();
      event!(Level::ERROR, "no flow registered for context type {type_name}");
      return Err(AE::from(FlowError::Unregistered {
        type_name: type_name.to_string(),
      }));
    };

    let ctx_obj: Box<dyn Any + Send> = Box::new(ctx);
    runner.run_erased(ctx_obj).await
  }
}

impl<AE> Default for FlowSet<AE>
where
  AE: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
