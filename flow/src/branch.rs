//! Branch arms: conditional routing of one stage into statically-built
//! sub-flows, each with its own context type.

use crate::ctx::Ctx;
use crate::error::FlowError;
use crate::flow::{Flow, FlowOutcome, Hook, StageControl};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, Level};

/// One routing arm: a predicate over the root context, an extractor
/// producing the sub-flow's context, and the sub-flow itself.
struct BranchArm<T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  stage: String,
  sub_flow: Arc<Flow<S, E>>,
  extract: Arc<dyn Fn(Ctx<T>) -> Result<Ctx<S>, FlowError> + Send + Sync + 'static>,
  when: Arc<dyn Fn(Ctx<T>) -> bool + Send + Sync + 'static>,
}

/// Type-erased arm so arms over different sub-context types can live in one
/// vector.
#[async_trait]
trait AnyBranchArm<T, E>: Send + Sync
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn matches(&self, ctx: Ctx<T>) -> bool;
  async fn run(&self, ctx: Ctx<T>) -> Result<StageControl, E>;
}

#[async_trait]
impl<T, S, E> AnyBranchArm<T, E> for BranchArm<T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn matches(&self, ctx: Ctx<T>) -> bool {
    (self.when)(ctx)
  }

  async fn run(&self, ctx: Ctx<T>) -> Result<StageControl, E> {
    let sub_ctx = match (self.extract)(ctx) {
      Ok(c) => c,
      Err(err) => {
        event!(Level::ERROR, stage = %self.stage, error = %err, "branch extractor failed");
        let wrapped = match err {
          FlowError::Hook { source } => FlowError::BranchExtraction {
            stage: self.stage.clone(),
            source,
          },
          other => other,
        };
        return Err(E::from(wrapped));
      }
    };

    match self.sub_flow.run(sub_ctx).await? {
      FlowOutcome::Completed => Ok(StageControl::Continue),
      FlowOutcome::Halted => Ok(StageControl::Halt),
    }
  }
}

/// Fluent builder collecting arms for a branch stage. Finish with
/// [`BranchBuilder::seal`], which installs the dispatching hook.
pub struct BranchBuilder<'f, T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flow: &'f mut Flow<T, E>,
  stage: String,
  arms: Vec<Arc<dyn AnyBranchArm<T, E>>>,
  no_match: Option<StageControl>,
}

impl<'f, T, E> BranchBuilder<'f, T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) fn new(flow: &'f mut Flow<T, E>, stage: String) -> Self {
    Self {
      flow,
      stage,
      arms: Vec::new(),
      no_match: Some(StageControl::Continue),
    }
  }

  /// Adds an arm routing to `sub_flow` through `extract` whenever `when`
  /// holds. Arms are tried in insertion order; the first match wins.
  pub fn arm<S>(
    mut self,
    sub_flow: Arc<Flow<S, E>>,
    extract: impl Fn(Ctx<T>) -> Result<Ctx<S>, FlowError> + Send + Sync + 'static,
    when: impl Fn(Ctx<T>) -> bool + Send + Sync + 'static,
  ) -> Self
  where
    S: 'static + Send + Sync,
  {
    self.arms.push(Arc::new(BranchArm {
      stage: self.stage.clone(),
      sub_flow,
      extract: Arc::new(extract),
      when: Arc::new(when),
    }));
    self
  }

  /// Behaviour when no arm matches; defaults to [`StageControl::Continue`].
  pub fn if_no_match(mut self, control: StageControl) -> Self {
    self.no_match = Some(control);
    self
  }

  /// Makes a non-matching dispatch a [`FlowError::NoArmMatched`] error.
  pub fn require_match(mut self) -> Self {
    self.no_match = None;
    self
  }

  /// Installs the dispatching hook for the stage. When `optional` is true,
  /// an arm error is swallowed and the parent flow continues.
  pub fn seal(self, optional: bool) {
    let stage = self.stage.clone();
    let arms = Arc::new(self.arms);
    let no_match = self.no_match;

    let dispatch: Hook<T, E> = Box::new(move |ctx: Ctx<T>| {
      let arms = arms.clone();
      let stage = stage.clone();
      Box::pin(async move {
        for arm in arms.iter() {
          if arm.matches(ctx.clone()) {
            event!(Level::DEBUG, %stage, "branch arm matched");
            return match arm.run(ctx.clone()).await {
              Ok(control) => Ok(control),
              Err(e) => {
                event!(Level::ERROR, %stage, error = %e, "branch arm failed");
                if optional {
                  event!(Level::WARN, %stage, "branch stage is optional, continuing");
                  Ok(StageControl::Continue)
                } else {
                  Err(e)
                }
              }
            };
          }
        }
        match no_match {
          Some(control) => {
            event!(Level::DEBUG, %stage, "no branch arm matched, applying default");
            Ok(control)
          }
          None => Err(E::from(FlowError::NoArmMatched { stage: stage.clone() })),
        }
      })
    });

    if let Some(def) = self.flow.stages.iter_mut().find(|s| s.name == self.stage) {
      def.optional = optional;
    }
    self.flow.on.insert(self.stage.clone(), vec![dispatch]);
    event!(Level::INFO, stage = %self.stage, "branch arms sealed");
  }
}
