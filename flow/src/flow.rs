//! The `Flow<T, E>` definition, hook registration, and the `run` loop.

use crate::branch::BranchBuilder;
use crate::ctx::Ctx;
use crate::error::FlowError;
use crate::stage::{SkipWhen, StageDef};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tracing::{event, instrument, span, Instrument, Level};

/// Signal from a hook: keep going, or halt the whole flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageControl {
  Continue,
  /// Halt immediately; no further hook in this or any later stage runs.
  Halt,
}

/// Outcome of a full flow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  /// All non-skipped stages ran to completion.
  Completed,
  /// A hook returned [`StageControl::Halt`].
  Halted,
}

/// Boxed async hook over the shared context. Hooks must drop any `Ctx` lock
/// guard before awaiting.
pub type Hook<T, E> = Box<
  dyn Fn(Ctx<T>) -> Pin<Box<dyn Future<Output = Result<StageControl, E>> + Send>> + Send + Sync,
>;

/// A staged workflow over context data `T`, whose hooks fail with `E`.
///
/// `E` must be `From<FlowError>` so framework failures (missing handlers,
/// branch extraction) surface through the same error channel as application
/// failures.
pub struct Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) stages: Vec<StageDef<T>>,
  pub(crate) before: HashMap<String, Vec<Hook<T, E>>>,
  pub(crate) on: HashMap<String, Vec<Hook<T, E>>>,
  pub(crate) after: HashMap<String, Vec<Hook<T, E>>>,
}

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a flow from `(name, optional, skip_when)` stage definitions.
  pub fn new(defs: &[(&str, bool, Option<SkipWhen<T>>)]) -> Self {
    let stages = defs
      .iter()
      .map(|(name, optional, skip)| StageDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_when: skip.clone(),
      })
      .collect();
    Self {
      stages,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  /// Panics when `stage` is not part of the definition. Registering a hook
  /// against a misspelled stage is a setup bug, not a runtime condition.
  pub(crate) fn assert_stage(&self, stage: &str) {
    if !self.stages.iter().any(|s| s.name == stage) {
      panic!("flow setup error: stage '{stage}' not found in flow definition");
    }
  }

  pub fn set_optional(&mut self, stage: &str, optional: bool) {
    self.assert_stage(stage);
    if let Some(def) = self.stages.iter_mut().find(|s| s.name == stage) {
      def.optional = optional;
    }
  }

  pub fn set_skip_when(&mut self, stage: &str, skip_when: Option<SkipWhen<T>>) {
    self.assert_stage(stage);
    if let Some(def) = self.stages.iter_mut().find(|s| s.name == stage) {
      def.skip_when = skip_when;
    }
  }

  // Hooks return `Result<StageControl, E>` directly; errors raised as other
  // types reach `E` through `?` conversion inside the hook body.
  fn push_hook<F, Fut>(map: &mut HashMap<String, Vec<Hook<T, E>>>, stage: &str, hook: F)
  where
    F: Fn(Ctx<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StageControl, E>> + Send + 'static,
  {
    let boxed: Hook<T, E> = Box::new(move |ctx| Box::pin(hook(ctx)));
    map.entry(stage.to_string()).or_default().push(boxed);
  }

  /// Registers a hook running before the stage's main hooks.
  pub fn before_stage<F, Fut>(&mut self, stage: &str, hook: F)
  where
    F: Fn(Ctx<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StageControl, E>> + Send + 'static,
  {
    self.assert_stage(stage);
    Self::push_hook(&mut self.before, stage, hook);
  }

  /// Registers a main hook for the stage.
  pub fn on_stage<F, Fut>(&mut self, stage: &str, hook: F)
  where
    F: Fn(Ctx<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StageControl, E>> + Send + 'static,
  {
    self.assert_stage(stage);
    Self::push_hook(&mut self.on, stage, hook);
  }

  /// Registers a hook running after the stage's main hooks.
  pub fn after_stage<F, Fut>(&mut self, stage: &str, hook: F)
  where
    F: Fn(Ctx<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StageControl, E>> + Send + 'static,
  {
    self.assert_stage(stage);
    Self::push_hook(&mut self.after, stage, hook);
  }

  /// Opens a [`BranchBuilder`] turning `stage` into a branch point. The
  /// stage is appended to the definition if it does not exist yet.
  pub fn branches_for_stage(&mut self, stage: &str) -> BranchBuilder<'_, T, E> {
    if !self.stages.iter().any(|s| s.name == stage) {
      self.stages.push(StageDef {
        name: stage.to_string(),
        optional: false,
        skip_when: None,
      });
    }
    BranchBuilder::new(self, stage.to_string())
  }

  /// Drives the flow over `ctx`, stage by stage.
  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(
      flow_ctx_type = %std::any::type_name::<T>(),
      num_stages = self.stages.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx: Ctx<T>) -> Result<FlowOutcome, E> {
    event!(Level::DEBUG, "flow run starting");

    for (idx, def) in self.stages.iter().enumerate() {
      let stage = def.name.as_str();
      // Guards are never held across awaits; hook futures get the span via
      // `Instrument` instead.
      let stage_span = span!(Level::INFO, "flow_stage", stage, stage_index = idx, optional = def.optional);

      if let Some(skip) = &def.skip_when {
        if stage_span.in_scope(|| skip(ctx.clone())) {
          event!(parent: &stage_span, Level::INFO, "stage skipped by skip_when predicate");
          continue;
        }
      }

      let phases = [
        ("before", self.before.get(stage)),
        ("on", self.on.get(stage)),
        ("after", self.after.get(stage)),
      ];

      if phases.iter().all(|(_, hooks)| hooks.map_or(true, |v| v.is_empty())) {
        if def.optional {
          event!(parent: &stage_span, Level::DEBUG, "optional stage has no hooks, skipping");
          continue;
        }
        event!(parent: &stage_span, Level::ERROR, "required stage has no hooks");
        return Err(E::from(FlowError::MissingHandler {
          stage: def.name.clone(),
        }));
      }

      for (phase, hooks) in phases {
        let Some(hooks) = hooks else { continue };
        for (hook_idx, hook) in hooks.iter().enumerate() {
          let hook_span = span!(parent: &stage_span, Level::DEBUG, "flow_hook", phase, hook_index = hook_idx);
          match hook(ctx.clone()).instrument(hook_span).await {
            Ok(StageControl::Continue) => {}
            Ok(StageControl::Halt) => {
              event!(parent: &stage_span, Level::INFO, phase, "flow halted by hook");
              return Ok(FlowOutcome::Halted);
            }
            Err(e) => {
              event!(parent: &stage_span, Level::ERROR, phase, error = %e, "hook failed");
              return Err(e);
            }
          }
        }
      }
      event!(parent: &stage_span, Level::DEBUG, "stage finished");
    }

    event!(Level::DEBUG, "flow run completed");
    Ok(FlowOutcome::Completed)
  }
}
