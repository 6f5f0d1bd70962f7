use crate::ctx::Ctx;
use std::sync::Arc;

/// Predicate deciding whether a stage is skipped for this run. Evaluated on
/// the root context before any hook of the stage fires.
pub type SkipWhen<T> = Arc<dyn Fn(Ctx<T>) -> bool + Send + Sync + 'static>;

/// Definition of one stage in a flow: its name, whether the flow tolerates
/// the stage having no hooks, and an optional skip predicate.
pub struct StageDef<T: 'static + Send + Sync> {
  pub name: String,
  pub optional: bool,
  pub skip_when: Option<SkipWhen<T>>,
}

impl<T: 'static + Send + Sync> Clone for StageDef<T> {
  fn clone(&self) -> Self {
    StageDef {
      name: self.name.clone(),
      optional: self.optional,
      skip_when: self.skip_when.clone(),
    }
  }
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StageDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StageDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("skip_when_present", &self.skip_when.is_some())
      .finish()
  }
}
