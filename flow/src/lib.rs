//! nyama-flow: a small asynchronous, type-safe staged workflow engine.
//!
//! A [`Flow`] is an ordered list of named stages. Each stage carries
//! `before`/`on`/`after` hook vectors, an optional flag, and an optional
//! skip predicate evaluated against the shared context. Hooks are async,
//! receive a cloned [`Ctx`] handle, and decide whether the flow continues
//! or halts. A stage may instead host *branch arms*: statically-built
//! sub-flows paired with a context extractor and a predicate, of which the
//! first matching arm runs.
//!
//! Flows are dispatched through a [`FlowSet`], a registry keyed by the
//! context data type, so callers only ever hand over a `Ctx<T>` and the
//! registry finds the flow that knows how to drive it.

pub mod branch;
pub mod ctx;
pub mod error;
pub mod flow;
pub mod registry;
pub mod stage;

pub use crate::branch::BranchBuilder;
pub use crate::ctx::Ctx;
pub use crate::error::{FlowError, FlowResult};
pub use crate::flow::{Flow, FlowOutcome, Hook, StageControl};
pub use crate::registry::FlowSet;
pub use crate::stage::{SkipWhen, StageDef};
