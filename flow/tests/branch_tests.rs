mod common;

use common::*;
use nyama_flow::{Ctx, Flow, FlowOutcome, StageControl};
use serial_test::serial;
use std::sync::Arc;

fn arm_a_flow() -> Arc<Flow<ArmCtxA, TestError>> {
  let mut f = Flow::<ArmCtxA, TestError>::new(&[("work_a", false, None)]);
  f.on_stage("work_a", |ctx: Ctx<ArmCtxA>| async move {
    let mut guard = ctx.write();
    guard.output = format!("A:{}", guard.input);
    Ok::<_, TestError>(StageControl::Continue)
  });
  Arc::new(f)
}

fn arm_b_flow() -> Arc<Flow<ArmCtxB, TestError>> {
  let mut f = Flow::<ArmCtxB, TestError>::new(&[("work_b", false, None)]);
  f.on_stage("work_b", |ctx: Ctx<ArmCtxB>| async move {
    let mut guard = ctx.write();
    guard.output = format!("B:{}", guard.input);
    Ok::<_, TestError>(StageControl::Continue)
  });
  Arc::new(f)
}

fn build_routed_flow(require_match: bool) -> Flow<TestCtx, TestError> {
  let mut flow = Flow::<TestCtx, TestError>::new(&[("mark_entry", false, None)]);
  flow.on_stage("mark_entry", trail_hook("mark_entry"));

  let builder = flow
    .branches_for_stage("route")
    .arm(
      arm_a_flow(),
      |root: Ctx<TestCtx>| {
        root.write().arm_a_ran = true;
        Ok(Ctx::new(ArmCtxA {
          input: "payload".to_string(),
          output: String::new(),
        }))
      },
      |root: Ctx<TestCtx>| root.read().route.as_deref() == Some("a"),
    )
    .arm(
      arm_b_flow(),
      |root: Ctx<TestCtx>| {
        root.write().arm_b_ran = true;
        Ok(Ctx::new(ArmCtxB {
          input: "payload".to_string(),
          output: String::new(),
        }))
      },
      |root: Ctx<TestCtx>| root.read().route.as_deref() == Some("b"),
    );

  if require_match {
    builder.require_match().seal(false);
  } else {
    builder.seal(false);
  }
  flow
}

#[tokio::test]
#[serial]
async fn first_matching_arm_runs() {
  setup_tracing();
  let flow = build_routed_flow(false);

  let ctx = Ctx::new(TestCtx {
    route: Some("a".to_string()),
    ..TestCtx::default()
  });
  let outcome = flow.run(ctx.clone()).await;

  assert_eq!(outcome.unwrap(), FlowOutcome::Completed);
  let guard = ctx.read();
  assert!(guard.arm_a_ran);
  assert!(!guard.arm_b_ran);
}

#[tokio::test]
#[serial]
async fn other_arm_selected_by_predicate() {
  setup_tracing();
  let flow = build_routed_flow(false);

  let ctx = Ctx::new(TestCtx {
    route: Some("b".to_string()),
    ..TestCtx::default()
  });
  let outcome = flow.run(ctx.clone()).await;

  assert_eq!(outcome.unwrap(), FlowOutcome::Completed);
  let guard = ctx.read();
  assert!(!guard.arm_a_ran);
  assert!(guard.arm_b_ran);
}

#[tokio::test]
#[serial]
async fn no_match_defaults_to_continue() {
  setup_tracing();
  let flow = build_routed_flow(false);

  let ctx = Ctx::new(TestCtx {
    route: Some("nope".to_string()),
    ..TestCtx::default()
  });
  let outcome = flow.run(ctx.clone()).await;

  assert_eq!(outcome.unwrap(), FlowOutcome::Completed);
  let guard = ctx.read();
  assert!(!guard.arm_a_ran);
  assert!(!guard.arm_b_ran);
}

#[tokio::test]
#[serial]
async fn require_match_turns_no_match_into_error() {
  setup_tracing();
  let flow = build_routed_flow(true);

  let ctx = Ctx::new(TestCtx {
    route: Some("nope".to_string()),
    ..TestCtx::default()
  });
  let outcome = flow.run(ctx).await;

  match outcome {
    Err(TestError::Flow(s)) => assert!(s.contains("NoArmMatched")),
    other => panic!("expected NoArmMatched, got {other:?}"),
  }
}

#[tokio::test]
#[serial]
async fn failing_arm_error_propagates_when_stage_required() {
  setup_tracing();
  let mut flow = Flow::<TestCtx, TestError>::new(&[]);

  let mut bad = Flow::<ArmCtxA, TestError>::new(&[("explode", false, None)]);
  bad.on_stage("explode", |_ctx: Ctx<ArmCtxA>| async move {
    Err::<StageControl, _>(TestError::Hook("arm failure".to_string()))
  });

  flow
    .branches_for_stage("route")
    .arm(
      Arc::new(bad),
      |_root: Ctx<TestCtx>| Ok(Ctx::new(ArmCtxA::default())),
      |_root: Ctx<TestCtx>| true,
    )
    .seal(false);

  let ctx = Ctx::new(TestCtx::default());
  let outcome = flow.run(ctx).await;
  assert_eq!(outcome.unwrap_err(), TestError::Hook("arm failure".to_string()));
}

#[tokio::test]
#[serial]
async fn failing_arm_is_swallowed_when_stage_optional() {
  setup_tracing();
  let mut flow = Flow::<TestCtx, TestError>::new(&[("tail", false, None)]);
  flow.on_stage("tail", trail_hook("tail"));

  let mut bad = Flow::<ArmCtxA, TestError>::new(&[("explode", false, None)]);
  bad.on_stage("explode", |_ctx: Ctx<ArmCtxA>| async move {
    Err::<StageControl, _>(TestError::Hook("arm failure".to_string()))
  });

  flow
    .branches_for_stage("route")
    .arm(
      Arc::new(bad),
      |_root: Ctx<TestCtx>| Ok(Ctx::new(ArmCtxA::default())),
      |_root: Ctx<TestCtx>| true,
    )
    .seal(true);

  let ctx = Ctx::new(TestCtx::default());
  let outcome = flow.run(ctx.clone()).await;

  assert_eq!(outcome.unwrap(), FlowOutcome::Completed);
  assert_eq!(ctx.read().trail, vec!["tail"]);
}
