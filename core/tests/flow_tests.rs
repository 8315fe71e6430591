// tests/flow_tests.rs
mod common;

use common::*;
use order_relay::{ContextData, Flow, FlowControl, FlowOutcome};
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn test_flow_runs_steps_in_order() {
  setup_tracing();
  let mut flow =
    Flow::<TestContext, TestError>::new("ordered", &[("step1", false, None), ("step2", false, None), ("step3", false, None)]);

  flow.on("step1", create_simple_handler("step1", " S1"));
  flow.on("step2", create_simple_handler("step2", " S2"));
  flow.on("step3", create_simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let result = flow.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), FlowOutcome::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_flow_halts_on_halt_control() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(
    "halting",
    &[("stepA", false, None), ("haltStep", false, None), ("stepC", false, None)],
  );

  flow.on("stepA", create_simple_handler("stepA", "A"));
  flow.on("haltStep", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push("haltStep".to_string());
      Ok::<FlowControl, TestError>(FlowControl::Halt)
    })
  });
  flow.on("stepC", create_simple_handler("stepC", "C"));

  let ctx = ContextData::new(TestContext::default());
  let result = flow.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), FlowOutcome::Halted);
  let guard = ctx.read();
  assert_eq!(guard.message, "A");
  assert_eq!(guard.steps_executed, vec!["stepA", "haltStep"]);
}

#[tokio::test]
#[serial]
async fn test_halt_skips_after_handlers_of_same_step() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new("halt_after", &[("main", false, None)]);
  flow.on("main", create_simple_handler("on_main", "On;"));
  flow.after("main", create_simple_handler("after_main", "After;"));

  let ctx = ContextData::new(TestContext {
    should_stop_at: Some("on_main".to_string()),
    ..Default::default()
  });
  let result = flow.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), FlowOutcome::Halted);
  assert_eq!(ctx.read().steps_executed, vec!["on_main"]);
}

#[tokio::test]
#[serial]
async fn test_flow_propagates_handler_error() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(
    "failing",
    &[("good_step", false, None), ("bad_step", false, None), ("another_step", false, None)],
  );

  flow.on("good_step", create_simple_handler("good_step", "Good"));
  flow.on("bad_step", create_failing_handler("bad_step", "I am a bad step!"));
  flow.on("another_step", create_simple_handler("another_step", "NeverRun"));

  let ctx = ContextData::new(TestContext::default());
  let result = flow.run(ctx.clone()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("I am a bad step!".to_string()));
  let guard = ctx.read();
  assert_eq!(guard.message, "Good");
  assert_eq!(guard.steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
#[serial]
async fn test_flow_skips_step_if_condition_met() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(
    "skipping",
    &[
      ("step1", false, None),
      (
        "step_to_skip",
        false,
        Some(Arc::new(|ctx: ContextData<TestContext>| ctx.read().counter > 0)),
      ),
      ("step3", false, None),
    ],
  );

  flow.on("step1", create_simple_handler("step1", " S1"));
  flow.on("step_to_skip", create_simple_handler("step_to_skip", " SKIPPED"));
  flow.on("step3", create_simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(flow.run(ctx.clone()).await.unwrap(), FlowOutcome::Completed);
  assert_eq!(ctx.read().steps_executed, vec!["step1", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_skip_condition_can_be_set_and_cleared() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new("late_skip", &[("only", false, None)]);
  flow.on("only", create_simple_handler("only", " O"));
  flow.set_skip_condition("only", Some(Arc::new(|_ctx: ContextData<TestContext>| true)));

  let ctx = ContextData::new(TestContext::default());
  flow.run(ctx.clone()).await.unwrap();
  assert!(ctx.read().steps_executed.is_empty());

  flow.set_skip_condition("only", None);
  flow.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().steps_executed, vec!["only"]);
}

#[tokio::test]
#[serial]
async fn test_non_optional_step_missing_handler_fails() {
  setup_tracing();
  let flow = Flow::<TestContext, TestError>::new("missing", &[("step_with_no_handler", false, None)]);

  let result = flow.run(ContextData::new(TestContext::default())).await;

  match result {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("step_with_no_handler"));
    }
    other => panic!("Expected FlowError::HandlerMissing, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_optional_step_missing_handler_succeeds() {
  setup_tracing();
  let flow = Flow::<TestContext, TestError>::new("optional", &[("optional_step_no_handler", true, None)]);
  let result = flow.run(ContextData::new(TestContext::default())).await;
  assert_eq!(result.unwrap(), FlowOutcome::Completed);
}

#[tokio::test]
#[serial]
async fn test_on_then_after_execution_order() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new("phases", &[("main_step", false, None)]);

  flow.after("main_step", create_simple_handler("after_main", "After;"));
  flow.on("main_step", create_simple_handler("on_main", "On;"));

  let ctx = ContextData::new(TestContext::default());
  flow.run(ctx.clone()).await.unwrap();

  let guard = ctx.read();
  assert_eq!(guard.message, "On;After;");
  assert_eq!(guard.steps_executed, vec!["on_main", "after_main"]);
}

#[test]
#[should_panic(expected = "Step not found")]
fn test_registering_unknown_step_panics() {
  let mut flow = Flow::<TestContext, TestError>::new("typo", &[("known", false, None)]);
  flow.on("unknown", create_simple_handler("unknown", ""));
}

#[tokio::test]
#[serial]
async fn test_context_data_is_shared_across_steps_and_awaits() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new("shared", &[("write", false, None), ("read_modify", false, None)]);

  flow.on("write", |ctx: ContextData<TestContext>| async move {
    let mut guard = ctx.write();
    guard.counter = 10;
    guard.message = "SetByStep1".to_string();
    Ok::<_, TestError>(FlowControl::Continue)
  });

  flow.on("read_modify", |ctx: ContextData<TestContext>| async move {
    let initial = ctx.read().counter;
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    let mut guard = ctx.write();
    guard.counter = initial + 5;
    guard.message.push_str("_ThenStep2");
    Ok::<_, TestError>(FlowControl::Continue)
  });

  let ctx = ContextData::new(TestContext::default());
  flow.run(ctx.clone()).await.unwrap();

  let guard = ctx.read();
  assert_eq!(guard.counter, 15);
  assert_eq!(guard.message, "SetByStep1_ThenStep2");
}

#[test]
fn test_step_names_in_declaration_order() {
  let flow = Flow::<TestContext, TestError>::new("names", &[("a", false, None), ("b", true, None)]);
  assert_eq!(flow.name(), "names");
  assert_eq!(flow.step_names(), vec!["a", "b"]);
}
