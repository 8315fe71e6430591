// order_relay/src/flow/definition.rs

//! `Flow<TData, Err>` construction and handler registration.

use crate::error::FlowError;
use crate::flow::context_data::ContextData;
use crate::flow::control::FlowControl;
use crate::flow::step::{SkipCondition, StepDef};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// A registered step handler.
///
/// Takes a clone of the run's `ContextData<TData>` and resolves to the flow
/// control signal, or to the flow's error type which aborts the run.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<FlowControl, Err>> + Send>> + Send + Sync,
>;

pub struct Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: &'static str,
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a flow from `(step name, optional, skip condition)` triples, in
  /// execution order.
  pub fn new(name: &'static str, step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step_name, optional, skip_if)| StepDef {
        name: (*step_name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      name,
      steps,
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Panics on an unknown step: handler registration happens once at engine
  /// construction, so a typo is a programming error.
  fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "flow '{}' setup error: {}",
        self.name,
        FlowError::StepNotFound {
          step_name: step_name.to_string()
        }
      );
    }
  }

  /// Registers an `on` handler for `step_name`.
  pub fn on<F, UserErr>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<FlowControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler: Handler<TData, Err> = Box::new(move |ctx_data| {
      let fut = handler_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.on.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Registers an `after` handler, run once every `on` handler of the step
  /// has continued.
  pub fn after<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<FlowControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler: Handler<TData, Err> = Box::new(move |ctx_data| {
      let fut = handler_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.after.entry(step_name.to_string()).or_default().push(handler);
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) {
    self.ensure_step_exists(step_name);
    if let Some(step) = self.steps.iter_mut().find(|s| s.name == step_name) {
      step.skip_if = skip_if;
    }
  }
}
