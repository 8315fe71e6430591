// order_relay/src/flow/execution.rs

//! `Flow::run`: executes steps in order against one shared context.

use crate::error::FlowError;
use crate::flow::context_data::ContextData;
use crate::flow::control::{FlowControl, FlowOutcome};
use crate::flow::definition::{Flow, Handler};
use crate::flow::step::StepDef;
use tracing::{event, instrument, span, Instrument, Level};

enum StepResult {
  Continue,
  Halted,
}

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx_data`.
  ///
  /// A handler error aborts the run and is returned as-is. A non-optional step
  /// with no handlers at all fails with `FlowError::HandlerMissing`.
  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(flow = self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<FlowOutcome, Err> {
    event!(Level::DEBUG, "Flow run starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = span!(Level::DEBUG, "flow_step", step_name = step_def.name.as_str(), step_index = step_idx);
      if let StepResult::Halted = self.run_step(step_def, &ctx_data).instrument(step_span).await? {
        event!(Level::DEBUG, step_name = step_def.name.as_str(), "Flow halted.");
        return Ok(FlowOutcome::Halted);
      }
    }

    event!(Level::DEBUG, "Flow run completed.");
    Ok(FlowOutcome::Completed)
  }

  async fn run_step(&self, step_def: &StepDef<TData>, ctx_data: &ContextData<TData>) -> Result<StepResult, Err> {
    let step_name = step_def.name.as_str();

    if let Some(skip_if) = &step_def.skip_if {
      if skip_if(ctx_data.clone()) {
        event!(Level::DEBUG, "Step skipped by its skip condition.");
        return Ok(StepResult::Continue);
      }
    }

    let on_handlers = self.on.get(step_name).filter(|v| !v.is_empty());
    let after_handlers = self.after.get(step_name).filter(|v| !v.is_empty());

    if on_handlers.is_none() && after_handlers.is_none() {
      if step_def.optional {
        event!(Level::TRACE, "Optional step has no handlers.");
        return Ok(StepResult::Continue);
      }
      event!(Level::ERROR, "Non-optional step has no handlers.");
      return Err(Err::from(FlowError::HandlerMissing {
        step_name: step_def.name.clone(),
      }));
    }

    for (phase, handlers) in [("on", on_handlers), ("after", after_handlers)] {
      let Some(handlers) = handlers else { continue };
      if let StepResult::Halted = run_handlers(phase, handlers, ctx_data).await? {
        return Ok(StepResult::Halted);
      }
    }
    Ok(StepResult::Continue)
  }
}

async fn run_handlers<TData, Err>(
  phase: &'static str,
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
) -> Result<StepResult, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for handler_fn in handlers {
    match handler_fn(ctx_data.clone()).await {
      Ok(FlowControl::Continue) => {}
      Ok(FlowControl::Halt) => return Ok(StepResult::Halted),
      Err(e) => {
        event!(Level::DEBUG, phase, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(StepResult::Continue)
}
