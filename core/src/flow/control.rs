// order_relay/src/flow/control.rs

/// Returned by a handler: keep going, or stop the whole flow here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
  Continue,
  /// No further handlers in this step or any later step run.
  Halt,
}

/// How a flow run ended when no handler returned an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  Completed,
  Halted,
}
