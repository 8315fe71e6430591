// order_relay/src/flow/mod.rs

//! A small step-based async flow engine.
//!
//! A `Flow<TData, Err>` is an ordered list of named steps. Each step owns a list
//! of `on` handlers and a list of `after` handlers that operate on a shared
//! `ContextData<TData>`. The intake and slip-redemption paths of the order
//! engine are both expressed as flows so every step is traced and can halt the
//! remainder of the run.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod step;

pub use context_data::ContextData;
pub use control::{FlowControl, FlowOutcome};
pub use definition::{Flow, Handler};
pub use step::{SkipCondition, StepDef};
