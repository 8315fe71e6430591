// order_relay/src/stage.rs
use crate::order::OrderId;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Where an order last showed up in the channel pipeline. Kept for
/// observability; routing never consults it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStage {
  Submitted,
  Packed,
  Dispatched,
  Accepted,
  Completed,
  Billed,
  Cancelled,
}

#[derive(Debug, Default)]
pub struct StageTracker {
  stages: Mutex<HashMap<OrderId, OrderStage>>,
}

impl StageTracker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn advance(&self, order_id: OrderId, stage: OrderStage) {
    let previous = self.stages.lock().insert(order_id, stage);
    debug!(%order_id, ?previous, ?stage, "Order stage updated.");
  }

  pub fn stage_of(&self, order_id: OrderId) -> Option<OrderStage> {
    self.stages.lock().get(&order_id).copied()
  }
}
