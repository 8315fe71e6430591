// order_relay/src/order.rs

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Durable order identifier issued by the `OrderSequencer`.
///
/// Rendered zero-padded to at least two digits (`07`, `123`), and embedded in
/// channel messages as the `#ORDER<id>` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl OrderId {
  pub fn value(self) -> u64 {
    self.0
  }

  /// `#ORDER07`
  pub fn marker(self) -> String {
    format!("#ORDER{self}")
  }

  /// `ORDER07`, the form used in the customer-info log.
  pub fn label(self) -> String {
    format!("ORDER{self}")
  }
}

impl fmt::Display for OrderId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}", self.0)
  }
}

/// One requested line item. Brand and flavor are stored in normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
  pub category: String,
  pub brand: String,
  pub flavor: String,
  pub quantity: u32,
}

/// A confirmed order, created when a slip redeems a pending order.
#[derive(Debug, Clone)]
pub struct OrderRecord {
  pub order_id: OrderId,
  /// Text as forwarded to packing, after the shipping discount.
  pub submission_text: String,
  pub items: Vec<OrderItem>,
  pub timestamp: DateTime<Local>,
}
