// order_relay/src/pending.rs

//! One outstanding order per submitter, waiting for a payment slip.
//!
//! Every operation takes the map lock once and releases it before returning,
//! so callers never hold it across I/O.

use crate::clock::Clock;
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::order::OrderItem;
use crate::transport::UserId;
use chrono::{DateTime, Duration as ChronoDuration, Local};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PendingOrder {
  pub submitter: UserId,
  pub raw_text: String,
  pub display_name: String,
  pub items: Vec<OrderItem>,
  pub admitted_at: DateTime<Local>,
}

impl PendingOrder {
  pub fn elapsed(&self, now: DateTime<Local>) -> ChronoDuration {
    now - self.admitted_at
  }

  /// Expired strictly after the window; a slip exactly at the limit is on time.
  pub fn is_expired(&self, now: DateTime<Local>, window: Duration) -> bool {
    // A negative elapsed time (clock stepped back) is never expired.
    self.elapsed(now).to_std().is_ok_and(|elapsed| elapsed > window)
  }
}

pub struct PendingOrderStore {
  orders: Mutex<HashMap<UserId, PendingOrder>>,
  window: Duration,
}

impl PendingOrderStore {
  pub fn new(window: Duration) -> Self {
    Self {
      orders: Mutex::new(HashMap::new()),
      window,
    }
  }

  pub fn window(&self) -> Duration {
    self.window
  }

  /// Check-and-insert under one lock. Refused while the submitter already has
  /// an order pending, expired or not: only the sweep or a redemption frees the
  /// slot.
  pub fn admit(&self, order: PendingOrder) -> FulfillmentResult<()> {
    let mut orders = self.orders.lock();
    if orders.contains_key(&order.submitter) {
      return Err(FulfillmentError::ConcurrentSubmission {
        submitter: order.submitter,
      });
    }
    info!(submitter = %order.submitter, items = order.items.len(), "Order admitted, waiting for slip.");
    orders.insert(order.submitter, order);
    Ok(())
  }

  /// Removes and returns the submitter's pending order.
  pub fn take(&self, submitter: UserId) -> Option<PendingOrder> {
    self.orders.lock().remove(&submitter)
  }

  pub fn is_pending(&self, submitter: UserId) -> bool {
    self.orders.lock().contains_key(&submitter)
  }

  pub fn len(&self) -> usize {
    self.orders.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Drops every order past the window and returns the freed submitters.
  pub fn sweep_expired(&self, now: DateTime<Local>) -> Vec<UserId> {
    let mut orders = self.orders.lock();
    let expired: Vec<UserId> = orders
      .values()
      .filter(|order| order.is_expired(now, self.window))
      .map(|order| order.submitter)
      .collect();
    for submitter in &expired {
      orders.remove(submitter);
    }
    if !expired.is_empty() {
      info!(count = expired.len(), "Expired pending orders swept.");
    }
    expired
  }
}

/// Runs `sweep_expired` every `every` until the task is aborted.
pub fn spawn_sweeper(store: Arc<PendingOrderStore>, clock: Arc<dyn Clock>, every: Duration) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut timer = interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      timer.tick().await;
      let freed = store.sweep_expired(clock.now());
      debug!(freed = freed.len(), remaining = store.len(), "Pending sweep tick.");
    }
  })
}
