// order_relay/src/sequencer.rs

//! Durable, monotonic order ids.

use crate::order::OrderId;
use anyhow::Context;
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Stable storage for the single counter value.
pub trait CounterStore: Send + Sync {
  /// `None` when nothing has been stored yet.
  fn load(&self) -> anyhow::Result<Option<u64>>;
  fn save(&self, value: u64) -> anyhow::Result<()>;
}

/// Counter kept as a decimal string in a file. Writes go to a sibling temp
/// file that is then renamed over the target.
#[derive(Debug, Clone)]
pub struct FileCounterStore {
  path: PathBuf,
}

impl FileCounterStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl CounterStore for FileCounterStore {
  fn load(&self) -> anyhow::Result<Option<u64>> {
    if !self.path.exists() {
      return Ok(None);
    }
    let raw = fs::read_to_string(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
    let value = raw
      .trim()
      .parse()
      .with_context(|| format!("{} does not hold a counter: {raw:?}", self.path.display()))?;
    Ok(Some(value))
  }

  fn save(&self, value: u64) -> anyhow::Result<()> {
    let tmp = self.path.with_extension("tmp");
    fs::write(&tmp, value.to_string()).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, &self.path).with_context(|| format!("replacing {}", self.path.display()))?;
    Ok(())
  }
}

#[derive(Debug, Default)]
pub struct MemoryCounterStore {
  value: Mutex<Option<u64>>,
}

impl MemoryCounterStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_value(value: u64) -> Self {
    Self {
      value: Mutex::new(Some(value)),
    }
  }

  pub fn stored(&self) -> Option<u64> {
    *self.value.lock()
  }
}

impl CounterStore for MemoryCounterStore {
  fn load(&self) -> anyhow::Result<Option<u64>> {
    Ok(*self.value.lock())
  }

  fn save(&self, value: u64) -> anyhow::Result<()> {
    *self.value.lock() = Some(value);
    Ok(())
  }
}

/// Hands out order ids. The counter always holds the *next* id to issue.
///
/// Increment and persist happen in one critical section, so concurrent callers
/// never see the same id. A failed save is logged; the in-memory counter still
/// advances.
pub struct OrderSequencer {
  counter: Mutex<u64>,
  store: Box<dyn CounterStore>,
}

impl OrderSequencer {
  /// Starts from the stored value, or 1 when nothing has been stored yet. A
  /// store that exists but cannot be read is an error: restarting at 1 would
  /// reissue ids.
  pub fn load(store: Box<dyn CounterStore>) -> anyhow::Result<Self> {
    let start = store.load().context("loading order counter")?.unwrap_or(1);
    info!(next = start, "Order sequencer ready.");
    Ok(Self {
      counter: Mutex::new(start),
      store,
    })
  }

  fn persist(&self, value: u64) {
    if let Err(e) = self.store.save(value) {
      error!(value, error = %e, "Failed to persist order counter.");
    }
  }

  pub fn next(&self) -> OrderId {
    let mut counter = self.counter.lock();
    let id = OrderId(*counter);
    *counter += 1;
    self.persist(*counter);
    id
  }

  /// Steps the counter back only when `id` was the most recently issued id.
  pub fn rollback(&self, id: OrderId) -> bool {
    let mut counter = self.counter.lock();
    if *counter != id.value() + 1 {
      warn!(%id, next = *counter, "Not the latest order, counter left unchanged.");
      return false;
    }
    *counter -= 1;
    self.persist(*counter);
    info!(%id, "Order counter rolled back.");
    true
  }

  pub fn reset(&self) {
    let mut counter = self.counter.lock();
    *counter = 1;
    self.persist(1);
    info!("Order counter reset to 1.");
  }

  /// The id the next call to `next` will return.
  pub fn current(&self) -> u64 {
    *self.counter.lock()
  }
}
