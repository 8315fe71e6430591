// order_relay/src/clock.rs
use chrono::{DateTime, Duration, Local};
use parking_lot::Mutex;

/// Source of wall-clock time for expiry checks, timestamps and the daily
/// schedule.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Local> {
    Local::now()
  }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<DateTime<Local>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Local>) -> Self {
    Self { now: Mutex::new(start) }
  }

  pub fn advance(&self, by: Duration) {
    *self.now.lock() += by;
  }

  pub fn set(&self, to: DateTime<Local>) {
    *self.now.lock() = to;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Local> {
    *self.now.lock()
  }
}
