// order_relay/src/config.rs
use crate::transport::ChannelId;
use std::time::Duration;

/// Tunables of the order engine. The defaults are what the shop runs with.
#[derive(Debug, Clone)]
pub struct EngineSettings {
  /// How long a pending order waits for its slip. Authoritative for expiry.
  pub redemption_window: Duration,
  pub sweep_interval: Duration,
  /// Lifetime of transient notices in the channel before they are deleted.
  pub notice_ttl: Duration,
  pub duplicate_window: usize,
  pub duplicate_threshold: f64,
  pub shipping_discount: u32,
  pub billing_prefix: String,
  pub accept_token_prefix: String,
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      redemption_window: Duration::from_secs(180),
      sweep_interval: Duration::from_secs(60),
      notice_ttl: Duration::from_secs(300),
      duplicate_window: 30,
      duplicate_threshold: 0.75,
      shipping_discount: 20,
      billing_prefix: "SO-".to_string(),
      accept_token_prefix: "รับงาน_".to_string(),
    }
  }
}

/// The five stage channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
  pub intake: ChannelId,
  pub packing: ChannelId,
  pub dispatch: ChannelId,
  pub completion: ChannelId,
  pub billing: ChannelId,
}
