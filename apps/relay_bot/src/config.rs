// relay_bot/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use order_relay::{ChannelId, Channels, EngineSettings};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub channels: Channels,
  pub order_id_file: PathBuf,
  pub spreadsheet_path: PathBuf,
  pub settings: EngineSettings,
  pub log_json: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let channel = |name: &str| -> Result<ChannelId> {
      let raw = lookup(name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{name}'")))?;
      parse::<i64>(name, &raw).map(ChannelId)
    };
    let seconds = |name: &str, default: Duration| -> Result<Duration> {
      match lookup(name) {
        Some(raw) => parse::<u64>(name, &raw).map(Duration::from_secs),
        None => Ok(default),
      }
    };

    let channels = Channels {
      intake: channel("GROUP_RECEIVE_ORDER")?,
      packing: channel("GROUP_PACK")?,
      dispatch: channel("GROUP_DROP")?,
      completion: channel("GROUP_FINISH")?,
      billing: channel("GROUP_BILL")?,
    };

    let defaults = EngineSettings::default();
    let settings = EngineSettings {
      redemption_window: seconds("PENDING_TIMEOUT_SECS", defaults.redemption_window)?,
      sweep_interval: seconds("SWEEP_INTERVAL_SECS", defaults.sweep_interval)?,
      notice_ttl: seconds("NOTICE_TTL_SECS", defaults.notice_ttl)?,
      ..defaults
    };
    if settings.sweep_interval.is_zero() {
      return Err(AppError::Config("SWEEP_INTERVAL_SECS must be positive".to_string()));
    }

    let log_json = match lookup("RELAY_LOG_JSON") {
      Some(raw) => parse::<bool>("RELAY_LOG_JSON", &raw)?,
      None => false,
    };

    Ok(Self {
      channels,
      order_id_file: lookup("ORDER_ID_FILE").unwrap_or_else(|| "order_id.txt".to_string()).into(),
      spreadsheet_path: lookup("SPREADSHEET_PATH")
        .unwrap_or_else(|| "orders_sheet.json".to_string())
        .into(),
      settings,
      log_json,
    })
  }
}

fn parse<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse()
    .map_err(|e| AppError::Config(format!("Invalid {name}: {e}")))
}
