// relay_bot/src/errors.rs

use thiserror::Error;

/// Start-up failures. Once the engine is running, per-event errors are handled
/// inside the engine and never reach this type.
#[derive(Debug, Error)]
pub enum AppError {
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("I/O Error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Spreadsheet file is not valid JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Order engine could not start: {0:#}")]
  Engine(anyhow::Error),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
