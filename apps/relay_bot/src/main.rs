// relay_bot/src/main.rs

mod bridge;
mod config;
mod errors;
mod sheet_file;

use crate::bridge::{read_events, StdioBridge};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::sheet_file::JsonFileSpreadsheet;

use order_relay::{FileCounterStore, OrderEngine};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const WRITER_DRAIN: Duration = Duration::from_secs(2);

/// Diagnostics go to stderr; stdout carries bridge output.
fn init_tracing(json: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE) // Log when spans close, showing duration
    .with_writer(std::io::stderr);
  if json {
    builder.json().init();
  } else {
    builder.init();
  }
}

/// Spawns an event task after collecting the ones already finished, so the
/// set only ever holds tasks still running.
fn spawn_event<F>(in_flight: &mut JoinSet<()>, task: F)
where
  F: Future<Output = ()> + Send + 'static,
{
  while let Some(joined) = in_flight.try_join_next() {
    if let Err(e) = joined {
      tracing::error!(error = %e, "Event task failed.");
    }
  }
  in_flight.spawn(task);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let app_config = AppConfig::from_env()?;
  init_tracing(app_config.log_json);
  tracing::info!(
    order_id_file = %app_config.order_id_file.display(),
    spreadsheet = %app_config.spreadsheet_path.display(),
    "Application configuration loaded successfully."
  );
  tracing::info!("Starting order relay...");

  let sheet = Arc::new(JsonFileSpreadsheet::open(&app_config.spreadsheet_path).await?);
  let (transport, writer) = StdioBridge::new(tokio::io::stdout());

  let engine = Arc::new(
    OrderEngine::builder(app_config.channels, Arc::new(transport), sheet)
      .settings(app_config.settings.clone())
      .counter_store(Box::new(FileCounterStore::new(&app_config.order_id_file)))
      .build()
      .map_err(AppError::Engine)?,
  );
  tracing::info!(next_order = engine.sequencer().current(), "Order engine ready.");

  let sweeper = engine.spawn_sweeper();
  let daily = Arc::clone(&engine).spawn_daily_summary();

  let mut in_flight = JoinSet::new();
  let reader = read_events(tokio::io::stdin(), |event| {
    let engine = Arc::clone(&engine);
    spawn_event(&mut in_flight, async move { engine.handle_event(event).await });
  });

  tokio::select! {
    result = reader => match result {
      Ok(()) => tracing::info!("Input closed."),
      Err(e) => tracing::error!(error = %e, "Failed to read input."),
    },
    _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted."),
  }

  while let Some(joined) = in_flight.join_next().await {
    if let Err(e) = joined {
      tracing::error!(error = %e, "Event task failed.");
    }
  }
  sweeper.abort();
  daily.abort();

  // Pending notice deletions still hold the transport, so the writer is only
  // given a moment to drain what was already queued.
  drop(engine);
  match tokio::time::timeout(WRITER_DRAIN, writer).await {
    Ok(Err(e)) => tracing::error!(error = %e, "Bridge writer failed."),
    Ok(Ok(())) => {}
    Err(_) => tracing::debug!("Bridge writer still open at shutdown."),
  }
  tracing::info!("Order relay stopped.");
  Ok(())
}
