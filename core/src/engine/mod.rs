// order_relay/src/engine/mod.rs

//! `OrderEngine`: owns all shared order state and turns inbound chat events
//! into flow runs and router calls.
//!
//! Errors are contained per event. `handle_event` never fails; a rejection is
//! replied to in the originating channel and anything else is logged.

pub mod admin;
pub mod intake;
pub mod redemption;
pub mod router;
pub mod state;

use crate::aggregator::{duration_until_next_midnight, DeliveryLedger, DeliverySummary, DriverSummary};
use crate::activity::ActivityLog;
use crate::clock::{Clock, SystemClock};
use crate::config::{Channels, EngineSettings};
use crate::duplicate::OrderHistory;
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::flow::{ContextData, Flow, FlowOutcome};
use crate::inventory::InventoryLedger;
use crate::pending::{self, PendingOrderStore};
use crate::sequencer::{CounterStore, MemoryCounterStore, OrderSequencer};
use crate::sheets::Spreadsheet;
use crate::stage::StageTracker;
use crate::transport::{ChatTransport, Content, InboundEvent, InboundMessage, OutgoingText};
use admin::Command;
use chrono::NaiveDate;
use intake::IntakeCtx;
use redemption::RedemptionCtx;
use state::EngineState;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

pub struct OrderEngineBuilder {
  channels: Channels,
  transport: Arc<dyn ChatTransport>,
  sheet: Arc<dyn Spreadsheet>,
  settings: EngineSettings,
  clock: Arc<dyn Clock>,
  counter_store: Box<dyn CounterStore>,
}

impl OrderEngineBuilder {
  pub fn new(channels: Channels, transport: Arc<dyn ChatTransport>, sheet: Arc<dyn Spreadsheet>) -> Self {
    Self {
      channels,
      transport,
      sheet,
      settings: EngineSettings::default(),
      clock: Arc::new(SystemClock),
      counter_store: Box::new(MemoryCounterStore::new()),
    }
  }

  pub fn settings(mut self, settings: EngineSettings) -> Self {
    self.settings = settings;
    self
  }

  pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn counter_store(mut self, store: Box<dyn CounterStore>) -> Self {
    self.counter_store = store;
    self
  }

  /// Fails when the counter store holds a value that cannot be read.
  pub fn build(self) -> anyhow::Result<OrderEngine> {
    let settings = self.settings;
    let sequencer = OrderSequencer::load(self.counter_store)?;
    let state = EngineState {
      channels: self.channels,
      transport: self.transport,
      clock: self.clock,
      inventory: InventoryLedger::new(Arc::clone(&self.sheet)),
      activity: ActivityLog::new(self.sheet),
      history: OrderHistory::new(settings.duplicate_window, settings.duplicate_threshold),
      pending: Arc::new(PendingOrderStore::new(settings.redemption_window)),
      sequencer,
      ledger: DeliveryLedger::new(),
      stages: StageTracker::new(),
      settings,
    };
    Ok(OrderEngine {
      state: Arc::new(state),
      intake: intake::intake_flow(),
      redemption: redemption::redemption_flow(),
    })
  }
}

pub struct OrderEngine {
  state: Arc<EngineState>,
  intake: Flow<IntakeCtx, FulfillmentError>,
  redemption: Flow<RedemptionCtx, FulfillmentError>,
}

impl OrderEngine {
  pub fn builder(channels: Channels, transport: Arc<dyn ChatTransport>, sheet: Arc<dyn Spreadsheet>) -> OrderEngineBuilder {
    OrderEngineBuilder::new(channels, transport, sheet)
  }

  pub fn settings(&self) -> &EngineSettings {
    &self.state.settings
  }

  pub fn channels(&self) -> &Channels {
    &self.state.channels
  }

  pub fn pending(&self) -> &PendingOrderStore {
    &self.state.pending
  }

  pub fn history(&self) -> &OrderHistory {
    &self.state.history
  }

  pub fn sequencer(&self) -> &OrderSequencer {
    &self.state.sequencer
  }

  pub fn ledger(&self) -> &DeliveryLedger {
    &self.state.ledger
  }

  pub fn stages(&self) -> &StageTracker {
    &self.state.stages
  }

  pub fn today_order_count(&self) -> usize {
    self.state.ledger.confirmed_orders_on(self.state.clock.now().date_naive())
  }

  /// Processes one inbound event to completion.
  #[instrument(name = "OrderEngine::handle_event", skip_all)]
  pub async fn handle_event(&self, event: InboundEvent) {
    match event {
      InboundEvent::Callback(query) => {
        if let Err(e) = router::accept_job(&self.state, &query).await {
          error!(error = %e, "Callback handling failed.");
        }
      }
      InboundEvent::Message(msg) => {
        if let Err(e) = self.dispatch(&msg).await {
          self.state.report(&msg, &e).await;
        }
      }
    }
  }

  async fn dispatch(&self, msg: &InboundMessage) -> FulfillmentResult<()> {
    let channels = &self.state.channels;
    let channel = msg.channel();

    if let Some(command) = msg.text().and_then(Command::parse) {
      debug!(?command, "Command received.");
      return admin::run(&self.state, command, msg).await;
    }

    match &msg.content {
      Content::Text(text) if channel == channels.intake => {
        if msg.reply_to.is_some() && text.starts_with(self.state.settings.billing_prefix.as_str()) {
          router::forward_invoice(&self.state, msg, text).await
        } else {
          self.submit_order(msg, text).await
        }
      }
      Content::Photo { .. } if channel == channels.intake => self.redeem_slip(msg).await,
      Content::Photo { .. } if channel == channels.packing => router::forward_to_dispatch(&self.state, msg).await,
      Content::Photo { .. } if channel == channels.dispatch => router::close_job(&self.state, msg).await,
      _ => {
        trace!(channel = channel.0, "Event not routed.");
        Ok(())
      }
    }
  }

  async fn submit_order(&self, msg: &InboundMessage, text: &str) -> FulfillmentResult<()> {
    let ctx = ContextData::new(IntakeCtx::new(Arc::clone(&self.state), msg.clone(), text.to_string()));
    let outcome = self.intake.run(ctx).await?;
    debug!(?outcome, "Intake flow finished.");
    Ok(())
  }

  async fn redeem_slip(&self, msg: &InboundMessage) -> FulfillmentResult<()> {
    let ctx = ContextData::new(RedemptionCtx::new(Arc::clone(&self.state), msg.clone()));
    if let FlowOutcome::Halted = self.redemption.run(ctx).await? {
      trace!(sender = %msg.sender.id, "Photo without a pending order ignored.");
    }
    Ok(())
  }

  /// Posts and logs the delivery and per-driver summaries for `date`, then
  /// clears the delivery entries that were summarized.
  #[instrument(name = "OrderEngine::run_daily_summary", skip(self))]
  pub async fn run_daily_summary(&self, date: NaiveDate) -> (DeliverySummary, Option<DriverSummary>) {
    let state = &self.state;
    let iso_date = date.format("%Y-%m-%d").to_string();

    let deliveries = state.ledger.delivery_summary(date);
    state
      .activity
      .log_daily_orders(&iso_date, deliveries.count, deliveries.total)
      .await;
    state
      .post(OutgoingText::plain(state.channels.completion, deliveries.text.clone()))
      .await;

    let drivers = state.ledger.driver_summary(date);
    if let Some(summary) = &drivers {
      state
        .post(OutgoingText::plain(state.channels.completion, summary.text.clone()))
        .await;
      state.activity.log_driver_summary(&iso_date, &summary.text).await;
    }

    state.ledger.clear_deliveries(deliveries.count);
    info!(deliveries = deliveries.count, total = deliveries.total, "Daily summary posted.");
    (deliveries, drivers)
  }

  /// Background sweep of expired pending orders.
  pub fn spawn_sweeper(&self) -> JoinHandle<()> {
    pending::spawn_sweeper(
      Arc::clone(&self.state.pending),
      Arc::clone(&self.state.clock),
      self.state.settings.sweep_interval,
    )
  }

  /// Runs the daily summary at every local midnight for the day that just
  /// ended. A day is summarized at most once, even when the wall clock is
  /// set back and the timer fires before midnight.
  pub fn spawn_daily_summary(self: Arc<Self>) -> JoinHandle<()> {
    tokio::spawn(async move {
      let mut last_summarized: Option<NaiveDate> = None;
      loop {
        let now = self.state.clock.now();
        let ending_day = now.date_naive();
        let wait = duration_until_next_midnight(now);
        debug!(wait_secs = wait.as_secs(), %ending_day, "Daily summary scheduled.");
        tokio::time::sleep(wait).await;
        if last_summarized == Some(ending_day) {
          warn!(%ending_day, "Day already summarized, skipping.");
          continue;
        }
        self.run_daily_summary(ending_day).await;
        last_summarized = Some(ending_day);
      }
    })
  }
}
