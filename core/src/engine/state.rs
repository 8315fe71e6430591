// order_relay/src/engine/state.rs

//! Everything the event handlers share, plus the small reply helpers they all
//! use.

use crate::aggregator::DeliveryLedger;
use crate::activity::ActivityLog;
use crate::clock::Clock;
use crate::config::{Channels, EngineSettings};
use crate::duplicate::OrderHistory;
use crate::error::FulfillmentError;
use crate::inventory::InventoryLedger;
use crate::pending::PendingOrderStore;
use crate::sequencer::OrderSequencer;
use crate::stage::StageTracker;
use crate::transport::{ChatTransport, InboundMessage, MessageRef, OutgoingText};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct EngineState {
  pub settings: EngineSettings,
  pub channels: Channels,
  pub transport: Arc<dyn ChatTransport>,
  pub clock: Arc<dyn Clock>,
  pub inventory: InventoryLedger,
  pub activity: ActivityLog,
  pub history: OrderHistory,
  pub pending: Arc<PendingOrderStore>,
  pub sequencer: OrderSequencer,
  pub ledger: DeliveryLedger,
  pub stages: StageTracker,
}

impl EngineState {
  /// Posts `text` as a reply to `to` in its own channel. Transport failures
  /// are logged and yield `None`.
  pub async fn reply(&self, to: &InboundMessage, text: impl Into<String>) -> Option<MessageRef> {
    let outgoing = OutgoingText::plain(to.channel(), text).replying_to(to.message.id);
    self.post(outgoing).await
  }

  /// A reply that is deleted again after the notice lifetime.
  pub async fn reply_transient(&self, to: &InboundMessage, text: impl Into<String>) -> Option<MessageRef> {
    let sent = self.reply(to, text).await?;
    self.schedule_deletion(sent);
    Some(sent)
  }

  pub async fn post(&self, outgoing: OutgoingText) -> Option<MessageRef> {
    let channel = outgoing.channel;
    match self.transport.post_text(outgoing).await {
      Ok(sent) => Some(sent),
      Err(e) => {
        error!(channel = channel.0, error = %e, "Failed to post message.");
        None
      }
    }
  }

  /// Best effort: the message may already be gone by the time the timer fires.
  pub fn schedule_deletion(&self, message: MessageRef) {
    let transport = Arc::clone(&self.transport);
    let after = self.settings.notice_ttl;
    tokio::spawn(async move {
      tokio::time::sleep(after).await;
      if let Err(e) = transport.delete_message(&message).await {
        debug!(message_id = message.id.0, error = %e, "Transient notice already gone.");
      }
    });
  }

  /// Replies with the error's notice, or logs it when it has none.
  pub async fn report(&self, to: &InboundMessage, err: &FulfillmentError) {
    let Some(notice) = err.user_notice() else {
      error!(error = %err, "Event failed.");
      return;
    };
    warn!(sender = %to.sender.id, error = %err, "Event rejected.");
    if err.is_transient_notice() {
      self.reply_transient(to, notice).await;
    } else {
      self.reply(to, notice).await;
    }
  }
}
