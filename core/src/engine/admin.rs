// order_relay/src/engine/admin.rs

//! Slash commands available in every channel.

use crate::engine::router::NOT_AN_ORDER;
use crate::engine::state::EngineState;
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::extract;
use crate::parser;
use crate::stage::OrderStage;
use crate::transport::InboundMessage;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  Summary,
  ResetOrder,
  CancelOrder,
}

impl Command {
  /// `/summary`, `/resetorder`, `/cancelorder`, optionally addressed as
  /// `/summary@botname`.
  pub fn parse(text: &str) -> Option<Self> {
    let first = text.split_whitespace().next()?.strip_prefix('/')?;
    let name = first.split('@').next().unwrap_or(first);
    match name {
      "summary" => Some(Command::Summary),
      "resetorder" => Some(Command::ResetOrder),
      "cancelorder" => Some(Command::CancelOrder),
      _ => None,
    }
  }
}

pub async fn run(state: &EngineState, command: Command, msg: &InboundMessage) -> FulfillmentResult<()> {
  match command {
    Command::Summary => {
      let count = state.ledger.confirmed_orders_on(state.clock.now().date_naive());
      state.reply(msg, format!("📊 ออเดอร์วันนี้: {count} รายการ")).await;
      Ok(())
    }
    Command::ResetOrder => {
      state.sequencer.reset();
      state.reply(msg, "🔁 รีเซ็ตเลขออเดอร์เป็น 1 แล้ว ✅").await;
      Ok(())
    }
    Command::CancelOrder => cancel_order(state, msg).await,
  }
}

/// Deletes the replied order message, restocks its items and rolls the
/// counter back when it was the latest order.
#[instrument(name = "admin::cancel_order", skip_all, fields(sender = %msg.sender.id))]
pub async fn cancel_order(state: &EngineState, msg: &InboundMessage) -> FulfillmentResult<()> {
  let Some(reply) = msg.reply_to.as_ref() else {
    return Err(FulfillmentError::Correlation(
      "กรุณา reply ข้อความออเดอร์ที่ต้องการยกเลิก".to_string(),
    ));
  };
  let body = reply.body().unwrap_or_default();
  if !extract::contains_order_marker(body) {
    return Err(FulfillmentError::Correlation(NOT_AN_ORDER.to_string()));
  }
  let Some(order_id) = extract::order_id_in(body) else {
    return Err(FulfillmentError::Correlation("ไม่พบเลขออเดอร์ในข้อความ".to_string()));
  };

  if let Err(e) = state.transport.delete_message(&reply.message).await {
    error!(%order_id, error = %e, "Failed to delete cancelled order message.");
  }

  let items = parser::parse_items(body);
  let restocked = state.inventory.restock(&items).await;
  let rolled_back = state.sequencer.rollback(order_id);
  state.stages.advance(order_id, OrderStage::Cancelled);
  info!(%order_id, restocked, rolled_back, "Order cancelled.");

  state
    .reply(msg, format!("❌ ยกเลิกออเดอร์ {} แล้ว และคืนสต็อกเรียบร้อย", order_id.marker()))
    .await;
  Ok(())
}
