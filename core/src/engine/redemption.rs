// order_relay/src/engine/redemption.rs

//! A slip photo in the intake channel confirms the sender's pending order.

use crate::activity::OrderDetails;
use crate::engine::state::EngineState;
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::extract::{self, NOT_FOUND};
use crate::flow::{ContextData, Flow, FlowControl};
use crate::order::{OrderId, OrderRecord};
use crate::pending::PendingOrder;
use crate::stage::OrderStage;
use crate::transport::{InboundMessage, OutgoingText};
use std::sync::Arc;
use tracing::{info, warn};

pub struct RedemptionCtx {
  pub state: Arc<EngineState>,
  pub message: InboundMessage,
  pub pending: Option<PendingOrder>,
  pub order_id: Option<OrderId>,
  /// Order text after the shipping discount.
  pub forwarded_text: Option<String>,
  pub shipping_price: u32,
}

impl RedemptionCtx {
  pub fn new(state: Arc<EngineState>, message: InboundMessage) -> Self {
    Self {
      state,
      message,
      pending: None,
      order_id: None,
      forwarded_text: None,
      shipping_price: 0,
    }
  }

  fn pending_order(&self) -> FulfillmentResult<&PendingOrder> {
    self
      .pending
      .as_ref()
      .ok_or_else(|| FulfillmentError::Correlation("ไม่พบออเดอร์ที่รอแนบสลิป".to_string()))
  }
}

pub fn redemption_flow() -> Flow<RedemptionCtx, FulfillmentError> {
  let mut flow = Flow::<RedemptionCtx, FulfillmentError>::new(
    "redemption",
    &[
      ("claim_pending", false, None),
      ("enforce_window", false, None),
      ("commit_stock", false, None),
      ("assign_order_id", false, None),
      ("forward_to_packing", false, None),
      ("record_order", false, None),
    ],
  );

  // A photo from someone without a pending order is not a slip.
  flow.on("claim_pending", |ctx: ContextData<RedemptionCtx>| async move {
    let mut guard = ctx.write();
    let submitter = guard.message.sender.id;
    let Some(pending) = guard.state.pending.take(submitter) else {
      return Ok::<_, FulfillmentError>(FlowControl::Halt);
    };
    guard.pending = Some(pending);
    Ok(FlowControl::Continue)
  });

  flow.on("enforce_window", |ctx: ContextData<RedemptionCtx>| async move {
    let guard = ctx.read();
    let pending = guard.pending_order()?;
    let now = guard.state.clock.now();
    if pending.is_expired(now, guard.state.pending.window()) {
      let elapsed_secs = pending.elapsed(now).num_seconds();
      warn!(submitter = %pending.submitter, elapsed_secs, "Slip arrived after the window.");
      return Err(FulfillmentError::Expired { elapsed_secs });
    }
    Ok::<_, FulfillmentError>(FlowControl::Continue)
  });

  flow.on("commit_stock", |ctx: ContextData<RedemptionCtx>| async move {
    let (state, items) = {
      let guard = ctx.read();
      (Arc::clone(&guard.state), guard.pending_order()?.items.clone())
    };
    state.inventory.decrement(&items).await;
    Ok::<_, FulfillmentError>(FlowControl::Continue)
  });

  flow.on("assign_order_id", |ctx: ContextData<RedemptionCtx>| async move {
    let mut guard = ctx.write();
    let order_id = guard.state.sequencer.next();
    let today = guard.state.clock.now().date_naive();
    guard.state.ledger.record_confirmed_order(today);
    guard.state.stages.advance(order_id, OrderStage::Submitted);
    guard.order_id = Some(order_id);
    Ok::<_, FulfillmentError>(FlowControl::Continue)
  });

  flow.on("forward_to_packing", forward_to_packing);
  flow.on("record_order", record_order);
  flow
}

async fn forward_to_packing(ctx: ContextData<RedemptionCtx>) -> FulfillmentResult<FlowControl> {
  let (state, message, raw_text, display_name, order_id) = {
    let guard = ctx.read();
    let pending = guard.pending_order()?;
    let order_id = guard
      .order_id
      .ok_or_else(|| FulfillmentError::Correlation("order id was not assigned".to_string()))?;
    (
      Arc::clone(&guard.state),
      guard.message.clone(),
      pending.raw_text.clone(),
      pending.display_name.clone(),
      order_id,
    )
  };

  let (text, price) = extract::apply_shipping_discount(&raw_text, state.settings.shipping_discount);
  let date = state.clock.now().format("%d/%m/%Y").to_string();
  let announcement = format!(
    "📦 <b>ออเดอร์ใหม่</b> {} ({date}) โดย {display_name}\n\n{text}",
    order_id.marker()
  );

  // The order is committed at this point; a failed post is logged, not undone.
  state.post(OutgoingText::html(state.channels.packing, announcement)).await;
  state
    .reply(&message, format!("✅ ส่งออเดอร์ไปกลุ่มแพ็คงานแล้ว {}", order_id.marker()))
    .await;
  info!(%order_id, price, "Order confirmed and forwarded to packing.");

  let mut guard = ctx.write();
  guard.forwarded_text = Some(text);
  guard.shipping_price = price;
  Ok(FlowControl::Continue)
}

async fn record_order(ctx: ContextData<RedemptionCtx>) -> FulfillmentResult<FlowControl> {
  let (state, pending, order_id, text, price) = {
    let guard = ctx.read();
    let pending = guard.pending_order()?.clone();
    let order_id = guard
      .order_id
      .ok_or_else(|| FulfillmentError::Correlation("order id was not assigned".to_string()))?;
    let text = guard.forwarded_text.clone().unwrap_or_else(|| pending.raw_text.clone());
    (Arc::clone(&guard.state), pending, order_id, text, guard.shipping_price)
  };

  let now = state.clock.now();
  state.history.record(
    &pending.raw_text,
    OrderRecord {
      order_id,
      submission_text: text.clone(),
      items: pending.items.clone(),
      timestamp: now,
    },
  );

  let details = OrderDetails {
    timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
    customer_code: extract::customer_code(&text).unwrap_or(NOT_FOUND),
    address: extract::address(&text).unwrap_or(NOT_FOUND),
    shipping_cost: price,
    total_cost: extract::total_cost(&text, price),
  };
  state.activity.log_order_details(&details, &pending.items).await;
  state
    .activity
    .log_customer_info(&now.format("%Y-%m-%d").to_string(), &order_id.label(), &pending.display_name, &text)
    .await;
  Ok(FlowControl::Continue)
}
