// order_relay/src/engine/intake.rs

//! Order text posted in the intake channel: validate, de-duplicate, check
//! stock, then hold the order until its slip arrives.

use crate::engine::state::EngineState;
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::flow::{ContextData, Flow, FlowControl};
use crate::order::OrderItem;
use crate::parser;
use crate::pending::PendingOrder;
use crate::transport::InboundMessage;
use std::sync::Arc;
use tracing::{debug, info};

pub struct IntakeCtx {
  pub state: Arc<EngineState>,
  pub message: InboundMessage,
  pub text: String,
  pub items: Vec<OrderItem>,
}

impl IntakeCtx {
  pub fn new(state: Arc<EngineState>, message: InboundMessage, text: String) -> Self {
    Self {
      state,
      message,
      text,
      items: Vec::new(),
    }
  }
}

pub fn intake_flow() -> Flow<IntakeCtx, FulfillmentError> {
  let mut flow = Flow::<IntakeCtx, FulfillmentError>::new(
    "intake",
    &[
      ("check_completeness", false, None),
      ("check_duplicate", false, None),
      ("parse_items", false, None),
      ("check_stock", false, None),
      ("admit_pending", false, None),
      ("prompt_for_slip", true, None),
    ],
  );

  flow.on("check_completeness", |ctx: ContextData<IntakeCtx>| async move {
    let missing = parser::missing_fields(&ctx.read().text);
    if !missing.is_empty() {
      return Err(FulfillmentError::Validation { missing });
    }
    Ok(FlowControl::Continue)
  });

  flow.on("check_duplicate", |ctx: ContextData<IntakeCtx>| async move {
    let similarity = {
      let guard = ctx.read();
      guard.state.history.find_duplicate(&guard.text)
    };
    match similarity {
      Some(similarity) => Err(FulfillmentError::Duplicate { similarity }),
      None => Ok(FlowControl::Continue),
    }
  });

  flow.on("parse_items", |ctx: ContextData<IntakeCtx>| async move {
    let mut guard = ctx.write();
    let items = parser::parse_items(&guard.text);
    guard.items = items;
    debug!(items = ?guard.items, "Order items parsed.");
    Ok::<_, FulfillmentError>(FlowControl::Continue)
  });

  flow.on("check_stock", check_stock);
  flow.on("admit_pending", admit_pending);
  flow.on("prompt_for_slip", prompt_for_slip);
  flow
}

async fn check_stock(ctx: ContextData<IntakeCtx>) -> FulfillmentResult<FlowControl> {
  let (state, items) = {
    let guard = ctx.read();
    (Arc::clone(&guard.state), guard.items.clone())
  };
  let shortfalls = state.inventory.check_availability(&items).await;
  if !shortfalls.is_empty() {
    return Err(FulfillmentError::StockShortfall { shortfalls });
  }
  Ok(FlowControl::Continue)
}

async fn admit_pending(ctx: ContextData<IntakeCtx>) -> FulfillmentResult<FlowControl> {
  let guard = ctx.read();
  let sender = &guard.message.sender;
  guard.state.pending.admit(PendingOrder {
    submitter: sender.id,
    raw_text: guard.text.clone(),
    display_name: sender.display_name.clone(),
    items: guard.items.clone(),
    admitted_at: guard.state.clock.now(),
  })?;
  Ok(FlowControl::Continue)
}

async fn prompt_for_slip(ctx: ContextData<IntakeCtx>) -> FulfillmentResult<FlowControl> {
  let (state, message) = {
    let guard = ctx.read();
    (Arc::clone(&guard.state), guard.message.clone())
  };
  let minutes = state.settings.redemption_window.as_secs().div_ceil(60).max(1);
  state
    .reply_transient(&message, format!("🕒 รอแนบสลิปภายใน {minutes} นาที..."))
    .await;
  info!(submitter = %message.sender.id, "Slip prompt sent.");
  Ok(FlowControl::Continue)
}
