// order_relay/src/engine/router.rs

//! Moves an order from packing to dispatch to completion, and invoices to
//! billing. Correlation is only ever by the `#ORDER<id>` marker in the text of
//! the message being replied to.

use crate::engine::state::EngineState;
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::extract;
use crate::order::OrderId;
use crate::stage::OrderStage;
use crate::transport::{CallbackQuery, Content, Controls, InboundMessage, OutgoingText, PhotoRef, TextFormat};
use tracing::{error, info, instrument, trace};

pub const ACCEPT_BUTTON_LABEL: &str = "✅ รับงาน";
const MARKER_PREFIX: &str = "#ORDER";
pub(crate) const NOT_AN_ORDER: &str = "ข้อความที่ reply ไม่ใช่ออเดอร์";

/// The digits of the first `#ORDER<digits>` marker.
fn order_digits(text: &str) -> Option<&str> {
  extract::order_marker_in(text).map(|marker| marker.trim_start_matches(MARKER_PREFIX))
}

fn photo_of(msg: &InboundMessage) -> Option<&PhotoRef> {
  match &msg.content {
    Content::Photo { photo, .. } => Some(photo),
    Content::Text(_) => None,
  }
}

/// Packing → dispatch. A photo replying to an order message posts the order's
/// essential lines to dispatch with an accept button. Photos replying to
/// anything else are ignored.
#[instrument(name = "router::forward_to_dispatch", skip_all, fields(sender = %msg.sender.id))]
pub async fn forward_to_dispatch(state: &EngineState, msg: &InboundMessage) -> FulfillmentResult<()> {
  let Some(body) = msg.reply_to.as_ref().and_then(|r| r.body()) else {
    return Ok(());
  };
  let Some(digits) = order_digits(body) else {
    trace!("Packing photo does not reply to an order.");
    return Ok(());
  };
  let order_id = extract::order_id_in(body);
  if let Some(id) = order_id {
    state.stages.advance(id, OrderStage::Packed);
  }

  let summary = format!("{MARKER_PREFIX}{digits}\n{}", extract::essential_info(body));
  let token = format!("{}{digits}", state.settings.accept_token_prefix);
  let outgoing =
    OutgoingText::plain(state.channels.dispatch, summary).with_controls(Controls::single(ACCEPT_BUTTON_LABEL, token));
  if state.post(outgoing).await.is_none() {
    return Ok(());
  }
  if let Some(id) = order_id {
    state.stages.advance(id, OrderStage::Dispatched);
  }
  state.reply(msg, "✅ ส่งไปยังกลุ่มปล่อยงานแล้ว").await;
  info!(order = digits, "Order forwarded to dispatch.");
  Ok(())
}

/// The accept button under a dispatch message.
#[instrument(name = "router::accept_job", skip_all, fields(actor = %query.actor.id))]
pub async fn accept_job(state: &EngineState, query: &CallbackQuery) -> FulfillmentResult<()> {
  let Some(job_id) = query.data.strip_prefix(state.settings.accept_token_prefix.as_str()) else {
    trace!(data = %query.data, "Callback is not an accept token.");
    return Ok(());
  };
  let price = query.message_text.as_deref().map(extract::shipping_price).unwrap_or(0);
  let announcement = format!(
    "🚚 {} รับงาน {MARKER_PREFIX}{job_id} แล้ว ค่าส่ง {price}",
    query.actor.display_name
  );
  state.post(OutgoingText::plain(state.channels.dispatch, announcement)).await;

  if let Err(e) = state.transport.answer_callback(&query.id, "รับงานแล้ว").await {
    error!(error = %e, "Failed to answer callback.");
  }
  if let Err(e) = state.transport.edit_controls(&query.message, None).await {
    error!(error = %e, "Failed to remove accept button.");
  }
  if let Ok(id) = job_id.parse() {
    state.stages.advance(OrderId(id), OrderStage::Accepted);
  }
  info!(job = job_id, driver = %query.actor.display_name, "Job accepted.");
  Ok(())
}

/// Dispatch → completion. A driver's photo replying to an order closes the
/// job and feeds the daily logs.
#[instrument(name = "router::close_job", skip_all, fields(driver = %msg.sender.display_name))]
pub async fn close_job(state: &EngineState, msg: &InboundMessage) -> FulfillmentResult<()> {
  let (Some(reply), Some(photo)) = (msg.reply_to.as_ref(), photo_of(msg)) else {
    return Ok(());
  };
  let body = reply.body().unwrap_or_default();
  let Some(marker) = extract::order_marker_in(body) else {
    return Err(FulfillmentError::Correlation(NOT_AN_ORDER.to_string()));
  };

  let price = extract::shipping_price(body);
  let driver = msg.sender.display_name.as_str();
  let caption = format!("📷 งานจบแล้ว ค่าส่ง {price} โดย {driver}\n\n{body}");
  if let Err(e) = state
    .transport
    .post_photo(state.channels.completion, photo, &caption, TextFormat::Html)
    .await
  {
    error!(error = %e, "Failed to post completion photo.");
  }

  let now = state.clock.now();
  state
    .ledger
    .record_completion(now.date_naive(), driver, msg.sender.handle(), marker, price);
  state
    .activity
    .log_finished_job(&now.format("%Y-%m-%d").to_string(), driver, marker, price, &photo.0)
    .await;
  if let Some(id) = extract::order_id_in(body) {
    state.stages.advance(id, OrderStage::Completed);
  }
  info!(order = marker, price, "Job closed.");
  Ok(())
}

/// Intake → billing. `text` is the invoice reply (it starts with the billing
/// prefix); the replied order text is forwarded along with it.
#[instrument(name = "router::forward_invoice", skip_all)]
pub async fn forward_invoice(state: &EngineState, msg: &InboundMessage, text: &str) -> FulfillmentResult<()> {
  let Some(order_text) = msg.reply_to.as_ref().and_then(|r| r.body()) else {
    return Ok(());
  };
  let invoice = text.trim();
  let combined = format!("🧾 <b>ตัดบิลสำเร็จ</b> {invoice}\n\n{}", order_text.trim());
  if state.post(OutgoingText::html(state.channels.billing, combined)).await.is_none() {
    return Ok(());
  }
  if let Some(id) = extract::order_id_in(order_text) {
    state.stages.advance(id, OrderStage::Billed);
  }
  state
    .reply(msg, format!("✅ ส่งออเดอร์พร้อมเลขบิล {invoice} ไปยังกลุ่มสรุปบิลแล้ว"))
    .await;
  info!(invoice, "Invoice forwarded to billing.");
  Ok(())
}
