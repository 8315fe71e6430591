// tests/common/mod.rs
#![allow(dead_code)] // Each test binary uses a different subset of these helpers.

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use order_relay::inventory::STOCK_HEADERS;
use order_relay::{
  activity, CellValue, ChannelId, Channels, ChatTransport, Content, ContextData, Controls, FlowControl, FlowError,
  Handler, InMemorySpreadsheet, InboundEvent, InboundMessage, ManualClock, MemoryCounterStore, MessageId, MessageRef,
  OrderEngine, OutgoingText, PhotoRef, RepliedMessage, Sender, TextFormat, UserId, Worksheet,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tracing::Level;

// --- Flow test context ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Flow error: {0}")]
  Flow(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{:?}", fe))
  }
}

pub fn create_simple_handler(step_name: &'static str, message_to_append: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(FlowControl::Halt);
      }
      Ok(FlowControl::Continue)
    })
  })
}

pub fn create_failing_handler(step_name: &'static str, error_message: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}

// --- Tracing ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Channels and people ---
pub const INTAKE: ChannelId = ChannelId(-100);
pub const PACKING: ChannelId = ChannelId(-200);
pub const DISPATCH: ChannelId = ChannelId(-300);
pub const COMPLETION: ChannelId = ChannelId(-400);
pub const BILLING: ChannelId = ChannelId(-500);

pub fn channels() -> Channels {
  Channels {
    intake: INTAKE,
    packing: PACKING,
    dispatch: DISPATCH,
    completion: COMPLETION,
    billing: BILLING,
  }
}

pub fn alice() -> Sender {
  Sender {
    id: UserId(1),
    display_name: "Alice".to_string(),
    username: Some("alice".to_string()),
  }
}

pub fn bob() -> Sender {
  Sender {
    id: UserId(2),
    display_name: "Bob".to_string(),
    username: None,
  }
}

pub fn driver() -> Sender {
  Sender {
    id: UserId(9),
    display_name: "Somchai".to_string(),
    username: Some("somchai_d".to_string()),
  }
}

pub fn start_time() -> DateTime<Local> {
  Local.with_ymd_and_hms(2024, 5, 14, 10, 0, 0).unwrap()
}

// --- Order texts ---
pub const ALICE_ORDER: &str = "order\nBkk-0012\n0891234567\nrelx\nflavorA 2\nค่าส่ง 50\nhttps://maps.app.goo.gl/abc123";

pub const BOB_ORDER: &str =
  "order\nRst-9981\n0612345678\nmarbo\ngrape 1\nค่าส่ง 40\nที่อยู่ 99 ถนนสุขุมวิท กรุงเทพ\nรวม = 1,250";

// --- Recording transport ---
#[derive(Debug, Clone)]
pub struct PostedPhoto {
  pub channel: ChannelId,
  pub photo: PhotoRef,
  pub caption: String,
  pub format: TextFormat,
}

#[derive(Default)]
pub struct RecordingTransport {
  next_id: AtomicI64,
  pub texts: Mutex<Vec<(MessageRef, OutgoingText)>>,
  pub photos: Mutex<Vec<PostedPhoto>>,
  pub deleted: Mutex<Vec<MessageRef>>,
  pub edited: Mutex<Vec<(MessageRef, Option<Controls>)>>,
  pub answered: Mutex<Vec<(String, String)>>,
  fail_posts: AtomicBool,
}

impl RecordingTransport {
  pub fn new() -> Self {
    Self {
      next_id: AtomicI64::new(1000),
      ..Default::default()
    }
  }

  pub fn set_failing(&self, failing: bool) {
    self.fail_posts.store(failing, Ordering::SeqCst);
  }

  pub fn texts_in(&self, channel: ChannelId) -> Vec<String> {
    self
      .texts
      .lock()
      .iter()
      .filter(|(_, t)| t.channel == channel)
      .map(|(_, t)| t.text.clone())
      .collect()
  }

  /// Posts a plain message as if someone else wrote it, for use as a reply target.
  pub async fn seed(&self, channel: ChannelId, text: &str) -> MessageRef {
    self.post_text(OutgoingText::plain(channel, text)).await.unwrap()
  }

  pub fn last_in(&self, channel: ChannelId) -> Option<(MessageRef, OutgoingText)> {
    self.texts.lock().iter().rev().find(|(_, t)| t.channel == channel).cloned()
  }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
  async fn post_text(&self, message: OutgoingText) -> anyhow::Result<MessageRef> {
    if self.fail_posts.load(Ordering::SeqCst) {
      anyhow::bail!("transport down");
    }
    let sent = MessageRef {
      chat: message.channel,
      id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
    };
    self.texts.lock().push((sent, message));
    Ok(sent)
  }

  async fn post_photo(
    &self,
    channel: ChannelId,
    photo: &PhotoRef,
    caption: &str,
    format: TextFormat,
  ) -> anyhow::Result<MessageRef> {
    if self.fail_posts.load(Ordering::SeqCst) {
      anyhow::bail!("transport down");
    }
    self.photos.lock().push(PostedPhoto {
      channel,
      photo: photo.clone(),
      caption: caption.to_string(),
      format,
    });
    Ok(MessageRef {
      chat: channel,
      id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
    })
  }

  async fn edit_controls(&self, message: &MessageRef, controls: Option<Controls>) -> anyhow::Result<()> {
    self.edited.lock().push((*message, controls));
    Ok(())
  }

  async fn delete_message(&self, message: &MessageRef) -> anyhow::Result<()> {
    self.deleted.lock().push(*message);
    Ok(())
  }

  async fn answer_callback(&self, callback_id: &str, text: &str) -> anyhow::Result<()> {
    self.answered.lock().push((callback_id.to_string(), text.to_string()));
    Ok(())
  }
}

// --- Spreadsheet fixtures ---
pub fn stock_row(category: &str, brand: &str, flavor: &str, remaining: i64) -> Vec<CellValue> {
  vec![category.into(), brand.into(), flavor.into(), CellValue::Number(remaining)]
}

pub fn stock_sheet(rows: Vec<Vec<CellValue>>) -> Worksheet {
  let mut sheet = Worksheet::new(&STOCK_HEADERS);
  sheet.rows = rows;
  sheet
}

/// Stock plus the five empty log tables.
pub fn spreadsheet(rows: Vec<Vec<CellValue>>) -> InMemorySpreadsheet {
  InMemorySpreadsheet::new()
    .with_sheet("Stock", stock_sheet(rows))
    .with_sheet(activity::DAILY_ORDERS_SHEET, Worksheet::new(&["date", "count", "total"]))
    .with_sheet(activity::CUSTOMER_INFO_SHEET, Worksheet::new(&["date", "order_id", "user", "text"]))
    .with_sheet(
      activity::FINISHED_JOBS_SHEET,
      Worksheet::new(&["date", "driver", "order_id", "price", "photo"]),
    )
    .with_sheet(activity::DRIVER_SUMMARY_SHEET, Worksheet::new(&["date", "summary"]))
    .with_sheet(
      activity::ORDER_DETAILS_SHEET,
      Worksheet::new(&["timestamp", "code", "brand", "flavor", "qty", "address", "shipping", "total"]),
    )
}

pub fn default_stock() -> Vec<Vec<CellValue>> {
  vec![
    stock_row("หัว", "relx", "flavorA", 10),
    stock_row("หัว", "Relx", "Mint", 1),
    stock_row("หัว", "marbo", "grape", 5),
  ]
}

pub fn remaining(sheet: &InMemorySpreadsheet, row: usize) -> CellValue {
  sheet.sheet("Stock").unwrap().rows[row][3].clone()
}

// --- Engine harness ---
pub struct Harness {
  pub engine: Arc<OrderEngine>,
  pub transport: Arc<RecordingTransport>,
  pub sheet: Arc<InMemorySpreadsheet>,
  pub clock: Arc<ManualClock>,
  next_message: AtomicI64,
}

impl Harness {
  pub fn new() -> Self {
    Self::with_stock(default_stock())
  }

  pub fn with_stock(rows: Vec<Vec<CellValue>>) -> Self {
    Self::with_counter(rows, MemoryCounterStore::new())
  }

  pub fn with_counter(rows: Vec<Vec<CellValue>>, store: MemoryCounterStore) -> Self {
    setup_tracing();
    let transport = Arc::new(RecordingTransport::new());
    let sheet = Arc::new(spreadsheet(rows));
    let clock = Arc::new(ManualClock::new(start_time()));
    let engine = OrderEngine::builder(channels(), transport.clone(), sheet.clone())
      .clock(clock.clone())
      .counter_store(Box::new(store))
      .build()
      .unwrap();
    Self {
      engine: Arc::new(engine),
      transport,
      sheet,
      clock,
      next_message: AtomicI64::new(1),
    }
  }

  fn message_ref(&self, chat: ChannelId) -> MessageRef {
    MessageRef {
      chat,
      id: MessageId(self.next_message.fetch_add(1, Ordering::SeqCst)),
    }
  }

  pub fn text(&self, chat: ChannelId, sender: Sender, text: &str) -> InboundMessage {
    InboundMessage {
      message: self.message_ref(chat),
      sender,
      content: Content::Text(text.to_string()),
      reply_to: None,
    }
  }

  pub fn photo(&self, chat: ChannelId, sender: Sender, photo: &str) -> InboundMessage {
    InboundMessage {
      message: self.message_ref(chat),
      sender,
      content: Content::Photo {
        photo: PhotoRef(photo.to_string()),
        caption: None,
      },
      reply_to: None,
    }
  }

  pub async fn send(&self, msg: InboundMessage) {
    self.engine.handle_event(InboundEvent::Message(msg)).await;
  }

  pub async fn submit(&self, sender: Sender, text: &str) {
    let msg = self.text(INTAKE, sender, text);
    self.send(msg).await;
  }

  pub async fn slip(&self, sender: Sender) {
    let msg = self.photo(INTAKE, sender, "slip-photo");
    self.send(msg).await;
  }

  /// Submits and redeems an order, returning the packing message it produced.
  pub async fn confirm(&self, sender: Sender, text: &str) -> (MessageRef, OutgoingText) {
    self.submit(sender.clone(), text).await;
    self.slip(sender).await;
    self.transport.last_in(PACKING).expect("order forwarded to packing")
  }
}

pub fn replying_to(mut msg: InboundMessage, target: MessageRef, text: &str) -> InboundMessage {
  msg.reply_to = Some(RepliedMessage {
    message: target,
    text: Some(text.to_string()),
    caption: None,
  });
  msg
}
