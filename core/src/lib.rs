// src/lib.rs

//! order-relay: the order lifecycle state machine and inventory reconciliation
//! engine behind a chat-driven fulfillment pipeline.
//!
//! An order travels through a fixed set of stage channels:
//!  - intake: the submitter posts free-form order text, which is validated,
//!    checked for duplicates and checked against stock before it is held as
//!    a pending order awaiting a payment slip.
//!  - intake (photo): the slip redeems the pending order, commits stock,
//!    assigns a durable `#ORDER<id>` and forwards the order to packing.
//!  - packing → dispatch → completion, plus billing replies, all correlated
//!    purely through the `#ORDER<id>` marker and reply targets.
//!  - a midnight job summarises completed deliveries per driver.
//!
//! The chat transport, the spreadsheet holding stock and the counter file are
//! external collaborators expressed as traits (`ChatTransport`, `Spreadsheet`,
//! `CounterStore`).

pub mod aggregator;
pub mod activity;
pub mod clock;
pub mod config;
pub mod duplicate;
pub mod engine;
pub mod error;
pub mod extract;
pub mod flow;
pub mod inventory;
pub mod order;
pub mod parser;
pub mod pending;
pub mod sequencer;
pub mod sheets;
pub mod stage;
pub mod text;
pub mod transport;

// --- Re-exports for the Public API ---

pub use crate::aggregator::{DeliveryLedger, DeliverySummary, DriverSummary};
pub use crate::activity::ActivityLog;
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{Channels, EngineSettings};
pub use crate::duplicate::OrderHistory;
pub use crate::engine::{OrderEngine, OrderEngineBuilder};
pub use crate::error::{FlowError, FulfillmentError, FulfillmentResult};
pub use crate::flow::{ContextData, Flow, FlowControl, FlowOutcome, Handler};
pub use crate::inventory::{InventoryLedger, Shortfall, ShortfallReason, StockRow};
pub use crate::order::{OrderId, OrderItem, OrderRecord};
pub use crate::parser::RequiredField;
pub use crate::pending::{PendingOrder, PendingOrderStore};
pub use crate::sequencer::{CounterStore, FileCounterStore, MemoryCounterStore, OrderSequencer};
pub use crate::sheets::{CellValue, InMemorySpreadsheet, Record, Spreadsheet, Worksheet};
pub use crate::stage::{OrderStage, StageTracker};
pub use crate::transport::{
  Button, CallbackQuery, ChannelId, ChatTransport, Content, Controls, InboundEvent, InboundMessage, MessageId,
  MessageRef, OutgoingText, PhotoRef, RepliedMessage, Sender, TextFormat, UserId,
};
