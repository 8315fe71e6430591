// order_relay/src/error.rs
use thiserror::Error;

use crate::inventory::Shortfall;
use crate::parser::RequiredField;
use crate::transport::UserId;

/// Misconfiguration of a `Flow`. These indicate a programming error in how a
/// flow was assembled, never a problem with the order being processed.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },
}

/// Everything that can stop an order event from progressing.
///
/// All but `Flow` are rejections the submitter (or operator) sees as a reply
/// in the originating channel. Spreadsheet and transport failures never get
/// here; they are logged where they happen.
#[derive(Debug, Error)]
pub enum FulfillmentError {
  #[error("order text is missing required fields: {missing:?}")]
  Validation { missing: Vec<RequiredField> },

  #[error("order resembles a recent order ({:.1}% similar)", .similarity * 100.0)]
  Duplicate { similarity: f64 },

  #[error("{} requested item(s) cannot be supplied", .shortfalls.len())]
  StockShortfall { shortfalls: Vec<Shortfall> },

  #[error("submitter {submitter} already has an order awaiting a slip")]
  ConcurrentSubmission { submitter: UserId },

  #[error("slip arrived {elapsed_secs}s after the order was admitted")]
  Expired { elapsed_secs: i64 },

  #[error("reply target is not an order: {0}")]
  Correlation(String),

  #[error(transparent)]
  Flow(#[from] FlowError),
}

impl FulfillmentError {
  /// Reply text shown in the channel, or `None` when the error is log-only.
  pub fn user_notice(&self) -> Option<String> {
    match self {
      FulfillmentError::Validation { .. } => {
        Some("❌ ข้อมูลไม่ครบ ต้องมี 'รหัส', 'เบอร์โทร', 'ค่าส่ง', 'ที่อยู่'".to_string())
      }
      FulfillmentError::Duplicate { similarity } => Some(format!(
        "⚠️ ตรวจพบว่าออเดอร์นี้คล้ายกับออเดอร์ก่อนหน้า ({:.1}%)\nหากต้องการสั่งซ้ำจริง กรุณาแก้ไขข้อความเล็กน้อยหรือรออีกสักครู่",
        similarity * 100.0
      )),
      FulfillmentError::StockShortfall { shortfalls } => {
        let mut msg = String::from("❌ สินค้าบางรายการไม่พร้อมขาย:\n");
        for shortfall in shortfalls {
          msg.push_str(&shortfall.notice_line());
          msg.push('\n');
        }
        Some(msg)
      }
      FulfillmentError::ConcurrentSubmission { .. } => {
        Some("❌ กรุณาแนบสลิปให้กับออเดอร์ก่อนหน้าก่อนส่งข้อความอื่น".to_string())
      }
      FulfillmentError::Expired { .. } => Some("⏰ หมดเวลารอแนบสลิปแล้ว กรุณาส่งออเดอร์ใหม่อีกครั้ง".to_string()),
      FulfillmentError::Correlation(reason) => Some(format!("⚠️ {reason}")),
      FulfillmentError::Flow(_) => None,
    }
  }

  /// Notices that are deleted from the channel after the notice lifetime.
  pub fn is_transient_notice(&self) -> bool {
    matches!(
      self,
      FulfillmentError::Validation { .. } | FulfillmentError::StockShortfall { .. }
    )
  }
}

pub type FulfillmentResult<T, E = FulfillmentError> = std::result::Result<T, E>;
