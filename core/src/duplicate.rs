// order_relay/src/duplicate.rs

//! Fuzzy duplicate detection over the most recent confirmed orders.
//!
//! This is a safety net against the same order being pasted twice, not a
//! correctness guarantee: only the essential lines of each text are compared,
//! with a character-level similarity ratio.

use crate::extract;
use crate::order::OrderRecord;
use crate::parser::is_noise_line;
use crate::text::normalize;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::debug;

// Lower-cased markers of lines that identify who and where an order is for.
const SIGNATURE_MARKERS: [&str; 9] = ["bkk-", "rst-", "rf-", "bl-", "ปาล์ม", "จัสเอ", "ที่อยู่", "maps", "ค่าส่ง"];

fn ends_with_digit(line: &str) -> bool {
  line.trim_end().chars().last().is_some_and(|c| c.is_ascii_digit())
}

/// Normalized essential lines: code, phone, address and shipping lines plus
/// item lines (ending in a quantity) that are not noise.
pub fn signature(text: &str) -> String {
  text
    .lines()
    .filter(|line| {
      let lowered = line.to_lowercase();
      let identifying = SIGNATURE_MARKERS.iter().any(|m| lowered.contains(m)) || extract::find_phone(line).is_some();
      identifying || (ends_with_digit(line) && !is_noise_line(line))
    })
    .map(normalize)
    .collect::<Vec<_>>()
    .join("\n")
}

/// `2 * LCS(a, b) / (|a| + |b|)` over characters; two empty strings are
/// identical (1.0).
pub fn similarity(a: &str, b: &str) -> f64 {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  let total = a.len() + b.len();
  if total == 0 {
    return 1.0;
  }

  let mut prev = vec![0usize; b.len() + 1];
  let mut curr = vec![0usize; b.len() + 1];
  for ca in &a {
    for (j, cb) in b.iter().enumerate() {
      curr[j + 1] = if ca == cb { prev[j] + 1 } else { prev[j + 1].max(curr[j]) };
    }
    std::mem::swap(&mut prev, &mut curr);
  }
  let lcs = prev[b.len()];
  (2 * lcs) as f64 / total as f64
}

struct HistoryEntry {
  record: OrderRecord,
  signature: String,
}

/// The bounded in-memory history of confirmed orders.
pub struct OrderHistory {
  entries: Mutex<VecDeque<HistoryEntry>>,
  window: usize,
  threshold: f64,
}

impl OrderHistory {
  pub fn new(window: usize, threshold: f64) -> Self {
    Self {
      entries: Mutex::new(VecDeque::with_capacity(window)),
      window,
      threshold,
    }
  }

  /// Similarity to the first recent order at or above the threshold.
  pub fn find_duplicate(&self, text: &str) -> Option<f64> {
    let candidate = signature(text);
    let entries = self.entries.lock();
    entries.iter().rev().find_map(|entry| {
      let score = similarity(&candidate, &entry.signature);
      debug!(order_id = %entry.record.order_id, score, "Compared against recent order.");
      (score >= self.threshold).then_some(score)
    })
  }

  /// Remembers a confirmed order. `raw_text` is what the submitter posted;
  /// new submissions are compared against it rather than the discounted text.
  pub fn record(&self, raw_text: &str, record: OrderRecord) {
    let mut entries = self.entries.lock();
    entries.push_back(HistoryEntry {
      signature: signature(raw_text),
      record,
    });
    while entries.len() > self.window {
      entries.pop_front();
    }
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn recent(&self) -> Vec<OrderRecord> {
    self.entries.lock().iter().map(|e| e.record.clone()).collect()
  }
}
