// order_relay/src/inventory.rs

//! Check, decrement and restock against the `Stock` worksheet.
//!
//! Submission only checks; redemption commits. There is no lock spanning the
//! two, so two orders can both pass a check for the last unit of an item.
//! Every backend failure is logged here and swallowed: checks fail open and
//! updates are best effort.

use crate::order::OrderItem;
use crate::sheets::{CellValue, Record, Spreadsheet};
use crate::text::same;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

pub const STOCK_SHEET: &str = "Stock";
pub const CATEGORY_HEADER: &str = "หมวดหมู่";
pub const BRAND_HEADER: &str = "ยี่ห้อ";
pub const FLAVOR_HEADER: &str = "กลิ่น";
pub const REMAINING_HEADER: &str = "คงเหลือ";
pub const STOCK_HEADERS: [&str; 4] = [CATEGORY_HEADER, BRAND_HEADER, FLAVOR_HEADER, REMAINING_HEADER];
const REMAINING_COLUMN: usize = 4;

/// One row of the stock sheet. `index` is the 0-based data-row index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRow {
  pub index: usize,
  pub category: String,
  pub brand: String,
  pub flavor: String,
  pub remaining: i64,
}

impl StockRow {
  fn from_record(index: usize, record: &Record) -> Self {
    let field = |name: &str| record.get(name).cloned().unwrap_or_default();
    let raw_remaining = field(REMAINING_HEADER);
    let remaining = raw_remaining.trim().parse().unwrap_or_else(|_| {
      warn!(row = index + 2, value = %raw_remaining, "Unreadable stock quantity, treating as 0.");
      0
    });
    Self {
      index,
      category: field(CATEGORY_HEADER),
      brand: field(BRAND_HEADER),
      flavor: field(FLAVOR_HEADER),
      remaining,
    }
  }

  /// Normalized equality on category, brand and flavor.
  pub fn matches(&self, item: &OrderItem) -> bool {
    same(&self.category, &item.category) && same(&self.brand, &item.brand) && same(&self.flavor, &item.flavor)
  }

  /// The 1-based sheet row, below the header row.
  pub fn sheet_row(&self) -> usize {
    self.index + 2
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortfallReason {
  NotFound,
  Insufficient,
}

impl fmt::Display for ShortfallReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ShortfallReason::NotFound => f.write_str("ไม่พบในสต็อก"),
      ShortfallReason::Insufficient => f.write_str("จำนวนไม่พอ"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortfall {
  pub item: OrderItem,
  pub reason: ShortfallReason,
}

impl Shortfall {
  /// `- หัว relx กลิ่น mint (2) [จำนวนไม่พอ]`
  pub fn notice_line(&self) -> String {
    format!(
      "- {} {} กลิ่น {} ({}) [{}]",
      self.item.category, self.item.brand, self.item.flavor, self.item.quantity, self.reason
    )
  }
}

pub struct InventoryLedger {
  sheet: Arc<dyn Spreadsheet>,
}

impl InventoryLedger {
  pub fn new(sheet: Arc<dyn Spreadsheet>) -> Self {
    Self { sheet }
  }

  pub async fn stock_rows(&self) -> anyhow::Result<Vec<StockRow>> {
    let records = self.sheet.get_all_records(STOCK_SHEET, &STOCK_HEADERS).await?;
    Ok(
      records
        .iter()
        .enumerate()
        .map(|(idx, record)| StockRow::from_record(idx, record))
        .collect(),
    )
  }

  /// Items that cannot be supplied. An unreachable stock sheet yields no
  /// shortfalls.
  #[instrument(name = "InventoryLedger::check_availability", skip_all, fields(items = items.len()))]
  pub async fn check_availability(&self, items: &[OrderItem]) -> Vec<Shortfall> {
    let rows = match self.stock_rows().await {
      Ok(rows) => rows,
      Err(e) => {
        error!(error = %e, "Stock check failed, letting the order through.");
        return Vec::new();
      }
    };

    let shortfalls: Vec<Shortfall> = items
      .iter()
      .filter_map(|item| {
        let reason = match rows.iter().find(|row| row.matches(item)) {
          None => ShortfallReason::NotFound,
          Some(row) if row.remaining < i64::from(item.quantity) => ShortfallReason::Insufficient,
          Some(_) => return None,
        };
        Some(Shortfall {
          item: item.clone(),
          reason,
        })
      })
      .collect();
    debug!(shortfalls = shortfalls.len(), "Stock check finished.");
    shortfalls
  }

  /// Subtracts each item's quantity from its row, never below zero. Returns
  /// the number of cells written.
  #[instrument(name = "InventoryLedger::decrement", skip_all, fields(items = items.len()))]
  pub async fn decrement(&self, items: &[OrderItem]) -> usize {
    self
      .apply(items, "decrement", |remaining, qty| (remaining - qty).max(0))
      .await
  }

  /// Adds each item's quantity back. Items without a row are skipped.
  #[instrument(name = "InventoryLedger::restock", skip_all, fields(items = items.len()))]
  pub async fn restock(&self, items: &[OrderItem]) -> usize {
    self.apply(items, "restock", |remaining, qty| remaining + qty).await
  }

  async fn apply(&self, items: &[OrderItem], op: &'static str, adjust: impl Fn(i64, i64) -> i64) -> usize {
    let mut rows = match self.stock_rows().await {
      Ok(rows) => rows,
      Err(e) => {
        error!(op, error = %e, "Could not read stock sheet, update skipped.");
        return 0;
      }
    };

    let mut written = 0;
    for item in items {
      let Some(row) = rows.iter_mut().find(|row| row.matches(item)) else {
        debug!(op, brand = %item.brand, flavor = %item.flavor, "No stock row for item.");
        continue;
      };
      let updated = adjust(row.remaining, i64::from(item.quantity));
      match self
        .sheet
        .update_cell(STOCK_SHEET, row.sheet_row(), REMAINING_COLUMN, CellValue::Number(updated))
        .await
      {
        Ok(()) => {
          debug!(op, row = row.sheet_row(), from = row.remaining, to = updated, "Stock updated.");
          row.remaining = updated;
          written += 1;
        }
        Err(e) => error!(op, row = row.sheet_row(), error = %e, "Stock update failed for item."),
      }
    }
    written
  }
}
