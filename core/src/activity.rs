// order_relay/src/activity.rs

//! Append-only business tables kept next to the stock sheet. A failed write is
//! logged and otherwise ignored; nothing in the order flow waits on these
//! tables being correct.

use crate::order::OrderItem;
use crate::sheets::{CellValue, Spreadsheet};
use std::sync::Arc;
use tracing::{error, trace};

pub const DAILY_ORDERS_SHEET: &str = "DailyOrders";
pub const CUSTOMER_INFO_SHEET: &str = "CustomerInfo";
pub const FINISHED_JOBS_SHEET: &str = "FinishedJobs";
pub const DRIVER_SUMMARY_SHEET: &str = "DriverSummary";
pub const ORDER_DETAILS_SHEET: &str = "OrderDetailsLog";

/// Values shared by every order-details row of one order.
#[derive(Debug, Clone)]
pub struct OrderDetails<'a> {
  pub timestamp: String,
  pub customer_code: &'a str,
  pub address: &'a str,
  pub shipping_cost: u32,
  pub total_cost: u32,
}

pub struct ActivityLog {
  sheet: Arc<dyn Spreadsheet>,
}

impl ActivityLog {
  pub fn new(sheet: Arc<dyn Spreadsheet>) -> Self {
    Self { sheet }
  }

  async fn append(&self, table: &'static str, values: Vec<CellValue>) -> bool {
    match self.sheet.append_row(table, values).await {
      Ok(()) => {
        trace!(table, "Row appended.");
        true
      }
      Err(e) => {
        error!(table, error = %e, "Failed to append log row.");
        false
      }
    }
  }

  pub async fn log_daily_orders(&self, date: &str, count: usize, total: i64) -> bool {
    self
      .append(DAILY_ORDERS_SHEET, vec![date.into(), CellValue::Number(count as i64), total.into()])
      .await
  }

  pub async fn log_customer_info(&self, date: &str, order_label: &str, user: &str, text: &str) -> bool {
    self
      .append(CUSTOMER_INFO_SHEET, vec![date.into(), order_label.into(), user.into(), text.into()])
      .await
  }

  pub async fn log_finished_job(&self, date: &str, driver: &str, order_marker: &str, price: u32, photo: &str) -> bool {
    self
      .append(
        FINISHED_JOBS_SHEET,
        vec![date.into(), driver.into(), order_marker.into(), price.into(), photo.into()],
      )
      .await
  }

  pub async fn log_driver_summary(&self, date: &str, summary: &str) -> bool {
    self.append(DRIVER_SUMMARY_SHEET, vec![date.into(), summary.into()]).await
  }

  /// One row per item; shipping and total are filled on the first row only.
  /// Returns the number of rows written.
  pub async fn log_order_details(&self, details: &OrderDetails<'_>, items: &[OrderItem]) -> usize {
    let mut written = 0;
    for (idx, item) in items.iter().enumerate() {
      let (shipping, total): (CellValue, CellValue) = if idx == 0 {
        (details.shipping_cost.into(), details.total_cost.into())
      } else {
        (CellValue::empty(), CellValue::empty())
      };
      let row = vec![
        details.timestamp.as_str().into(),
        details.customer_code.into(),
        item.brand.as_str().into(),
        item.flavor.as_str().into(),
        item.quantity.into(),
        details.address.into(),
        shipping,
        total,
      ];
      if self.append(ORDER_DETAILS_SHEET, row).await {
        written += 1;
      }
    }
    written
  }
}
