// order_relay/src/aggregator.rs

//! In-memory delivery and driver logs, and the daily summaries built from them.

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryLogEntry {
  pub driver_name: String,
  pub price: u32,
  /// `#ORDER07`, or the not-found placeholder when the job had no marker.
  pub order_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverJob {
  pub job_id: String,
  pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySummary {
  pub date: NaiveDate,
  pub count: usize,
  pub total: i64,
  pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSummary {
  pub date: NaiveDate,
  pub job_count: usize,
  pub total: i64,
  pub text: String,
}

/// Jobs of one date, per driver in first-seen order.
type DriverJobs = Vec<(String, Vec<DriverJob>)>;

#[derive(Debug, Default)]
pub struct DeliveryLedger {
  deliveries: Mutex<Vec<DeliveryLogEntry>>,
  driver_jobs: Mutex<BTreeMap<NaiveDate, DriverJobs>>,
  confirmed_orders: Mutex<BTreeMap<NaiveDate, usize>>,
}

impl DeliveryLedger {
  pub fn new() -> Self {
    Self::default()
  }

  /// Records a closed job. `driver_name` goes into the delivery log,
  /// `driver_key` (username, else display name) keys the driver log.
  pub fn record_completion(&self, date: NaiveDate, driver_name: &str, driver_key: &str, order_label: &str, price: u32) {
    self.deliveries.lock().push(DeliveryLogEntry {
      driver_name: driver_name.to_string(),
      price,
      order_label: order_label.to_string(),
    });

    let mut jobs = self.driver_jobs.lock();
    let day = jobs.entry(date).or_default();
    let job = DriverJob {
      job_id: order_label.to_string(),
      amount: price,
    };
    match day.iter_mut().find(|(driver, _)| driver == driver_key) {
      Some((_, list)) => list.push(job),
      None => day.push((driver_key.to_string(), vec![job])),
    }
    debug!(%date, driver = driver_key, order = order_label, price, "Completion recorded.");
  }

  pub fn record_confirmed_order(&self, date: NaiveDate) {
    *self.confirmed_orders.lock().entry(date).or_default() += 1;
  }

  pub fn confirmed_orders_on(&self, date: NaiveDate) -> usize {
    self.confirmed_orders.lock().get(&date).copied().unwrap_or(0)
  }

  pub fn deliveries(&self) -> Vec<DeliveryLogEntry> {
    self.deliveries.lock().clone()
  }

  pub fn jobs_on(&self, date: NaiveDate) -> Vec<(String, Vec<DriverJob>)> {
    self.driver_jobs.lock().get(&date).cloned().unwrap_or_default()
  }

  /// Summary of every delivery logged since the last clear, titled with `date`.
  pub fn delivery_summary(&self, date: NaiveDate) -> DeliverySummary {
    let deliveries = self.deliveries.lock().clone();
    let total: i64 = deliveries.iter().map(|d| i64::from(d.price)).sum();

    let mut text = format!("📦 สรุปยอดค่าส่งประจำวันที่ {}\n", date.format("%d/%m/%Y"));
    text.push_str(&format!("🚚 รวมทั้งหมด {} ออเดอร์\n\n", deliveries.len()));
    for (i, entry) in deliveries.iter().enumerate() {
      text.push_str(&format!(
        "{}. {} รับงาน {} ค่าส่ง {} บาท\n",
        i + 1,
        entry.driver_name,
        entry.order_label,
        entry.price
      ));
    }
    text.push_str(&format!("\n💰 รวมทั้งหมด: {total} บาท"));

    DeliverySummary {
      date,
      count: deliveries.len(),
      total,
      text,
    }
  }

  /// Per-driver totals for `date`; `None` when nobody closed a job that day.
  pub fn driver_summary(&self, date: NaiveDate) -> Option<DriverSummary> {
    let day = self.jobs_on(date);
    if day.is_empty() {
      return None;
    }

    let mut lines = vec![format!("📅 สรุปยอดค่าส่งประจำวันที่ {}\n", date.format("%Y-%m-%d"))];
    let mut grand_total = 0i64;
    let mut grand_count = 0usize;
    for (driver, jobs) in &day {
      let total: i64 = jobs.iter().map(|j| i64::from(j.amount)).sum();
      grand_total += total;
      grand_count += jobs.len();
      lines.push(format!("👤 @{driver} ({} งาน / {total} บาท):", jobs.len()));
      lines.extend(jobs.iter().map(|j| format!(" - {} ค่าส่ง {}", j.job_id, j.amount)));
      lines.push(String::new());
    }
    lines.push(format!("🧾 รวมทั้งหมด {grand_count} งาน"));
    lines.push(format!("💰 รวมยอดทั้งหมด = {grand_total} บาท"));

    Some(DriverSummary {
      date,
      job_count: grand_count,
      total: grand_total,
      text: lines.join("\n"),
    })
  }

  /// Drops the first `count` delivery entries, i.e. those a summary covered.
  /// Entries appended after the summary was built are kept.
  pub fn clear_deliveries(&self, count: usize) {
    let mut deliveries = self.deliveries.lock();
    let count = count.min(deliveries.len());
    deliveries.drain(..count);
  }
}

/// Time left until the next local midnight. Falls back to a full day when the
/// midnight is ambiguous or skipped by a zone transition.
pub fn duration_until_next_midnight(now: DateTime<Local>) -> Duration {
  let next_midnight = now
    .date_naive()
    .checked_add_days(Days::new(1))
    .and_then(|day| day.and_hms_opt(0, 0, 0))
    .and_then(|naive| Local.from_local_datetime(&naive).earliest());
  match next_midnight {
    Some(at) => (at - now).to_std().unwrap_or(Duration::from_secs(24 * 60 * 60)),
    None => Duration::from_secs(24 * 60 * 60),
  }
}
