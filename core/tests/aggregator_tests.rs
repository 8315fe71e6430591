// tests/aggregator_tests.rs
mod common;

use chrono::{Local, NaiveDate, TimeZone};
use common::*;
use order_relay::activity::{DAILY_ORDERS_SHEET, DRIVER_SUMMARY_SHEET};
use order_relay::aggregator::duration_until_next_midnight;
use order_relay::{CellValue, DeliveryLedger};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

fn day() -> NaiveDate {
  start_time().date_naive()
}

fn two_driver_ledger() -> DeliveryLedger {
  let ledger = DeliveryLedger::new();
  ledger.record_completion(day(), "Somchai", "somchai_d", "#ORDER01", 30);
  ledger.record_completion(day(), "Bob", "Bob", "#ORDER02", 20);
  ledger.record_completion(day(), "Somchai", "somchai_d", "#ORDER03", 45);
  ledger
}

#[test]
fn test_delivery_summary_lists_every_job() {
  let summary = two_driver_ledger().delivery_summary(day());
  assert_eq!(summary.count, 3);
  assert_eq!(summary.total, 95);
  assert_eq!(
    summary.text,
    "📦 สรุปยอดค่าส่งประจำวันที่ 14/05/2024\n🚚 รวมทั้งหมด 3 ออเดอร์\n\n\
     1. Somchai รับงาน #ORDER01 ค่าส่ง 30 บาท\n\
     2. Bob รับงาน #ORDER02 ค่าส่ง 20 บาท\n\
     3. Somchai รับงาน #ORDER03 ค่าส่ง 45 บาท\n\n\
     💰 รวมทั้งหมด: 95 บาท"
  );
}

#[test]
fn test_driver_summary_groups_by_driver_in_first_seen_order() {
  let summary = two_driver_ledger().driver_summary(day()).unwrap();
  assert_eq!(summary.job_count, 3);
  assert_eq!(summary.total, 95);
  assert_eq!(
    summary.text,
    "📅 สรุปยอดค่าส่งประจำวันที่ 2024-05-14\n\n\
     👤 @somchai_d (2 งาน / 75 บาท):\n - #ORDER01 ค่าส่ง 30\n - #ORDER03 ค่าส่ง 45\n\n\
     👤 @Bob (1 งาน / 20 บาท):\n - #ORDER02 ค่าส่ง 20\n\n\
     🧾 รวมทั้งหมด 3 งาน\n💰 รวมยอดทั้งหมด = 95 บาท"
  );
}

#[test]
fn test_driver_summary_is_per_date() {
  let ledger = two_driver_ledger();
  let next_day = day().succ_opt().unwrap();
  assert!(ledger.driver_summary(next_day).is_none());
  ledger.record_completion(next_day, "Bob", "Bob", "#ORDER04", 10);
  assert_eq!(ledger.driver_summary(next_day).unwrap().total, 10);
  assert_eq!(ledger.driver_summary(day()).unwrap().total, 95);
}

#[test]
fn test_clear_keeps_entries_added_after_the_summary() {
  let ledger = two_driver_ledger();
  let summary = ledger.delivery_summary(day());
  ledger.record_completion(day(), "Bob", "Bob", "#ORDER04", 10);
  ledger.clear_deliveries(summary.count);

  let left = ledger.deliveries();
  assert_eq!(left.len(), 1);
  assert_eq!(left[0].order_label, "#ORDER04");
}

#[test]
fn test_empty_delivery_summary() {
  let summary = DeliveryLedger::new().delivery_summary(day());
  assert_eq!(summary.count, 0);
  assert_eq!(
    summary.text,
    "📦 สรุปยอดค่าส่งประจำวันที่ 14/05/2024\n🚚 รวมทั้งหมด 0 ออเดอร์\n\n\n💰 รวมทั้งหมด: 0 บาท"
  );
}

#[test]
fn test_time_until_midnight() {
  let late = Local.with_ymd_and_hms(2024, 5, 14, 23, 59, 30).unwrap();
  assert_eq!(duration_until_next_midnight(late), Duration::from_secs(30));
  assert_eq!(duration_until_next_midnight(start_time()), Duration::from_secs(14 * 60 * 60));
}

#[tokio::test]
#[serial]
async fn test_daily_summary_posts_logs_and_clears() {
  let h = Harness::new();
  h.engine.ledger().record_completion(day(), "Somchai", "somchai_d", "#ORDER01", 30);
  h.engine.ledger().record_completion(day(), "Bob", "Bob", "#ORDER02", 20);

  let (deliveries, drivers) = h.engine.run_daily_summary(day()).await;
  let drivers = drivers.unwrap();

  assert_eq!(h.transport.texts_in(COMPLETION), vec![deliveries.text.clone(), drivers.text.clone()]);
  assert!(h.engine.ledger().deliveries().is_empty());

  let daily = h.sheet.sheet(DAILY_ORDERS_SHEET).unwrap().rows;
  assert_eq!(
    daily,
    vec![vec![CellValue::from("2024-05-14"), CellValue::Number(2), CellValue::Number(50)]]
  );
  let summaries = h.sheet.sheet(DRIVER_SUMMARY_SHEET).unwrap().rows;
  assert_eq!(summaries, vec![vec![CellValue::from("2024-05-14"), CellValue::from(drivers.text)]]);
}

#[tokio::test]
#[serial]
async fn test_quiet_day_posts_only_delivery_summary() {
  let h = Harness::new();
  let (deliveries, drivers) = h.engine.run_daily_summary(day()).await;

  assert!(drivers.is_none());
  assert_eq!(h.transport.texts_in(COMPLETION), vec![deliveries.text]);
  assert!(h.sheet.sheet(DRIVER_SUMMARY_SHEET).unwrap().rows.is_empty());
  assert_eq!(h.sheet.sheet(DAILY_ORDERS_SHEET).unwrap().rows.len(), 1);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_midnight_job_summarises_the_day_that_ended() {
  let h = Harness::new();
  h.clock.set(Local.with_ymd_and_hms(2024, 5, 14, 23, 59, 0).unwrap());
  h.engine.ledger().record_completion(day(), "Somchai", "somchai_d", "#ORDER01", 30);

  let job = Arc::clone(&h.engine).spawn_daily_summary();
  tokio::time::sleep(Duration::from_secs(59)).await;
  assert!(h.transport.texts_in(COMPLETION).is_empty());

  tokio::time::sleep(Duration::from_secs(2)).await;
  tokio::task::yield_now().await;
  let posted = h.transport.texts_in(COMPLETION);
  assert_eq!(posted.len(), 2);
  assert!(posted[0].starts_with("📦 สรุปยอดค่าส่งประจำวันที่ 14/05/2024"));
  assert!(posted[1].starts_with("📅 สรุปยอดค่าส่งประจำวันที่ 2024-05-14"));
  job.abort();
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_midnight_job_never_repeats_a_summarized_day() {
  let h = Harness::new();
  // The clock stays at 23:59, as if it were set back after each midnight.
  h.clock.set(Local.with_ymd_and_hms(2024, 5, 14, 23, 59, 0).unwrap());
  h.engine.ledger().record_completion(day(), "Somchai", "somchai_d", "#ORDER01", 30);

  let job = Arc::clone(&h.engine).spawn_daily_summary();
  tokio::time::sleep(Duration::from_secs(61)).await;
  tokio::task::yield_now().await;
  assert_eq!(h.transport.texts_in(COMPLETION).len(), 2);

  h.clock.set(Local.with_ymd_and_hms(2024, 5, 15, 23, 59, 30).unwrap());
  tokio::time::sleep(Duration::from_secs(60)).await;
  tokio::task::yield_now().await;
  assert_eq!(h.transport.texts_in(COMPLETION).len(), 2);
  assert_eq!(h.sheet.sheet(DRIVER_SUMMARY_SHEET).unwrap().rows.len(), 1);

  tokio::time::sleep(Duration::from_secs(31)).await;
  tokio::task::yield_now().await;
  let posted = h.transport.texts_in(COMPLETION);
  assert_eq!(posted.len(), 3);
  assert!(posted[2].starts_with("📦 สรุปยอดค่าส่งประจำวันที่ 15/05/2024"));
  job.abort();
}
