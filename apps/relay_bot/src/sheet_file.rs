// relay_bot/src/sheet_file.rs

use crate::errors::Result;
use async_trait::async_trait;
use order_relay::activity::{
  CUSTOMER_INFO_SHEET, DAILY_ORDERS_SHEET, DRIVER_SUMMARY_SHEET, FINISHED_JOBS_SHEET, ORDER_DETAILS_SHEET,
};
use order_relay::inventory::{STOCK_HEADERS, STOCK_SHEET};
use order_relay::{CellValue, InMemorySpreadsheet, Record, Spreadsheet, Worksheet};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A spreadsheet persisted as one JSON document: worksheet name → headers and
/// rows. Reads are served from memory; every write rewrites the file.
pub struct JsonFileSpreadsheet {
  path: PathBuf,
  sheet: InMemorySpreadsheet,
  // Serializes snapshot + write so a later change is never overwritten by an
  // earlier snapshot.
  save_lock: Mutex<()>,
}

fn blank_workbook() -> BTreeMap<String, Worksheet> {
  [
    (STOCK_SHEET, Worksheet::new(&STOCK_HEADERS)),
    (DAILY_ORDERS_SHEET, Worksheet::new(&["วันที่", "จำนวนออเดอร์", "ยอดรวม"])),
    (CUSTOMER_INFO_SHEET, Worksheet::new(&["วันที่", "เลขออเดอร์", "ผู้สั่ง", "ข้อความ"])),
    (FINISHED_JOBS_SHEET, Worksheet::new(&["วันที่", "คนขับ", "ออเดอร์", "ค่าส่ง", "รูป"])),
    (DRIVER_SUMMARY_SHEET, Worksheet::new(&["วันที่", "สรุป"])),
    (
      ORDER_DETAILS_SHEET,
      Worksheet::new(&["เวลา", "รหัสลูกค้า", "ยี่ห้อ", "กลิ่น", "จำนวน", "ที่อยู่", "ค่าส่ง", "ยอดรวม"]),
    ),
  ]
  .into_iter()
  .map(|(name, ws)| (name.to_string(), ws))
  .collect()
}

impl JsonFileSpreadsheet {
  /// Opens `path`, creating it with empty stock and log sheets when absent.
  /// Sheets missing from an existing file are added.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let mut workbook = blank_workbook();
    match tokio::fs::read(&path).await {
      Ok(bytes) => {
        let stored: BTreeMap<String, Worksheet> = serde_json::from_slice(&bytes)?;
        info!(path = %path.display(), sheets = stored.len(), "Spreadsheet file loaded.");
        workbook.extend(stored);
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        info!(path = %path.display(), "Spreadsheet file not found, starting with empty sheets.");
      }
      Err(e) => return Err(e.into()),
    }

    let this = Self {
      path,
      sheet: InMemorySpreadsheet::from_sheets(workbook),
      save_lock: Mutex::new(()),
    };
    this.save().await?;
    Ok(this)
  }

  async fn save(&self) -> Result<()> {
    let _guard = self.save_lock.lock().await;
    let json = serde_json::to_vec_pretty(&self.sheet.snapshot())?;
    let tmp = self.path.with_extension("tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, &self.path).await?;
    debug!(path = %self.path.display(), "Spreadsheet file saved.");
    Ok(())
  }
}

#[async_trait]
impl Spreadsheet for JsonFileSpreadsheet {
  async fn get_all_records(&self, sheet: &str, expected_headers: &[&str]) -> anyhow::Result<Vec<Record>> {
    self.sheet.get_all_records(sheet, expected_headers).await
  }

  async fn update_cell(&self, sheet: &str, row: usize, col: usize, value: CellValue) -> anyhow::Result<()> {
    self.sheet.update_cell(sheet, row, col, value).await?;
    Ok(self.save().await?)
  }

  async fn append_row(&self, sheet: &str, values: Vec<CellValue>) -> anyhow::Result<()> {
    self.sheet.append_row(sheet, values).await?;
    Ok(self.save().await?)
  }
}
