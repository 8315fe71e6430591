// order_relay/src/sheets.rs

//! The spreadsheet the shop keeps its stock and business logs in.
//!
//! The engine only needs three operations: read every record of a worksheet,
//! overwrite a single cell, and append a row. Rows and columns are 1-based and
//! row 1 holds the headers, so the record at index `i` lives in row `i + 2`.

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// A worksheet row keyed by header.
pub type Record = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
  Number(i64),
  Text(String),
}

impl CellValue {
  pub fn empty() -> Self {
    CellValue::Text(String::new())
  }
}

impl fmt::Display for CellValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CellValue::Number(n) => write!(f, "{n}"),
      CellValue::Text(s) => f.write_str(s),
    }
  }
}

impl From<&str> for CellValue {
  fn from(value: &str) -> Self {
    CellValue::Text(value.to_string())
  }
}

impl From<String> for CellValue {
  fn from(value: String) -> Self {
    CellValue::Text(value)
  }
}

impl From<i64> for CellValue {
  fn from(value: i64) -> Self {
    CellValue::Number(value)
  }
}

impl From<u32> for CellValue {
  fn from(value: u32) -> Self {
    CellValue::Number(i64::from(value))
  }
}

#[async_trait]
pub trait Spreadsheet: Send + Sync {
  /// Every data row of `sheet`. Fails if any of `expected_headers` is absent.
  async fn get_all_records(&self, sheet: &str, expected_headers: &[&str]) -> anyhow::Result<Vec<Record>>;

  async fn update_cell(&self, sheet: &str, row: usize, col: usize, value: CellValue) -> anyhow::Result<()>;

  async fn append_row(&self, sheet: &str, values: Vec<CellValue>) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Worksheet {
  pub headers: Vec<String>,
  pub rows: Vec<Vec<CellValue>>,
}

impl Worksheet {
  pub fn new(headers: &[&str]) -> Self {
    Self {
      headers: headers.iter().map(|h| h.to_string()).collect(),
      rows: Vec::new(),
    }
  }

  pub fn with_row(mut self, values: Vec<CellValue>) -> Self {
    self.rows.push(values);
    self
  }

  fn record(&self, row: &[CellValue]) -> Record {
    self
      .headers
      .iter()
      .enumerate()
      .map(|(idx, header)| (header.clone(), row.get(idx).map(ToString::to_string).unwrap_or_default()))
      .collect()
  }
}

/// Spreadsheet held in memory. Also used by the binary as the working copy of
/// a file-backed sheet.
#[derive(Debug, Default)]
pub struct InMemorySpreadsheet {
  sheets: RwLock<BTreeMap<String, Worksheet>>,
  offline: AtomicBool,
}

impl InMemorySpreadsheet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_sheets(sheets: BTreeMap<String, Worksheet>) -> Self {
    Self {
      sheets: RwLock::new(sheets),
      offline: AtomicBool::new(false),
    }
  }

  pub fn with_sheet(self, name: &str, sheet: Worksheet) -> Self {
    self.sheets.write().insert(name.to_string(), sheet);
    self
  }

  pub fn sheet(&self, name: &str) -> Option<Worksheet> {
    self.sheets.read().get(name).cloned()
  }

  pub fn snapshot(&self) -> BTreeMap<String, Worksheet> {
    self.sheets.read().clone()
  }

  /// While offline every operation fails, simulating a backend outage.
  pub fn set_offline(&self, offline: bool) {
    self.offline.store(offline, Ordering::SeqCst);
  }

  fn ensure_online(&self) -> anyhow::Result<()> {
    if self.offline.load(Ordering::SeqCst) {
      bail!("spreadsheet backend unavailable");
    }
    Ok(())
  }
}

#[async_trait]
impl Spreadsheet for InMemorySpreadsheet {
  async fn get_all_records(&self, sheet: &str, expected_headers: &[&str]) -> anyhow::Result<Vec<Record>> {
    self.ensure_online()?;
    let sheets = self.sheets.read();
    let ws = sheets.get(sheet).ok_or_else(|| anyhow!("worksheet '{sheet}' not found"))?;
    if let Some(missing) = expected_headers.iter().find(|h| !ws.headers.iter().any(|have| have == *h)) {
      bail!("worksheet '{sheet}' has no '{missing}' column");
    }
    Ok(ws.rows.iter().map(|row| ws.record(row)).collect())
  }

  async fn update_cell(&self, sheet: &str, row: usize, col: usize, value: CellValue) -> anyhow::Result<()> {
    self.ensure_online()?;
    if row < 2 || col < 1 {
      bail!("cell ({row}, {col}) is outside the data area");
    }
    let mut sheets = self.sheets.write();
    let ws = sheets.get_mut(sheet).ok_or_else(|| anyhow!("worksheet '{sheet}' not found"))?;
    let data_row = ws
      .rows
      .get_mut(row - 2)
      .ok_or_else(|| anyhow!("row {row} does not exist in '{sheet}'"))?;
    if data_row.len() < col {
      data_row.resize(col, CellValue::empty());
    }
    data_row[col - 1] = value;
    Ok(())
  }

  async fn append_row(&self, sheet: &str, values: Vec<CellValue>) -> anyhow::Result<()> {
    self.ensure_online()?;
    let mut sheets = self.sheets.write();
    let ws = sheets.get_mut(sheet).ok_or_else(|| anyhow!("worksheet '{sheet}' not found"))?;
    ws.rows.push(values);
    Ok(())
  }
}
