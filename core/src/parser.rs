// order_relay/src/parser.rs

//! Turns free-form, human-typed order text into line items.
//!
//! Classification is an ordered list of line rules evaluated top to bottom;
//! the first rule that claims a line decides what happens to it. Lines no rule
//! claims are dropped silently, so noisy text never fails a parse.

use crate::extract;
use crate::order::OrderItem;
use crate::text::normalize;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const UNKNOWN_CATEGORY: &str = "ไม่ทราบ";

/// Brand keyword → category. Order matters: the first keyword contained in a
/// brand wins.
pub const BRAND_CATEGORIES: [(&str, &str); 21] = [
  ("relx", "หัว"),
  ("relx3.2", "หัว"),
  ("infyplus", "หัว"),
  ("jues", "หัว"),
  ("marbo", "หัว"),
  ("hyper", "หัว"),
  ("flow", "หัว"),
  ("mb9k", "ใช้แล้วทิ้ง"),
  ("mb9kaaa", "ใช้แล้วทิ้ง"),
  ("akbar", "ใช้แล้วทิ้ง"),
  ("bigdic", "ใช้แล้วทิ้ง"),
  ("elfbar10k", "ใช้แล้วทิ้ง"),
  ("ks6k", "ใช้แล้วทิ้ง"),
  ("nexo3k", "ใช้แล้วทิ้ง"),
  ("novo14k", "ใช้แล้วทิ้ง"),
  ("infy12k", "ใช้แล้วทิ้ง"),
  ("nexo12k", "ใช้แล้วทิ้ง"),
  ("eskobar20k", "ใช้แล้วทิ้ง"),
  ("relx2plus", "เครื่อง"),
  ("fitpod", "เครื่อง"),
  ("cube", "เครื่อง"),
];

/// Lines containing any of these (compared lower-cased) are never items.
const NOISE_KEYWORDS: [&str; 12] = [
  "ค่าส่ง", "maps", "bkk-", "ที่อยู่", "เบอร์", "http", "โทร", "rst-", "rf-", "bl-", "ปาล์ม", "จัสเอ",
];

static INLINE_ITEM_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^([\w.]+)\s+(.+?)\s+([0-9]+)$").expect("valid regex"));

static TRAILING_QUANTITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s+([0-9]+)$").expect("valid regex"));

/// Fields an order text must carry before it is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequiredField {
  OrderMarker,
  CustomerCode,
  Phone,
  ShippingCost,
  Address,
}

/// Every required field the text lacks; empty means the text is complete.
pub fn missing_fields(text: &str) -> Vec<RequiredField> {
  let checks = [
    (RequiredField::OrderMarker, extract::has_order_keyword(text)),
    (RequiredField::CustomerCode, extract::has_customer_code(text)),
    (RequiredField::Phone, extract::find_phone(text).is_some_and(|p| p.len() == 10)),
    (RequiredField::ShippingCost, extract::has_shipping_marker(text)),
    (RequiredField::Address, extract::has_address_marker(text)),
  ];
  checks.into_iter().filter(|(_, present)| !present).map(|(field, _)| field).collect()
}

pub fn is_complete(text: &str) -> bool {
  missing_fields(text).is_empty()
}

pub fn detect_category(brand: &str) -> &'static str {
  BRAND_CATEGORIES
    .iter()
    .find(|(keyword, _)| brand.contains(keyword))
    .map(|(_, category)| *category)
    .unwrap_or(UNKNOWN_CATEGORY)
}

pub fn is_brand_line(line: &str) -> bool {
  let line = normalize(line);
  BRAND_CATEGORIES.iter().any(|(keyword, _)| line.contains(keyword))
}

/// Shipping, address, phone and customer-code lines.
pub fn is_noise_line(line: &str) -> bool {
  let lowered = line.to_lowercase();
  NOISE_KEYWORDS.iter().any(|k| lowered.contains(k)) || extract::find_phone(line).is_some()
}

/// What a rule decided for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
  Ignore,
  SetBrand(String),
  BrandedItem { brand: String, flavor: String, quantity: u32 },
  Item { flavor: String, quantity: u32 },
}

pub struct LineRule {
  pub name: &'static str,
  pub apply: fn(&str) -> Option<LineAction>,
}

fn noise_rule(line: &str) -> Option<LineAction> {
  is_noise_line(line).then_some(LineAction::Ignore)
}

fn inline_item_rule(line: &str) -> Option<LineAction> {
  let caps = INLINE_ITEM_RE.captures(line)?;
  let brand = normalize(&caps[1]);
  if !BRAND_CATEGORIES.iter().any(|(keyword, _)| brand.contains(keyword)) {
    return None;
  }
  let Ok(quantity) = caps[3].parse() else {
    warn!(line, "Quantity out of range, line dropped.");
    return Some(LineAction::Ignore);
  };
  Some(LineAction::BrandedItem {
    brand,
    flavor: normalize(&caps[2]),
    quantity,
  })
}

fn brand_line_rule(line: &str) -> Option<LineAction> {
  is_brand_line(line).then(|| LineAction::SetBrand(normalize(line)))
}

fn trailing_quantity_rule(line: &str) -> Option<LineAction> {
  let caps = TRAILING_QUANTITY_RE.captures(line)?;
  let Ok(quantity) = caps[2].parse() else {
    warn!(line, "Quantity out of range, line dropped.");
    return Some(LineAction::Ignore);
  };
  Some(LineAction::Item {
    flavor: normalize(&caps[1]),
    quantity,
  })
}

/// Evaluated top to bottom for each non-empty line.
pub const LINE_RULES: [LineRule; 4] = [
  LineRule { name: "noise", apply: noise_rule },
  LineRule { name: "inline_item", apply: inline_item_rule },
  LineRule { name: "brand_line", apply: brand_line_rule },
  LineRule { name: "trailing_quantity", apply: trailing_quantity_rule },
];

pub fn classify_line(line: &str) -> Option<(&'static str, LineAction)> {
  LINE_RULES.iter().find_map(|rule| (rule.apply)(line).map(|action| (rule.name, action)))
}

/// Extracts items in text order. A flavor line before any brand line is
/// dropped with a warning; zero quantities are dropped.
pub fn parse_items(text: &str) -> Vec<OrderItem> {
  let mut items = Vec::new();
  let mut current_brand: Option<String> = None;

  for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
    let Some((rule, action)) = classify_line(line) else {
      continue;
    };

    let (brand, flavor, quantity) = match action {
      LineAction::Ignore => continue,
      LineAction::SetBrand(brand) => {
        current_brand = Some(brand);
        continue;
      }
      LineAction::BrandedItem { brand, flavor, quantity } => {
        current_brand = Some(brand.clone());
        (brand, flavor, quantity)
      }
      LineAction::Item { flavor, quantity } => match &current_brand {
        Some(brand) => (brand.clone(), flavor, quantity),
        None => {
          warn!(line, "Line skipped: no brand context yet.");
          continue;
        }
      },
    };

    if quantity == 0 {
      debug!(line, rule, "Zero quantity, line dropped.");
      continue;
    }

    items.push(OrderItem {
      category: detect_category(&brand).to_string(),
      brand,
      flavor,
      quantity,
    });
  }

  debug!(count = items.len(), "Parsed order items.");
  items
}
