// order_relay/src/extract.rs

//! Field extraction from raw order text: markers, phone numbers, shipping
//! price, customer code, address, and the "essential" lines forwarded to the
//! dispatch channel.

use crate::order::OrderId;
use once_cell::sync::Lazy;
use regex::Regex;

pub const SHIPPING_LABEL: &str = "ค่าส่ง";
pub const ADDRESS_LABEL: &str = "ที่อยู่";
pub const MAPS_HOST: &str = "maps.app.goo.gl";
pub const NOT_FOUND: &str = "ไม่พบ";

static ORDER_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#ORDER([0-9]+)").expect("valid regex"));

// A 10-digit mobile number that is not part of a longer digit run.
static PHONE_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?:^|[^0-9])(0[689][0-9]{8})(?:[^0-9]|$)").expect("valid regex"));

static SHIPPING_PRICE_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"ค่าส่ง\s*[:=\-]?\s*([0-9]+)").expect("valid regex"));

static CUSTOMER_CODE_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)\b(?:bkk-|rst-|rf-|bl-|ปาล์ม|จัสเอ)\S*").expect("valid regex"));

static ADDRESS_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(ที่อยู่[^\n]*|https://maps\.app\.goo\.gl\S*)").expect("valid regex"));

static TOTAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"=\s*([0-9,]+)").expect("valid regex"));

// Essential-info extraction also keeps the generic code label and "Nh" codes.
const ESSENTIAL_CODE_WORDS: [&str; 8] = ["รหัส", "Bkk-", "Rst-", "Rf-", "Bl-", "ปาล์ม", "จัสเอ", "Nh"];

pub fn has_order_keyword(text: &str) -> bool {
  text.to_lowercase().contains("order")
}

pub fn has_customer_code(text: &str) -> bool {
  CUSTOMER_CODE_RE.is_match(text)
}

pub fn find_phone(text: &str) -> Option<&str> {
  PHONE_RE.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

pub fn has_shipping_marker(text: &str) -> bool {
  text.contains(SHIPPING_LABEL)
}

pub fn has_address_marker(text: &str) -> bool {
  text.contains(MAPS_HOST) || text.contains(ADDRESS_LABEL)
}

/// Shipping price from the first `ค่าส่ง <n>` occurrence, 0 when absent.
pub fn shipping_price(text: &str) -> u32 {
  SHIPPING_PRICE_RE
    .captures(text)
    .and_then(|c| c.get(1))
    .and_then(|m| m.as_str().parse().ok())
    .unwrap_or(0)
}

/// Subtracts `discount` from the shipping price when the price is at least
/// `discount`. Only the digits of the shipping-cost match are rewritten.
///
/// Returns the rewritten text and the original price.
pub fn apply_shipping_discount(text: &str, discount: u32) -> (String, u32) {
  let Some(digits) = SHIPPING_PRICE_RE.captures(text).and_then(|c| c.get(1)) else {
    return (text.to_string(), 0);
  };
  let Ok(price) = digits.as_str().parse::<u32>() else {
    return (text.to_string(), 0);
  };
  if price < discount {
    return (text.to_string(), price);
  }
  let mut rewritten = String::with_capacity(text.len());
  rewritten.push_str(&text[..digits.start()]);
  rewritten.push_str(&(price - discount).to_string());
  rewritten.push_str(&text[digits.end()..]);
  (rewritten, price)
}

pub fn contains_order_marker(text: &str) -> bool {
  text.contains("#ORDER")
}

pub fn order_id_in(text: &str) -> Option<OrderId> {
  ORDER_MARKER_RE
    .captures(text)
    .and_then(|c| c.get(1))
    .and_then(|m| m.as_str().parse().ok())
    .map(OrderId)
}

/// The full `#ORDER<digits>` token as written in the text.
pub fn order_marker_in(text: &str) -> Option<&str> {
  ORDER_MARKER_RE.find(text).map(|m| m.as_str())
}

pub fn customer_code(text: &str) -> Option<&str> {
  CUSTOMER_CODE_RE.find(text).map(|m| m.as_str())
}

pub fn address(text: &str) -> Option<&str> {
  ADDRESS_RE.find(text).map(|m| m.as_str())
}

/// Order total from an `= 1,250` style line, falling back to `fallback`.
pub fn total_cost(text: &str, fallback: u32) -> u32 {
  TOTAL_RE
    .captures(text)
    .and_then(|c| c.get(1))
    .and_then(|m| m.as_str().replace(',', "").parse().ok())
    .unwrap_or(fallback)
}

/// The lines a driver needs: code, phone, shipping and address lines, trimmed,
/// in their original order.
pub fn essential_info(text: &str) -> String {
  text
    .lines()
    .filter(|line| {
      ESSENTIAL_CODE_WORDS.iter().any(|w| line.contains(w))
        || find_phone(line).is_some()
        || line.contains(SHIPPING_LABEL)
        || has_address_marker(line)
    })
    .map(str::trim)
    .collect::<Vec<_>>()
    .join("\n")
}
