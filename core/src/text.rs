// order_relay/src/text.rs

//! Canonical form used for every text comparison in the engine: brand,
//! category and flavor matching as well as duplicate signatures.

/// Zero-width and bidi/format marks that phones and copy-paste inject into
/// chat text.
fn is_format_mark(c: char) -> bool {
  matches!(c,
    '\u{00AD}'
    | '\u{180E}'
    | '\u{200B}'..='\u{200F}'
    | '\u{202A}'..='\u{202E}'
    | '\u{2060}'..='\u{2064}'
    | '\u{2066}'..='\u{2069}'
    | '\u{FEFF}')
}

/// Trims, lower-cases, collapses internal whitespace runs to one space and
/// strips format marks. Total: every input has a normal form.
pub fn normalize(text: &str) -> String {
  let lowered: String = text.chars().filter(|c| !is_format_mark(*c)).flat_map(char::to_lowercase).collect();
  lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case- and whitespace-insensitive equality.
pub fn same(a: &str, b: &str) -> bool {
  normalize(a) == normalize(b)
}
