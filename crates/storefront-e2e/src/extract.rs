//! Tolerant extraction of prices and order details from rendered text.

use std::sync::OnceLock;

use regex::Regex;

use crate::result::ExtractionMismatch;

fn order_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Id:\s*(\d+)").expect("order id pattern is valid"))
}

fn order_amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Amount:\s*(\d+)").expect("amount pattern is valid"))
}

/// Parse a currency string, ignoring every character but digits and `.`.
///
/// `"$360"`, `"360 USD"` and `"*360*"` all parse to `360.0`.
pub fn parse_price(text: &str) -> Result<f64, ExtractionMismatch> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits
        .parse::<f64>()
        .map_err(|_| ExtractionMismatch::new("price", text))
}

/// Extract the order id from purchase confirmation details
pub fn parse_order_id(text: &str) -> Result<String, ExtractionMismatch> {
    order_id_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ExtractionMismatch::new("order id", text))
}

/// Extract the whole-unit order amount from purchase confirmation details
pub fn parse_order_amount(text: &str) -> Result<u64, ExtractionMismatch> {
    order_amount_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| ExtractionMismatch::new("order amount", text))
}

/// Turn a failed extraction into its sentinel, logging the mismatch
pub fn or_sentinel<T: Default>(result: Result<T, ExtractionMismatch>) -> T {
    result.unwrap_or_else(|mismatch| {
        tracing::warn!(field = mismatch.field, text = %mismatch.text, "extraction mismatch, using sentinel");
        T::default()
    })
}
