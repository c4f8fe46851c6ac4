//! Field coercion shared by the domain normalizers
//!
//! Spreadsheet columns arrive as strings under a handful of possible header
//! names. Lookups take an alias list and use the first non-empty value.
//! Numeric coercion never fails: absent, malformed and zero values all take
//! the caller's documented fallback.

use chrono::{DateTime, Utc};
use dash_common::RawRecord;

/// Inputs a normalizer may need besides the row itself
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext {
    /// When the body being normalized was fetched
    pub fetched_at: DateTime<Utc>,
}

impl NormalizeContext {
    pub fn new(fetched_at: DateTime<Utc>) -> Self {
        Self { fetched_at }
    }

    /// Fetch date as `YYYY-MM-DD`
    pub fn fetch_date(&self) -> String {
        self.fetched_at.format("%Y-%m-%d").to_string()
    }

    /// Fetch time as RFC 3339 (millisecond precision, `Z` suffix)
    pub fn fetch_timestamp(&self) -> String {
        self.fetched_at
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}

/// First non-empty value among `aliases`
pub fn text<'a>(raw: &'a RawRecord, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| raw.get(alias))
        .find(|value| !value.is_empty())
}

/// First non-empty value among `aliases`, else `fallback`
pub fn text_or(raw: &RawRecord, aliases: &[&str], fallback: &str) -> String {
    text(raw, aliases).unwrap_or(fallback).to_string()
}

/// Parse a spreadsheet number
///
/// Strips `$`, `,`, `%` and whitespace, then reads the longest leading
/// decimal prefix, so `"$1,250.50"` is 1250.5 and `"12kg"` is 12.
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace())
        .collect();

    let bytes = cleaned.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if frac_end > frac_start || digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    // Optional exponent, only when followed by digits
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    cleaned[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parsed number from the first non-empty alias, if it parses
pub fn number(raw: &RawRecord, aliases: &[&str]) -> Option<f64> {
    text(raw, aliases).and_then(parse_number)
}

/// Number with a fallback for absent, unparseable or zero values
pub fn number_or(raw: &RawRecord, aliases: &[&str], fallback: f64) -> f64 {
    number_or_else(raw, aliases, || fallback)
}

/// Like [`number_or`] with a lazily computed (derived) fallback
pub fn number_or_else(raw: &RawRecord, aliases: &[&str], fallback: impl FnOnce() -> f64) -> f64 {
    match number(raw, aliases) {
        Some(n) if n != 0.0 => n,
        _ => fallback(),
    }
}

/// Integer field (truncated toward zero) with the same fallback rules
pub fn integer_or(raw: &RawRecord, aliases: &[&str], fallback: f64) -> f64 {
    match number(raw, aliases).map(f64::trunc) {
        Some(n) if n != 0.0 => n,
        _ => fallback,
    }
}

/// Sequential placeholder id for rows without one, `index` is 0-based
///
/// `placeholder_id("CMP-", 0, 3)` is `CMP-001`.
pub fn placeholder_id(prefix: &str, index: usize, width: usize) -> String {
    format!("{prefix}{:0width$}", index + 1, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRecord {
        RawRecord::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_parse_number_strips_currency_and_separators() {
        assert_eq!(parse_number("$1,250.50"), Some(1250.5));
        assert_eq!(parse_number("45%"), Some(45.0));
        assert_eq!(parse_number(" 3.5 "), Some(3.5));
        assert_eq!(parse_number("-12"), Some(-12.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("1e3"), Some(1000.0));
    }

    #[test]
    fn test_parse_number_reads_leading_prefix() {
        assert_eq!(parse_number("12kg"), Some(12.0));
        assert_eq!(parse_number("7.25 hours"), Some(7.25));
        assert_eq!(parse_number("3e"), Some(3.0));
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("."), None);
    }

    #[test]
    fn test_text_uses_first_non_empty_alias() {
        let raw = row(&[("employee_id", ""), ("emp_id", "E7"), ("id", "9")]);
        assert_eq!(text(&raw, &["employee_id", "emp_id", "id"]), Some("E7"));
        assert_eq!(text(&raw, &["missing"]), None);
        assert_eq!(text_or(&raw, &["missing"], "x"), "x");
    }

    #[test]
    fn test_number_or_treats_zero_as_missing() {
        let raw = row(&[("age", "0"), ("rating", "bad"), ("bonus", "1,500")]);
        assert_eq!(number_or(&raw, &["age"], 25.0), 25.0);
        assert_eq!(number_or(&raw, &["rating"], 3.5), 3.5);
        assert_eq!(number_or(&raw, &["bonus"], 5000.0), 1500.0);
        assert_eq!(number_or(&raw, &["absent"], 4.0), 4.0);
    }

    #[test]
    fn test_first_alias_wins_even_if_unparseable() {
        let raw = row(&[("salary", "unknown"), ("base_pay", "70000")]);
        assert_eq!(number_or(&raw, &["salary", "base_pay"], 50000.0), 50000.0);
    }

    #[test]
    fn test_integer_or_truncates() {
        let raw = row(&[("quantity", "2.9"), ("tiny", "0.4")]);
        assert_eq!(integer_or(&raw, &["quantity"], 0.0), 2.0);
        assert_eq!(integer_or(&raw, &["tiny"], 9.0), 9.0);
    }

    #[test]
    fn test_placeholder_id() {
        assert_eq!(placeholder_id("CMP-", 0, 3), "CMP-001");
        assert_eq!(placeholder_id("FIN", 41, 6), "FIN000042");
        assert_eq!(placeholder_id("EMP-", 4, 0), "EMP-5");
    }

    #[test]
    fn test_context_formats() {
        let ctx = NormalizeContext::new(
            DateTime::parse_from_rfc3339("2024-03-05T10:20:30Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        assert_eq!(ctx.fetch_date(), "2024-03-05");
        assert_eq!(ctx.fetch_timestamp(), "2024-03-05T10:20:30.000Z");
    }
}
