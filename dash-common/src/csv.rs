//! CSV parsing for published spreadsheet exports
//!
//! The exports are simple: comma separated, double quotes around fields that
//! contain commas, header row first. Quotes only toggle the quoted state; they
//! are never emitted and escaped quotes (`""`) are not unescaped.

use std::collections::HashMap;

/// Field delimiter used by the spreadsheet exports
pub const DELIMITER: char = ',';

/// One data row mapped onto the (normalized) header names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: HashMap<String, String>,
    width: usize,
}

impl RawRecord {
    /// Build a record directly from `(header, value)` pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let width = fields.len();
        Self { fields, width }
    }

    /// Raw value for a header, `None` when the column does not exist
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields.get(header).map(String::as_str)
    }

    /// Number of tokens found on the source line
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of mapped columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Split one line on the delimiter, honoring double-quoted sections
///
/// An unterminated quote leaves the parser in the quoted state, so the rest
/// of the line ends up in the final field.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == DELIMITER && !in_quotes {
            result.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    result.push(current);
    result
}

/// Normalize a header cell into a field name
///
/// Lower-cases and collapses every run of characters outside `[a-z0-9_]`
/// into a single underscore: `"Sale ID"` becomes `sale_id`.
pub fn normalize_header(header: &str) -> String {
    let cleaned = header.trim().replace('"', "").to_lowercase();
    let mut out = String::with_capacity(cleaned.len());
    let mut in_run = false;

    for ch in cleaned.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

/// Non-blank lines of a response body, with trailing `\r` removed
pub fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
}

/// Count of non-blank lines (header included)
pub fn usable_lines(text: &str) -> usize {
    lines(text).count()
}

/// Parse a whole export into raw records
///
/// Line 0 is the header row. Rows shorter than the header leave the missing
/// fields as empty strings; extra tokens are ignored. Values are trimmed.
pub fn parse_text(text: &str) -> Vec<RawRecord> {
    let mut rows = lines(text);
    let headers: Vec<String> = match rows.next() {
        Some(header_line) => parse_line(header_line)
            .iter()
            .map(|h| normalize_header(h))
            .collect(),
        None => return Vec::new(),
    };

    rows.map(|line| {
        let values = parse_line(line);
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = values.get(i).map(|v| v.trim()).unwrap_or_default();
                (header.clone(), value.to_string())
            })
            .collect();
        RawRecord {
            fields,
            width: values.len(),
        }
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(headers: &[&str], rows: &[Vec<String>]) -> String {
        let mut out = headers.join(",");
        for row in rows {
            out.push('\n');
            out.push_str(&row.join(","));
        }
        out
    }

    #[test]
    fn test_quoted_field_keeps_delimiter() {
        assert_eq!(parse_line(r#"a,"b,c",d"#), vec!["a", "b,c", "d"]);
    }

    #[test]
    fn test_plain_line_is_not_trimmed() {
        assert_eq!(parse_line(" a , b"), vec![" a ", " b"]);
    }

    #[test]
    fn test_empty_fields_preserved() {
        assert_eq!(parse_line("a,,c,"), vec!["a", "", "c", ""]);
    }

    #[test]
    fn test_unterminated_quote_swallows_rest_of_line() {
        // The open quote is never closed, so the trailing comma is not a split
        assert_eq!(parse_line(r#"a,"b,c"#), vec!["a", "b,c"]);
    }

    #[test]
    fn test_escaped_quotes_only_toggle() {
        assert_eq!(parse_line(r#""say ""hi""",x"#), vec!["say hi", "x"]);
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Sale ID"), "sale_id");
        assert_eq!(normalize_header("  \"Unit Price ($)\" "), "unit_price_");
        assert_eq!(normalize_header("total_revenue"), "total_revenue");
        assert_eq!(normalize_header("ROI %"), "roi_");
    }

    #[test]
    fn test_parse_text_maps_headers_positionally() {
        let text = "Sale ID,Date,Total Revenue\nS1,2024-01-01,\"1,200\"\nS2,2024-01-02,300\n";
        let records = parse_text(text);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("sale_id"), Some("S1"));
        assert_eq!(records[0].get("total_revenue"), Some("1,200"));
        assert_eq!(records[1].get("date"), Some("2024-01-02"));
        assert_eq!(records[0].width(), 3);
    }

    #[test]
    fn test_parse_text_skips_blank_lines_and_crlf() {
        let text = "a,b\r\n\r\n1,2\r\n   \n3,4";
        let records = parse_text(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("b"), Some("2"));
        assert_eq!(records[1].get("a"), Some("3"));
    }

    #[test]
    fn test_short_rows_leave_trailing_fields_empty() {
        let records = parse_text("a,b,c\n1");
        assert_eq!(records[0].get("a"), Some("1"));
        assert_eq!(records[0].get("b"), Some(""));
        assert_eq!(records[0].get("c"), Some(""));
        assert_eq!(records[0].width(), 1);
    }

    #[test]
    fn test_header_only_yields_no_records() {
        assert!(parse_text("a,b,c\n").is_empty());
        assert!(parse_text("").is_empty());
    }

    #[test]
    fn test_usable_lines() {
        assert_eq!(usable_lines("h\n\n  \nrow\n"), 2);
        assert_eq!(usable_lines(""), 0);
    }

    #[test]
    fn test_render_then_parse_preserves_plain_values() {
        let headers = ["id", "region", "amount"];
        let rows = vec![
            vec!["1".to_string(), "North".to_string(), "10.5".to_string()],
            vec!["2".to_string(), "South East".to_string(), "".to_string()],
            vec!["3".to_string(), "West".to_string(), "7".to_string()],
        ];

        let parsed = parse_text(&render(&headers, &rows));

        assert_eq!(parsed.len(), rows.len());
        for (record, row) in parsed.iter().zip(&rows) {
            for (header, value) in headers.iter().zip(row) {
                assert_eq!(record.get(header), Some(value.as_str()));
            }
        }
    }
}
