//! Record filtering
//!
//! A pure function of (records, criteria). Predicates run in a fixed order
//! and short-circuit: date range, categorical selections, numeric ranges,
//! then free-text search. Input order is preserved.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

/// A normalized domain record
pub trait Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Categorical dimensions, named after the criteria fields that select them
    const DIMENSIONS: &'static [&'static str];

    /// Primary identifier, never empty after normalization
    fn id(&self) -> &str;

    /// Date used by the date-range predicate
    fn date(&self) -> &str;

    /// Value of a categorical dimension
    fn dimension(&self, key: &str) -> Option<&str>;

    /// Value of a numeric range dimension
    fn measure(&self, _key: &str) -> Option<f64> {
        None
    }
}

/// Filter criteria for one domain
///
/// Every field defaults to "no restriction".
pub trait Criteria:
    Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn date_range(&self) -> &DateRange;

    /// Selected values per dimension, an empty slice means pass-through
    fn selections(&self) -> Vec<(&'static str, &[String])>;

    /// Numeric range predicates
    fn ranges(&self) -> Vec<(&'static str, &NumericRange)> {
        Vec::new()
    }

    fn search(&self) -> &str;
}

/// Inclusive date range, either bound optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, alias = "from")]
    pub start: Option<NaiveDate>,
    #[serde(default, alias = "to")]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

/// Inclusive numeric range, either bound optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Parse a record date in any of the formats the sheets use
pub fn parse_record_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }
    None
}

/// Records matching `criteria`, in input order
pub fn apply<R: Record, C: Criteria>(records: &[R], criteria: &C) -> Vec<R> {
    let query = search_query(criteria);
    records
        .iter()
        .filter(|record| matches(*record, criteria, query.as_deref()))
        .cloned()
        .collect()
}

fn search_query<C: Criteria>(criteria: &C) -> Option<String> {
    let search = criteria.search();
    (!search.is_empty()).then(|| search.to_lowercase())
}

/// Evaluate every predicate against one record
///
/// `query` is the lower-cased search text, `None` when search is off.
pub fn matches<R: Record, C: Criteria>(record: &R, criteria: &C, query: Option<&str>) -> bool {
    let range = criteria.date_range();
    if !range.is_unbounded() {
        // Unparseable dates are not rejected
        if let Some(date) = parse_record_date(record.date()) {
            if !range.contains(date) {
                return false;
            }
        }
    }

    for (key, selected) in criteria.selections() {
        if selected.is_empty() {
            continue;
        }
        let value = record.dimension(key).unwrap_or_default();
        if !selected.iter().any(|s| s == value) {
            return false;
        }
    }

    for (key, range) in criteria.ranges() {
        if range.is_unbounded() {
            continue;
        }
        match record.measure(key) {
            Some(value) if range.contains(value) => {}
            _ => return false,
        }
    }

    match query {
        Some(query) => search_fields(record)
            .iter()
            .any(|field| field.to_lowercase().contains(query)),
        None => true,
    }
}

/// String form of every field of a record
pub fn search_fields<R: Record>(record: &R) -> Vec<String> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map.values().map(render_value).collect(),
        Ok(other) => vec![render_value(&other)],
        Err(_) => Vec::new(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) => render_number(f),
            None => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Render a number the way a spreadsheet user typed it (`5`, not `5.0`)
pub fn render_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Distinct non-empty values of each dimension, sorted
pub fn filter_options<R: Record>(records: &[R]) -> BTreeMap<&'static str, Vec<String>> {
    R::DIMENSIONS
        .iter()
        .map(|key| {
            let values: BTreeSet<&str> = records
                .iter()
                .filter_map(|r| r.dimension(key))
                .filter(|v| !v.is_empty())
                .collect();
            (*key, values.into_iter().map(str::to_string).collect())
        })
        .collect()
}
