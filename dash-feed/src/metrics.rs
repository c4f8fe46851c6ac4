//! Reduction helpers shared by the KPI aggregators

use std::collections::HashSet;

/// `numerator / denominator`, 0 when the denominator is zero
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn sum<T>(items: &[T], value: impl Fn(&T) -> f64) -> f64 {
    items.iter().map(value).sum()
}

/// Mean of `value` over `items`, 0 for an empty slice
pub fn mean<T>(items: &[T], value: impl Fn(&T) -> f64) -> f64 {
    ratio(sum(items, value), items.len() as f64)
}

pub fn count<T>(items: &[T], predicate: impl Fn(&T) -> bool) -> usize {
    items.iter().filter(|item| predicate(item)).count()
}

pub fn distinct<'a, T>(items: &'a [T], key: impl Fn(&'a T) -> &'a str) -> usize {
    items.iter().map(key).collect::<HashSet<_>>().len()
}

/// Per-group totals in first-seen group order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupTotals {
    groups: Vec<(String, f64, usize)>,
}

impl GroupTotals {
    pub fn collect<T>(items: &[T], key: impl Fn(&T) -> &str, value: impl Fn(&T) -> f64) -> Self {
        let mut totals = Self::default();
        for item in items {
            totals.add(key(item), value(item));
        }
        totals
    }

    pub fn add(&mut self, key: &str, value: f64) {
        match self.groups.iter_mut().find(|(k, _, _)| k == key) {
            Some((_, total, n)) => {
                *total += value;
                *n += 1;
            }
            None => self.groups.push((key.to_string(), value, 1)),
        }
    }

    /// Group with the largest total; ties go to the group seen first
    pub fn top(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (key, total, _) in &self.groups {
            if best.map_or(true, |(_, b)| *total > b) {
                best = Some((key.as_str(), *total));
            }
        }
        best
    }

    /// Groups as (key, total, member count)
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64, usize)> {
        self.groups.iter().map(|(k, t, n)| (k.as_str(), *t, *n))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Fixed-point text with `digits` decimals, rounding exact ties away from zero
///
/// `{:.N}` rounds ties to even (`2.5` → `2`); insight strings round them up in
/// magnitude (`2.5` → `3`, `0.125` → `0.13`). Values that are not exact ties
/// format the same either way.
pub fn fixed(value: f64, digits: usize) -> String {
    if !value.is_finite() || value == 0.0 {
        return format!("{value:.digits$}");
    }
    // An f64 has at most 1074 fractional decimal digits, so this is exact
    let exact = format!("{:.1100}", value.abs());
    let tail = exact.split_once('.').map_or("", |(_, frac)| frac);
    let tie = tail.len() > digits
        && tail[digits..].starts_with('5')
        && tail[digits + 1..].bytes().all(|b| b == b'0');
    // Next float away from zero lies just past the tie
    let value = if tie {
        f64::from_bits(value.to_bits() + 1)
    } else {
        value
    };
    format!("{value:.digits$}")
}

/// Format a fraction as a percentage with one decimal (`0.153` → `15.3`)
pub fn pct(fraction: f64) -> String {
    fixed(fraction * 100.0, 1)
}

/// Whole-number currency with thousands separators (`1234567.8` → `1,234,568`)
pub fn money(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{}", rounded.abs() as u64);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}
