use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;

pub const TOTAL_REVENUE: &str = "Total Revenue";

/// Flat, sparse company-info record keyed by provider field names
/// (`regularMarketPrice`, `trailingPE`, `shortName`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCompanyInfo(pub BTreeMap<String, Value>);

impl RawCompanyInfo {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Numeric value for `key`; anything but a JSON number counts as absent.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64).filter(|v| v.is_finite())
    }

    /// Non-blank string value for `key`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for RawCompanyInfo {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawPriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Annual financial-statement line items; each series is ordered most recent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialStatement {
    pub line_items: BTreeMap<String, Vec<Option<f64>>>,
}

impl FinancialStatement {
    pub fn line_item(&self, name: &str) -> Option<&[Option<f64>]> {
        self.line_items.get(name).map(Vec::as_slice)
    }
}
