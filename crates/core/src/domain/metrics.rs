use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Normalized fundamentals and one year of daily bars for a single ticker.
///
/// Optional fields are `None` when the provider has no value for them; they are
/// never defaulted to zero. `dividend_yield` is always on the percentage scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMetrics {
    pub symbol: String,
    pub name: String,
    pub history: Vec<PriceBar>,
    pub current_price: f64,
    pub pe_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub market_cap: Option<i64>,
    pub dividend_yield: Option<f64>,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    #[serde(with = "ymd")]
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

mod ymd {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
