use crate::domain::metrics::{CanonicalMetrics, PriceBar};
use crate::market::error::MetricsError;
use crate::market::types::{FinancialStatement, RawCompanyInfo, RawPriceBar, TOTAL_REVENUE};

// Provider yields below this are fractions (0.025), at or above it percentages (3.1).
const DIVIDEND_FRACTION_THRESHOLD: f64 = 1.0;

/// Outcome of the best-effort revenue-growth lookup. Only `Computed` reaches callers;
/// the other variants exist so the reason can be logged.
#[derive(Debug, Clone, PartialEq)]
pub enum RevenueGrowth {
    Computed(f64),
    Unavailable(&'static str),
    ProviderError(String),
}

impl RevenueGrowth {
    /// Year-over-year growth from the two most recent non-null annual revenues.
    pub fn from_statement(statement: &FinancialStatement) -> Self {
        let Some(series) = statement.line_item(TOTAL_REVENUE) else {
            return RevenueGrowth::Unavailable("no annual total revenue in statement");
        };

        let mut observed = series.iter().flatten().copied().filter(|v| v.is_finite());
        let (Some(latest), Some(previous)) = (observed.next(), observed.next()) else {
            return RevenueGrowth::Unavailable("fewer than two annual revenue observations");
        };

        if previous == 0.0 {
            return RevenueGrowth::Unavailable("previous annual revenue is zero");
        }

        RevenueGrowth::Computed(round2((latest - previous) / previous * 100.0))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            RevenueGrowth::Computed(v) => Some(*v),
            RevenueGrowth::Unavailable(_) | RevenueGrowth::ProviderError(_) => None,
        }
    }
}

pub fn normalize_symbol(raw: &str) -> Result<String, MetricsError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(MetricsError::InvalidSymbol);
    }
    Ok(symbol)
}

/// Builds the canonical metrics object from raw provider records.
///
/// `history` is expected oldest first. An empty series is `NotFound`.
pub fn normalize(
    symbol: &str,
    info: &RawCompanyInfo,
    history: &[RawPriceBar],
    revenue_growth: &RevenueGrowth,
) -> Result<CanonicalMetrics, MetricsError> {
    let symbol = normalize_symbol(symbol)?;

    if history.is_empty() {
        return Err(MetricsError::NotFound {
            detail: "no price history in the requested window".to_string(),
            symbol,
        });
    }

    let history: Vec<PriceBar> = history.iter().map(normalize_bar).collect();

    let current_price = info
        .number("regularMarketPrice")
        .or_else(|| info.number("currentPrice"))
        .or_else(|| history.last().map(|bar| bar.close));
    let Some(current_price) = current_price else {
        return Err(MetricsError::NotFound {
            detail: "no current price available".to_string(),
            symbol,
        });
    };

    let name = info
        .text("shortName")
        .or_else(|| info.text("longName"))
        .unwrap_or(&symbol)
        .to_string();

    Ok(CanonicalMetrics {
        name,
        current_price,
        pe_ratio: info
            .number("trailingPE")
            .or_else(|| info.number("forwardPE")),
        eps: info
            .number("trailingEps")
            .or_else(|| info.number("forwardEps")),
        revenue_growth: revenue_growth.value(),
        market_cap: info.number("marketCap").map(|v| v as i64),
        dividend_yield: info.number("dividendYield").map(dividend_yield_percent),
        recommendation: info.text("recommendationKey").map(str::to_string),
        history,
        symbol,
    })
}

fn normalize_bar(bar: &RawPriceBar) -> PriceBar {
    PriceBar {
        date: bar.date,
        open: round2(bar.open),
        high: round2(bar.high),
        low: round2(bar.low),
        close: round2(bar.close),
        volume: bar.volume as u64,
    }
}

pub fn dividend_yield_percent(raw: f64) -> f64 {
    if raw < DIVIDEND_FRACTION_THRESHOLD {
        round2(raw * 100.0)
    } else {
        round2(raw)
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
