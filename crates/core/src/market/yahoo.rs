use crate::config::Settings;
use crate::market::provider::MarketDataProvider;
use crate::market::types::{FinancialStatement, RawCompanyInfo, RawPriceBar, TOTAL_REVENUE};
use crate::time::window::{exchange_date, HistoryWindow};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use yahoo_finance_api as yahoo;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

const ANNUAL_REVENUE_SERIES: &str = "annualTotalRevenue";
const FINANCIALS_LOOKBACK_DAYS: i64 = 10 * 365;

/// Yahoo Finance market data.
///
/// Info records and daily bars go through [`yahoo::YahooConnector`], which negotiates the
/// cookie/crumb pair `quoteSummary` requires. Annual revenue comes from the
/// `fundamentals-timeseries` endpoint, which the connector does not cover, over plain HTTP
/// against `base_url`.
pub struct YahooFinanceClient {
    // `get_ticker_info` refreshes the crumb and needs `&mut`; history only reads.
    connector: RwLock<yahoo::YahooConnector>,
    http: reqwest::Client,
    base_url: String,
    timeout: std::time::Duration,
}

impl YahooFinanceClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .market_data_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("MARKET_DATA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(base_url, std::time::Duration::from_secs(timeout_secs))
    }

    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let connector = yahoo::YahooConnector::new()
            .map_err(|e| anyhow!("failed to build Yahoo Finance connector: {e}"))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            connector: RwLock::new(connector),
            http,
            base_url: base_url.into(),
            timeout,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid market data base url: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("market data base url cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Runs one connector call under the client timeout. `Ok(None)` means Yahoo has no
    /// data for the symbol.
    async fn call<T, E, F>(&self, what: &str, symbol: &str, fut: F) -> Result<Option<T>>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => connector_result(what, symbol, res),
            Err(_) => Err(anyhow!(
                "{what} request for {symbol} timed out after {}s",
                self.timeout.as_secs()
            )),
        }
    }

    /// GET returning `None` on 404, which Yahoo uses for unknown symbols.
    async fn get_json(&self, url: Url, query: &[(&str, String)]) -> Result<Option<Value>> {
        let path = url.path().to_string();
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("market data request failed: {path}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;

        if status == StatusCode::NOT_FOUND {
            tracing::debug!(%path, "market data returned 404");
            return Ok(None);
        }
        if !status.is_success() {
            anyhow::bail!("market data HTTP {status} for {path}: {}", preview(&text));
        }

        let raw = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("market data response is not valid JSON: {}", preview(&text)))?;
        Ok(Some(raw))
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooFinanceClient {
    fn provider_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch_info(&self, symbol: &str) -> Result<RawCompanyInfo> {
        let summary = {
            let mut connector = self.connector.write().await;
            self.call("ticker info", symbol, connector.get_ticker_info(symbol))
                .await?
        };
        let Some(data) = summary
            .and_then(|s| s.quote_summary)
            .and_then(|qs| qs.result)
            .and_then(|r| r.into_iter().next())
        else {
            return Ok(RawCompanyInfo::default());
        };

        let fd = data.financial_data.as_ref();
        let sd = data.summary_detail.as_ref();
        let ks = data.default_key_statistics.as_ref();
        let qt = data.quote_type.as_ref();

        // Module order decides which source wins for a shared key.
        Ok(merge_fields([
            ("currentPrice", field(fd.and_then(|f| f.current_price))),
            ("recommendationKey", field(fd.and_then(|f| f.recommendation_key.clone()))),
            ("trailingPE", field(sd.and_then(|s| s.trailing_pe))),
            ("forwardPE", field(sd.and_then(|s| s.forward_pe))),
            ("dividendYield", field(sd.and_then(|s| s.dividend_yield))),
            ("marketCap", field(sd.and_then(|s| s.market_cap))),
            ("forwardPE", field(ks.and_then(|k| k.forward_pe))),
            ("trailingEps", field(ks.and_then(|k| k.trailing_eps))),
            ("forwardEps", field(ks.and_then(|k| k.forward_eps))),
            ("shortName", field(qt.and_then(|q| q.short_name.clone()))),
            ("longName", field(qt.and_then(|q| q.long_name.clone()))),
        ]))
    }

    async fn fetch_history(&self, symbol: &str, window: HistoryWindow) -> Result<Vec<RawPriceBar>> {
        let start = OffsetDateTime::from_unix_timestamp(window.period1())
            .with_context(|| format!("invalid window start {}", window.start))?;
        let end = OffsetDateTime::from_unix_timestamp(window.period2())
            .with_context(|| format!("invalid window end {}", window.end))?;

        let response = {
            let connector = self.connector.read().await;
            self.call("chart", symbol, connector.get_quote_history(symbol, start, end))
                .await?
        };
        let Some(response) = response else {
            return Ok(Vec::new());
        };
        let Some(quotes) = connector_result("chart", symbol, response.quotes())? else {
            return Ok(Vec::new());
        };

        let gmt_offset = match response.metadata() {
            Ok(meta) => meta.gmtoffset,
            Err(e) => {
                tracing::debug!(%symbol, error = %e, "chart metadata unavailable; dating bars in UTC");
                0
            }
        };

        daily_bars(
            quotes.iter().map(|q| ChartRow {
                timestamp: q.timestamp as i64,
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume as f64,
            }),
            gmt_offset,
        )
    }

    async fn fetch_annual_financials(
        &self,
        symbol: &str,
        as_of: DateTime<Utc>,
    ) -> Result<FinancialStatement> {
        let url = self.url(&[
            "ws",
            "fundamentals-timeseries",
            "v1",
            "finance",
            "timeseries",
            symbol,
        ])?;
        let query = [
            ("type", ANNUAL_REVENUE_SERIES.to_string()),
            (
                "period1",
                (as_of - Duration::days(FINANCIALS_LOOKBACK_DAYS))
                    .timestamp()
                    .to_string(),
            ),
            ("period2", as_of.timestamp().to_string()),
        ];
        match self.get_json(url, &query).await? {
            Some(raw) => parse_annual_revenue(&raw),
            None => Ok(FinancialStatement::default()),
        }
    }
}

/// Maps a connector result, treating Yahoo's "no such symbol / no rows" answers as
/// `Ok(None)`.
fn connector_result<T, E: fmt::Display>(
    what: &str,
    symbol: &str,
    res: std::result::Result<T, E>,
) -> Result<Option<T>> {
    match res {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            let message = e.to_string();
            if is_missing_data(&message) {
                tracing::debug!(%symbol, what, error = %message, "no market data for symbol");
                Ok(None)
            } else {
                Err(anyhow!("{what} request failed for {symbol}: {message}"))
            }
        }
    }
}

// The connector only reports these through its error text.
fn is_missing_data(message: &str) -> bool {
    const MARKERS: [&str; 6] = [
        "404",
        "not found",
        "no quotes",
        "no result",
        "empty data set",
        "no data",
    ];
    let message = message.to_ascii_lowercase();
    MARKERS.iter().any(|m| message.contains(m))
}

fn field<T: Serialize>(value: Option<T>) -> Option<Value> {
    value
        .and_then(|v| serde_json::to_value(v).ok())
        .filter(|v| !v.is_null())
}

/// Builds the info record; the first value seen for a key wins.
fn merge_fields<'a>(fields: impl IntoIterator<Item = (&'a str, Option<Value>)>) -> RawCompanyInfo {
    let mut info = RawCompanyInfo::default();
    for (key, value) in fields {
        if let Some(value) = value {
            info.0.entry(key.to_string()).or_insert(value);
        }
    }
    info
}

struct ChartRow {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// One bar per exchange-local date, oldest first. When several rows share a date the
/// latest timestamp wins, so an intraday update replaces the session-open bar.
fn daily_bars(rows: impl IntoIterator<Item = ChartRow>, gmt_offset: i32) -> Result<Vec<RawPriceBar>> {
    let mut rows: Vec<ChartRow> = rows.into_iter().collect();
    rows.sort_by_key(|r| r.timestamp);

    let mut by_date: BTreeMap<NaiveDate, RawPriceBar> = BTreeMap::new();
    for row in rows {
        let date = exchange_date(row.timestamp, gmt_offset)
            .with_context(|| format!("invalid bar timestamp {}", row.timestamp))?;
        by_date.insert(
            date,
            RawPriceBar {
                date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            },
        );
    }
    Ok(by_date.into_values().collect())
}

/// Annual total revenue from a `fundamentals-timeseries` response, most recent first.
pub fn parse_annual_revenue(raw: &Value) -> Result<FinancialStatement> {
    let timeseries = raw
        .get("timeseries")
        .context("timeseries response is missing `timeseries`")?;

    if let Some(err) = timeseries.get("error").filter(|e| !e.is_null()) {
        return Err(anyhow!("timeseries error: {err}"));
    }

    let results = timeseries
        .get("result")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut observations: Vec<(String, Option<f64>)> = results
        .iter()
        .filter_map(|r| r.get(ANNUAL_REVENUE_SERIES).and_then(Value::as_array))
        .flatten()
        .filter_map(|point| {
            let as_of = point.get("asOfDate")?.as_str()?.to_string();
            let value = point
                .get("reportedValue")
                .and_then(|v| v.get("raw"))
                .and_then(Value::as_f64);
            Some((as_of, value))
        })
        .collect();

    // ISO dates sort lexicographically.
    observations.sort_by(|a, b| b.0.cmp(&a.0));

    let mut statement = FinancialStatement::default();
    if !observations.is_empty() {
        statement.line_items.insert(
            TOTAL_REVENUE.to_string(),
            observations.into_iter().map(|(_, v)| v).collect(),
        );
    }
    Ok(statement)
}

fn preview(text: &str) -> String {
    const MAX: usize = 300;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
