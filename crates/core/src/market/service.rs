use crate::domain::metrics::CanonicalMetrics;
use crate::market::error::MetricsError;
use crate::market::normalize::{normalize, normalize_symbol, RevenueGrowth};
use crate::market::provider::MarketDataProvider;
use crate::time::window::{HistoryWindow, HISTORY_WINDOW_DAYS};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Runs one metrics lookup: info, then history, then the best-effort financial
/// statement, then normalization. Calls are sequential and nothing is cached.
#[derive(Clone)]
pub struct MetricsService {
    provider: Arc<dyn MarketDataProvider>,
    window_days: i64,
}

impl MetricsService {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            window_days: HISTORY_WINDOW_DAYS,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub async fn fetch_metrics(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<CanonicalMetrics, MetricsError> {
        let symbol = normalize_symbol(symbol)?;

        let info = self
            .provider
            .fetch_info(&symbol)
            .await
            .map_err(|source| MetricsError::Upstream {
                symbol: symbol.clone(),
                stage: "info",
                source,
            })?;

        let window = HistoryWindow::trailing(now, self.window_days);
        let history = self
            .provider
            .fetch_history(&symbol, window)
            .await
            .map_err(|source| MetricsError::Upstream {
                symbol: symbol.clone(),
                stage: "history",
                source,
            })?;

        if history.is_empty() {
            return Err(MetricsError::NotFound {
                detail: format!("no price history for the last {} days", self.window_days),
                symbol,
            });
        }

        let revenue_growth = self.revenue_growth(&symbol, now).await;

        let metrics = normalize(&symbol, &info, &history, &revenue_growth)?;
        tracing::debug!(
            symbol = %metrics.symbol,
            bars = metrics.history.len(),
            current_price = metrics.current_price,
            "normalized metrics"
        );
        Ok(metrics)
    }

    async fn revenue_growth(&self, symbol: &str, as_of: DateTime<Utc>) -> RevenueGrowth {
        let growth = match self.provider.fetch_annual_financials(symbol, as_of).await {
            Ok(statement) => RevenueGrowth::from_statement(&statement),
            Err(err) => RevenueGrowth::ProviderError(format!("{err:#}")),
        };

        match &growth {
            RevenueGrowth::Computed(_) => {}
            RevenueGrowth::Unavailable(reason) => {
                tracing::debug!(%symbol, reason, "revenue growth unavailable");
            }
            RevenueGrowth::ProviderError(error) => {
                tracing::warn!(%symbol, %error, "financial statement lookup failed; omitting revenue growth");
            }
        }

        growth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::{FinancialStatement, RawCompanyInfo, RawPriceBar, TOTAL_REVENUE};
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProvider {
        info: Option<RawCompanyInfo>,
        history: Option<Vec<RawPriceBar>>,
        revenues: Option<Vec<Option<f64>>>,
        seen_symbols: Mutex<Vec<String>>,
        seen_window: Mutex<Option<HistoryWindow>>,
        seen_as_of: Mutex<Option<DateTime<Utc>>>,
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for FakeProvider {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_info(&self, symbol: &str) -> anyhow::Result<RawCompanyInfo> {
            self.seen_symbols.lock().unwrap().push(symbol.to_string());
            self.info
                .clone()
                .ok_or_else(|| anyhow::anyhow!("connection reset"))
        }

        async fn fetch_history(
            &self,
            _symbol: &str,
            window: HistoryWindow,
        ) -> anyhow::Result<Vec<RawPriceBar>> {
            *self.seen_window.lock().unwrap() = Some(window);
            self.history
                .clone()
                .ok_or_else(|| anyhow::anyhow!("chart request timed out"))
        }

        async fn fetch_annual_financials(
            &self,
            _symbol: &str,
            as_of: DateTime<Utc>,
        ) -> anyhow::Result<FinancialStatement> {
            *self.seen_as_of.lock().unwrap() = Some(as_of);
            let revenues = self
                .revenues
                .clone()
                .ok_or_else(|| anyhow::anyhow!("timeseries endpoint returned 500"))?;
            let mut line_items = BTreeMap::new();
            line_items.insert(TOTAL_REVENUE.to_string(), revenues);
            Ok(FinancialStatement { line_items })
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap()
    }

    fn bars() -> Vec<RawPriceBar> {
        vec![RawPriceBar {
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            open: 140.0,
            high: 143.0,
            low: 139.5,
            close: 142.37,
            volume: 10_000.0,
        }]
    }

    #[tokio::test]
    async fn financial_statement_failure_still_succeeds() {
        let provider = FakeProvider {
            info: Some(RawCompanyInfo::default()),
            history: Some(bars()),
            revenues: None,
            ..Default::default()
        };
        let service = MetricsService::new(Arc::new(provider));

        let metrics = service.fetch_metrics("aapl", now()).await.unwrap();
        assert_eq!(metrics.symbol, "AAPL");
        assert_eq!(metrics.revenue_growth, None);
        assert_eq!(metrics.current_price, 142.37);
    }

    #[tokio::test]
    async fn computes_revenue_growth_from_statement() {
        let provider = FakeProvider {
            info: Some(
                [("regularMarketPrice", json!(145.0))]
                    .into_iter()
                    .collect(),
            ),
            history: Some(bars()),
            revenues: Some(vec![Some(110.0), Some(100.0)]),
            ..Default::default()
        };
        let service = MetricsService::new(Arc::new(provider));

        let metrics = service.fetch_metrics("aapl", now()).await.unwrap();
        assert_eq!(metrics.revenue_growth, Some(10.0));
        assert_eq!(metrics.current_price, 145.0);
    }

    #[tokio::test]
    async fn empty_history_is_not_found() {
        let provider = FakeProvider {
            info: Some(RawCompanyInfo::default()),
            history: Some(Vec::new()),
            ..Default::default()
        };
        let service = MetricsService::new(Arc::new(provider));

        let err = service.fetch_metrics("zzzz", now()).await.unwrap_err();
        assert!(matches!(err, MetricsError::NotFound { .. }), "{err}");
    }

    #[tokio::test]
    async fn info_failure_is_upstream() {
        let provider = FakeProvider {
            info: None,
            history: Some(bars()),
            ..Default::default()
        };
        let service = MetricsService::new(Arc::new(provider));

        let err = service.fetch_metrics("aapl", now()).await.unwrap_err();
        match err {
            MetricsError::Upstream { stage, symbol, .. } => {
                assert_eq!(stage, "info");
                assert_eq!(symbol, "AAPL");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn history_failure_is_upstream() {
        let provider = Arc::new(FakeProvider {
            info: Some(RawCompanyInfo::default()),
            history: None,
            revenues: Some(vec![Some(110.0), Some(100.0)]),
            ..Default::default()
        });
        let service = MetricsService::new(provider.clone());

        let err = service.fetch_metrics("aapl", now()).await.unwrap_err();
        match err {
            MetricsError::Upstream { stage, ref source, .. } => {
                assert_eq!(stage, "history");
                assert!(source.to_string().contains("timed out"));
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
        assert!(provider.seen_as_of.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn provider_sees_normalized_symbol_and_trailing_window() {
        let provider = Arc::new(FakeProvider {
            info: Some(RawCompanyInfo::default()),
            history: Some(bars()),
            ..Default::default()
        });
        let service = MetricsService::new(provider.clone());

        service.fetch_metrics("  msft ", now()).await.unwrap();

        assert_eq!(*provider.seen_symbols.lock().unwrap(), vec!["MSFT"]);
        let window = provider.seen_window.lock().unwrap().unwrap();
        assert_eq!(window.end, now());
        assert_eq!(window, HistoryWindow::trailing(now(), 365));
        assert_eq!(*provider.seen_as_of.lock().unwrap(), Some(now()));
    }

    #[tokio::test]
    async fn blank_symbol_is_rejected_before_any_call() {
        let provider = Arc::new(FakeProvider::default());
        let service = MetricsService::new(provider.clone());

        let err = service.fetch_metrics("   ", now()).await.unwrap_err();
        assert!(matches!(err, MetricsError::InvalidSymbol));
        assert!(provider.seen_symbols.lock().unwrap().is_empty());
    }
}
