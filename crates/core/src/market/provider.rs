use crate::market::types::{FinancialStatement, RawCompanyInfo, RawPriceBar};
use crate::time::window::HistoryWindow;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Market-data source. Implementations must report "valid but empty" answers (unknown
/// symbol, no bars in range) as empty values and reserve `Err` for failed calls.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_info(&self, symbol: &str) -> Result<RawCompanyInfo>;

    /// Daily bars inside `window`, oldest first.
    async fn fetch_history(&self, symbol: &str, window: HistoryWindow) -> Result<Vec<RawPriceBar>>;

    /// Annual statements reported up to `as_of`.
    async fn fetch_annual_financials(
        &self,
        symbol: &str,
        as_of: DateTime<Utc>,
    ) -> Result<FinancialStatement>;
}
