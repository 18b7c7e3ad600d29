use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stock_insight_core::domain::analysis::AnalysisResult;
use stock_insight_core::insight::InsightComposer;
use stock_insight_core::llm::openai::OpenAiClient;
use stock_insight_core::llm::LlmClient;
use stock_insight_core::market::yahoo::YahooFinanceClient;
use stock_insight_core::market::MetricsService;

#[derive(Debug, Parser)]
#[command(name = "stock_insight_cli")]
struct Args {
    /// Ticker symbol, e.g. AAPL or 2330.TW.
    symbol: String,

    /// Also generate the AI summary (requires OPENAI_API_KEY).
    #[arg(long)]
    summary: bool,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stock_insight_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let market = YahooFinanceClient::from_settings(&settings)?;
    let service = MetricsService::new(Arc::new(market));

    let metrics = service
        .fetch_metrics(&args.symbol, chrono::Utc::now())
        .await
        .map_err(|e| {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            err
        })?;
    tracing::info!(
        symbol = %metrics.symbol,
        bars = metrics.history.len(),
        revenue_growth = ?metrics.revenue_growth,
        "fetched metrics"
    );

    let output = if args.summary {
        let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::from_settings(&settings)?);
        let composer = InsightComposer::new(Some(llm), settings.insight_language.clone());
        let summary = composer
            .compose_metrics(&metrics)
            .await
            .context("summary generation failed")?;
        serde_json::to_value(AnalysisResult {
            symbol: metrics.symbol,
            summary,
        })?
    } else {
        serde_json::to_value(&metrics)?
    };

    let text = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{text}");

    Ok(())
}

fn init_sentry(settings: &stock_insight_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
