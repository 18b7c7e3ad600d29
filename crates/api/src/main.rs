use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stock_insight_core::insight::InsightComposer;
use stock_insight_core::llm::openai::OpenAiClient;
use stock_insight_core::llm::LlmClient;
use stock_insight_core::market::yahoo::YahooFinanceClient;
use stock_insight_core::market::MetricsService;

mod error;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stock_insight_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let market = YahooFinanceClient::from_settings(&settings)?;

    let llm: Option<Arc<dyn LlmClient>> = match OpenAiClient::from_settings(&settings) {
        Ok(client) => {
            tracing::info!(model = client.model(), "OpenAI client configured");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "OpenAI client unavailable; /api/analyze will return 503");
            None
        }
    };

    let state = routes::AppState {
        metrics: MetricsService::new(Arc::new(market)),
        composer: InsightComposer::new(llm, settings.insight_language.clone()),
    };
    let app = routes::build_app(state, &settings.cors_allowed_origins)?;

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, origins = ?settings.cors_allowed_origins, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
