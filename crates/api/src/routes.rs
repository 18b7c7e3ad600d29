use crate::error::ApiError;
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use stock_insight_core::domain::analysis::{AnalysisRequest, AnalysisResult};
use stock_insight_core::domain::metrics::CanonicalMetrics;
use stock_insight_core::insight::InsightComposer;
use stock_insight_core::market::MetricsService;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub metrics: MetricsService,
    pub composer: InsightComposer,
}

pub fn build_app(state: AppState, allowed_origins: &[String]) -> anyhow::Result<Router> {
    Ok(Router::new()
        .route("/api/stock/:symbol", get(get_stock))
        .route("/api/analyze", post(analyze))
        .with_state(state)
        .layer(cors_layer(allowed_origins)?)
        .layer(TraceLayer::new_for_http()))
}

fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin: {o}")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

async fn get_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<CanonicalMetrics>, ApiError> {
    let metrics = state
        .metrics
        .fetch_metrics(&symbol, chrono::Utc::now())
        .await?;

    tracing::info!(
        symbol = %metrics.symbol,
        provider = state.metrics.provider_name(),
        bars = metrics.history.len(),
        "served stock metrics"
    );
    Ok(Json(metrics))
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    // A missing key is reported even when the body is also bad.
    state.composer.ensure_configured()?;

    let Json(req) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let symbol = req.symbol.trim().to_string();
    if symbol.is_empty() {
        return Err(ApiError::bad_request("symbol is required"));
    }

    let summary = state.composer.compose(&symbol, &req.stock_data).await?;
    Ok(Json(AnalysisResult { symbol, summary }))
}
