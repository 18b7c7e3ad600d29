use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use stock_insight_core::insight::InsightError;
use stock_insight_core::market::MetricsError;

/// Error body shared by every route: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }
}

impl From<MetricsError> for ApiError {
    fn from(err: MetricsError) -> Self {
        let status = match &err {
            MetricsError::InvalidSymbol | MetricsError::Upstream { .. } => StatusCode::BAD_REQUEST,
            MetricsError::NotFound { .. } => StatusCode::NOT_FOUND,
        };
        Self::new(status, err.to_string())
    }
}

impl From<InsightError> for ApiError {
    fn from(err: InsightError) -> Self {
        match err {
            InsightError::Configuration => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, InsightError::Configuration.to_string())
            }
            InsightError::Generation(source) => {
                sentry_anyhow::capture_anyhow(&source);
                let detail = InsightError::Generation(source).to_string();
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, detail = %self.detail, "request failed");
        } else {
            tracing::warn!(status = %self.status, detail = %self.detail, "request rejected");
        }

        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_errors_map_to_client_statuses() {
        let not_found: ApiError = MetricsError::NotFound {
            symbol: "ZZZZ".to_string(),
            detail: "no price history".to_string(),
        }
        .into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert!(not_found.detail.contains("ZZZZ"));

        let upstream: ApiError = MetricsError::Upstream {
            symbol: "AAPL".to_string(),
            stage: "info",
            source: anyhow::anyhow!("connection refused"),
        }
        .into();
        assert_eq!(upstream.status, StatusCode::BAD_REQUEST);
        assert!(upstream.detail.contains("connection refused"));

        let invalid: ApiError = MetricsError::InvalidSymbol.into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn insight_errors_map_to_server_statuses() {
        let config: ApiError = InsightError::Configuration.into();
        assert_eq!(config.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(config.detail.contains("OPENAI_API_KEY"));

        let generation: ApiError = InsightError::Generation(anyhow::anyhow!("quota exceeded")).into();
        assert_eq!(generation.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(generation.detail.contains("quota exceeded"));
    }
}
