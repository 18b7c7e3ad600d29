//! Turns a metrics payload into a short analyst-style summary via the configured
//! language model.

use crate::domain::metrics::CanonicalMetrics;
use crate::llm::{ChatMessage, ChatRequest, LlmClient};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub const PLACEHOLDER: &str = "N/A";

const MAX_TOKENS: u32 = 400;
const TEMPERATURE: f32 = 0.6;

// (label, key in the metrics payload)
const METRIC_FIELDS: [(&str, &str); 8] = [
    ("Company name", "name"),
    ("Current price", "current_price"),
    ("P/E ratio", "pe_ratio"),
    ("EPS", "eps"),
    ("Revenue growth (%)", "revenue_growth"),
    ("Market cap", "market_cap"),
    ("Dividend yield (%)", "dividend_yield"),
    ("Analyst recommendation", "recommendation"),
];

#[derive(Debug)]
pub enum InsightError {
    /// No language-model credential was configured.
    Configuration,
    Generation(anyhow::Error),
}

impl fmt::Display for InsightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightError::Configuration => write!(
                f,
                "OPENAI_API_KEY is not configured; set it in the environment and restart the service"
            ),
            InsightError::Generation(err) => write!(f, "AI analysis failed: {err:#}"),
        }
    }
}

impl std::error::Error for InsightError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InsightError::Configuration => None,
            InsightError::Generation(err) => Some(&**err),
        }
    }
}

#[derive(Clone)]
pub struct InsightComposer {
    llm: Option<Arc<dyn LlmClient>>,
    language: String,
}

impl InsightComposer {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, language: impl Into<String>) -> Self {
        Self {
            llm,
            language: language.into(),
        }
    }

    /// Fails fast with `Configuration` when no client is set; callers check this
    /// before doing any other work so a missing key always wins.
    pub fn ensure_configured(&self) -> Result<&dyn LlmClient, InsightError> {
        self.llm.as_deref().ok_or(InsightError::Configuration)
    }

    pub fn system_prompt(&self) -> String {
        [
            "You are a professional investment analyst.".to_string(),
            format!(
                "Using the fundamental stock data provided, write an investment insight summary of about 200 words in {}.",
                self.language
            ),
            "Cover: a brief evaluation, risk disclosure, and a suggested investment direction.".to_string(),
            "Keep the tone professional but easy to read, and avoid being overly optimistic or pessimistic.".to_string(),
        ]
        .join(" ")
    }

    pub fn user_prompt(symbol: &str, stock_data: &Value) -> String {
        format!(
            "Write an investment insight summary based on the following stock data:\n\n{}",
            render_metrics(symbol, stock_data)
        )
    }

    pub async fn compose(&self, symbol: &str, stock_data: &Value) -> Result<String, InsightError> {
        let llm = self.ensure_configured()?;

        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(self.system_prompt()),
                ChatMessage::user(Self::user_prompt(symbol, stock_data)),
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let text = llm
            .complete(request)
            .await
            .map_err(InsightError::Generation)?;

        tracing::info!(
            %symbol,
            provider = ?llm.provider(),
            chars = text.chars().count(),
            "generated insight summary"
        );
        Ok(text.trim().to_string())
    }

    pub async fn compose_metrics(&self, metrics: &CanonicalMetrics) -> Result<String, InsightError> {
        let stock_data = serde_json::to_value(metrics)
            .map_err(|e| InsightError::Generation(anyhow::Error::new(e)))?;
        self.compose(&metrics.symbol, &stock_data).await
    }
}

/// Fixed-field text block; every field is read independently and falls back to
/// the placeholder when missing or null.
pub fn render_metrics(symbol: &str, stock_data: &Value) -> String {
    let mut lines = Vec::with_capacity(METRIC_FIELDS.len() + 1);
    lines.push(format!("Ticker symbol: {symbol}"));
    for (label, key) in METRIC_FIELDS {
        lines.push(format!("{label}: {}", field_text(stock_data.get(key))));
    }
    lines.join("\n")
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => PLACEHOLDER.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => PLACEHOLDER.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
