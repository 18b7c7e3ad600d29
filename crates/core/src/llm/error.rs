use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    /// Provider-supplied error message, when the body follows the `{"error": {"message"}}` shape.
    pub fn provider_message(&self) -> Option<&str> {
        self.raw_response_json
            .as_ref()?
            .get("error")?
            .get("message")?
            .as_str()
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={:?}, stage={}): {}",
            self.provider, self.stage, self.detail
        )?;
        if let Some(message) = self.provider_message() {
            write!(f, ": {message}")?;
        } else if let Some(raw) = self.raw_output.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            write!(f, ": {}", excerpt(raw))?;
        }
        Ok(())
    }
}

impl std::error::Error for LlmDiagnosticsError {}

fn excerpt(text: &str) -> String {
    const MAX: usize = 200;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
