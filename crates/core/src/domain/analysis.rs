use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of an analysis request. `stock_data` is whatever the caller got back from the
/// metrics endpoint; it is read field by field and never validated as a whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub symbol: String,
    pub stock_data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub summary: String,
}
