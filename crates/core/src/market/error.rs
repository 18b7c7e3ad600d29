use std::fmt;

/// Terminal failures of a metrics lookup.
#[derive(Debug)]
pub enum MetricsError {
    InvalidSymbol,
    /// Unknown symbol, or no tradable history in the request window.
    NotFound { symbol: String, detail: String },
    /// The market-data provider call itself failed.
    Upstream {
        symbol: String,
        stage: &'static str,
        source: anyhow::Error,
    },
}

impl fmt::Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsError::InvalidSymbol => write!(f, "ticker symbol must be non-empty"),
            MetricsError::NotFound { symbol, detail } => {
                write!(f, "symbol not found: {symbol} ({detail})")
            }
            MetricsError::Upstream {
                symbol,
                stage,
                source,
            } => write!(
                f,
                "market data lookup failed (symbol={symbol}, stage={stage}): {source:#}"
            ),
        }
    }
}

impl std::error::Error for MetricsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MetricsError::Upstream { source, .. } => Some(&**source),
            _ => None,
        }
    }
}
