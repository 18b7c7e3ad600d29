pub mod domain;
pub mod insight;
pub mod llm;
pub mod market;
pub mod time;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];
    pub const DEFAULT_INSIGHT_LANGUAGE: &str = "Traditional Chinese";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub openai_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub market_data_base_url: Option<String>,
        pub insight_language: String,
        pub cors_allowed_origins: Vec<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                openai_api_key: non_empty_var("OPENAI_API_KEY"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                market_data_base_url: non_empty_var("MARKET_DATA_BASE_URL"),
                insight_language: non_empty_var("INSIGHT_LANGUAGE")
                    .unwrap_or_else(|| DEFAULT_INSIGHT_LANGUAGE.to_string()),
                cors_allowed_origins: parse_origins(non_empty_var("CORS_ALLOWED_ORIGINS")),
            })
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parse_origins(raw: Option<String>) -> Vec<String> {
        let parsed: Vec<String> = raw
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if parsed.is_empty() {
            DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect()
        } else {
            parsed
        }
    }

}
