pub mod error;
pub mod normalize;
pub mod provider;
pub mod service;
pub mod types;
pub mod yahoo;

pub use error::MetricsError;
pub use normalize::{normalize, normalize_symbol, RevenueGrowth};
pub use provider::MarketDataProvider;
pub use service::MetricsService;
