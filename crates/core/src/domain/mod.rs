pub mod analysis;
pub mod metrics;
