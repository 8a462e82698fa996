//! Operational endpoints: health and Prometheus metrics.

mod health;
mod metrics;
mod routes;

pub use health::{health, BusHealthResponse, HealthResponse};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
