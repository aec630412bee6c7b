//! HTTP endpoint handlers for the driver.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/metrics`: Prometheus metrics endpoint
//! - `/health`: Health check endpoint
//! - `/report`: JSON report of the last cycle
//! - `/`: Landing page

pub mod health;
pub mod metrics;
pub mod report;
pub mod root;

// Re-export handlers
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use report::report_handler;
pub use root::root_handler;
