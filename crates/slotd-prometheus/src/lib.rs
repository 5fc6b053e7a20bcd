//! Prometheus metrics backend for the slot supervisor.
//!
//! [`PrometheusMetrics`] implements [`slotd_core::MetricsBackend`] on its own
//! [`Registry`]; hand it to `Supervisor::with_metrics` and serve
//! [`PrometheusMetrics::gather`] from whatever HTTP server the process runs.
//!
//! ## Metrics
//! - `slotd_processes_spawned_total{role}` - Counter
//! - `slotd_processes_terminated_total{role, mode}` - Counter (`mode` is `graceful` or `forced`)
//! - `slotd_cleanup_runs_total{outcome}` - Counter (`outcome` is `clean` or `warning`)
//! - `slotd_launch_errors_total{role}` - Counter

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
