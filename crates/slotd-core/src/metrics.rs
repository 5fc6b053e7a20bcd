use std::sync::Arc;

use slotd_model::Role;

/// Sink for supervisor counters. Every method defaults to a no-op.
pub trait MetricsBackend: Send + Sync + 'static {
    fn record_spawn(&self, _role: Role) {}
    fn record_termination(&self, _role: Role, _forced: bool) {}
    fn record_cleanup(&self, _warned: bool) {}
    fn record_launch_error(&self, _role: Role) {}
}

pub type MetricsHandle = Arc<dyn MetricsBackend>;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {}

pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
