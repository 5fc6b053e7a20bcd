use prometheus::{IntCounterVec, Opts, Registry, proto::MetricFamily};

use slotd_core::MetricsBackend;
use slotd_model::Role;

/// Supervisor counters registered on a private registry.
///
/// Cloning shares the underlying counters.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    spawned: IntCounterVec,
    terminated: IntCounterVec,
    cleanups: IntCounterVec,
    launch_errors: IntCounterVec,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Register the counters on an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let spawned = IntCounterVec::new(
            Opts::new(
                "slotd_processes_spawned_total",
                "Child processes spawned per role",
            ),
            &["role"],
        )?;
        let terminated = IntCounterVec::new(
            Opts::new(
                "slotd_processes_terminated_total",
                "Child processes terminated per role and termination mode",
            ),
            &["role", "mode"],
        )?;
        let cleanups = IntCounterVec::new(
            Opts::new(
                "slotd_cleanup_runs_total",
                "Cleanup script runs by outcome",
            ),
            &["outcome"],
        )?;
        let launch_errors = IntCounterVec::new(
            Opts::new(
                "slotd_launch_errors_total",
                "Failed process launches per role",
            ),
            &["role"],
        )?;

        registry.register(Box::new(spawned.clone()))?;
        registry.register(Box::new(terminated.clone()))?;
        registry.register(Box::new(cleanups.clone()))?;
        registry.register(Box::new(launch_errors.clone()))?;

        Ok(Self {
            registry,
            spawned,
            terminated,
            cleanups,
            launch_errors,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_spawn(&self, role: Role) {
        self.spawned.with_label_values(&[role.as_str()]).inc();
    }

    fn record_termination(&self, role: Role, forced: bool) {
        let mode = if forced { "forced" } else { "graceful" };
        self.terminated
            .with_label_values(&[role.as_str(), mode])
            .inc();
    }

    fn record_cleanup(&self, warned: bool) {
        let outcome = if warned { "warning" } else { "clean" };
        self.cleanups.with_label_values(&[outcome]).inc();
    }

    fn record_launch_error(&self, role: Role) {
        self.launch_errors.with_label_values(&[role.as_str()]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    fn render(metrics: &PrometheusMetrics) -> String {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&metrics.gather(), &mut buf)
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn counters_carry_role_labels() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_spawn(Role::Worker);
        metrics.record_spawn(Role::Worker);
        metrics.record_spawn(Role::Companion);
        metrics.record_launch_error(Role::Companion);

        let text = render(&metrics);
        assert!(text.contains(r#"slotd_processes_spawned_total{role="worker"} 2"#));
        assert!(text.contains(r#"slotd_processes_spawned_total{role="companion"} 1"#));
        assert!(text.contains(r#"slotd_launch_errors_total{role="companion"} 1"#));
    }

    #[test]
    fn termination_mode_and_cleanup_outcome() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_termination(Role::Worker, true);
        metrics.record_termination(Role::Companion, false);
        metrics.record_cleanup(false);
        metrics.record_cleanup(true);

        let text = render(&metrics);
        assert!(
            text.contains(r#"slotd_processes_terminated_total{mode="forced",role="worker"} 1"#)
        );
        assert!(
            text.contains(r#"slotd_processes_terminated_total{mode="graceful",role="companion"} 1"#)
        );
        assert!(text.contains(r#"slotd_cleanup_runs_total{outcome="clean"} 1"#));
        assert!(text.contains(r#"slotd_cleanup_runs_total{outcome="warning"} 1"#));
    }

    #[test]
    fn double_registration_fails() {
        let registry = Registry::new();
        PrometheusMetrics::with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::with_registry(registry).is_err());
    }
}
