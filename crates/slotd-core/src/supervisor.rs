use std::{sync::Arc, time::Duration};

use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use slotd_exec::{ProcSpec, ScriptOutput, Termination, run_script};
use slotd_model::{
    FailureKind, LaunchFailure, RawFields, Role, SlotId, SlotPhase, SlotStatus, StartReport,
    StopReport,
};

use crate::{
    config::SupervisorConfig,
    error::CoreError,
    launcher::Launcher,
    metrics::{MetricsHandle, noop_metrics},
    registry::{SlotEntry, SlotRegistry},
    writer::ConfigWriter,
};

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Lifecycle supervisor for the slot pool.
///
/// Every operation on a slot holds that slot's lock for its whole duration,
/// so start/update/stop/status on one slot are serialized while different
/// slots proceed independently.
pub struct Supervisor {
    cfg: Arc<SupervisorConfig>,
    registry: SlotRegistry,
    writer: ConfigWriter,
    launcher: Launcher,
    metrics: MetricsHandle,
}

impl Supervisor {
    pub fn new(cfg: SupervisorConfig) -> Result<Self, CoreError> {
        Self::with_metrics(cfg, noop_metrics())
    }

    pub fn with_metrics(cfg: SupervisorConfig, metrics: MetricsHandle) -> Result<Self, CoreError> {
        cfg.validate()?;
        let registry = SlotRegistry::new(cfg.slots);
        let writer = ConfigWriter::new(cfg.clone());
        let cfg = Arc::new(cfg);
        let launcher = Launcher::new(Arc::clone(&cfg), Arc::clone(&metrics));

        info!(slots = cfg.slots, root = %cfg.root.display(), "supervisor ready");
        Ok(Self {
            cfg,
            registry,
            writer,
            launcher,
            metrics,
        })
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    /// Write the slot config, then make sure the companion and the worker run.
    ///
    /// Config errors fail the call before any process is touched. Launch
    /// failures are reported per role in the returned report.
    #[instrument(level = "info", skip(self, fields), fields(slot = %slot))]
    pub async fn start(&self, slot: SlotId, fields: &RawFields) -> Result<StartReport, CoreError> {
        let mut entry = self.registry.lock(slot).await?;
        entry.set_phase(SlotPhase::Starting);
        if let Err(e) = self.writer.write(slot, fields).await {
            entry.settle_phase();
            return Err(e.into());
        }

        let mut report = StartReport::new(slot);

        match self.launcher.launch_companion(slot, &mut entry).await {
            Ok(outcome) => report.companion = Some(outcome),
            Err(e) => {
                warn!(error = %e, "companion launch failed; worker not started");
                report.failures.push(e.to_failure());
                report.failures.push(LaunchFailure {
                    role: Role::Worker,
                    kind: FailureKind::Skipped,
                    message: "worker not started because the companion is not running".into(),
                    script: None,
                });
            }
        }

        if report.companion.is_some() {
            match self.launcher.launch_worker(slot, &mut entry, fields).await {
                Ok(outcome) => report.worker = Some(outcome),
                Err(e) => {
                    warn!(error = %e, "worker launch failed");
                    report.failures.push(e.to_failure());
                }
            }
        }

        let phase = entry.settle_phase();
        debug!(?phase, complete = report.is_complete(), "start finished");
        Ok(report)
    }

    /// Rewrite the slot config. Running processes are left alone.
    #[instrument(level = "info", skip(self, fields), fields(slot = %slot))]
    pub async fn update(&self, slot: SlotId, fields: &RawFields) -> Result<(), CoreError> {
        let _entry = self.registry.lock(slot).await?;
        self.writer.write(slot, fields).await?;
        Ok(())
    }

    /// Terminate both processes, then run the slot's cleanup script.
    ///
    /// Never fails for a valid slot: termination escalates to SIGKILL and
    /// cleanup problems come back as a warning.
    #[instrument(level = "info", skip(self), fields(slot = %slot))]
    pub async fn stop(&self, slot: SlotId) -> Result<StopReport, CoreError> {
        let mut entry = self.registry.lock(slot).await?;
        entry.set_phase(SlotPhase::Stopping);

        let mut report = StopReport::new(slot);
        let mut warnings = Vec::new();
        for role in Role::TEARDOWN {
            self.terminate_role(&mut entry, role, &mut report, &mut warnings)
                .await;
        }

        if let Some(warning) = self.cleanup_script(slot).await {
            warnings.push(warning);
        }
        entry.settle_phase();

        if !warnings.is_empty() {
            report.warning = Some(warnings.join("\n"));
        }
        info!(
            worker_pid = ?report.worker_pid,
            companion_pid = ?report.companion_pid,
            forced = report.forced.len(),
            "slot stopped"
        );
        Ok(report)
    }

    /// Liveness of both processes. Exited handles are reported as not running
    /// but stay in the registry until the next start/stop.
    ///
    /// While a start or stop holds the slot, the last published snapshot is
    /// returned with the in-flight phase instead of waiting for the lock.
    #[instrument(level = "debug", skip(self), fields(slot = %slot))]
    pub async fn status(&self, slot: SlotId) -> Result<SlotStatus, CoreError> {
        let cell = self.registry.get(slot)?;
        loop {
            if let Ok(mut entry) = Arc::clone(&cell).try_lock_owned() {
                return Ok(observe(slot, &mut entry));
            }
            let snapshot = self.registry.snapshot(slot)?;
            if snapshot.phase.is_transitional() {
                debug!(phase = ?snapshot.phase, "slot busy; reporting snapshot");
                return Ok(snapshot.to_status(slot));
            }
            tokio::select! {
                mut entry = Arc::clone(&cell).lock_owned() => {
                    return Ok(observe(slot, &mut entry));
                }
                _ = tokio::time::sleep(STATUS_POLL_INTERVAL) => {}
            }
        }
    }

    /// Status of every slot, in slot order.
    pub async fn status_all(&self) -> Vec<SlotStatus> {
        let mut all = Vec::with_capacity(self.registry.size() as usize);
        for slot in self.registry.slot_ids() {
            if let Ok(status) = self.status(slot).await {
                all.push(status);
            }
        }
        all
    }

    /// Launch every slot's companion without waiting for a start request.
    ///
    /// Failures are logged and skipped.
    pub async fn prestart_companions(&self) {
        let mut tasks = JoinSet::new();
        for slot in self.registry.slot_ids() {
            let Ok(cell) = self.registry.get(slot) else {
                continue;
            };
            let launcher = self.launcher.clone();
            tasks.spawn(async move {
                let mut entry = cell.lock_owned().await;
                entry.set_phase(SlotPhase::Starting);
                match launcher.launch_companion(slot, &mut entry).await {
                    Ok(outcome) => info!(%slot, pid = outcome.pid, "companion prestarted"),
                    Err(e) => warn!(%slot, error = %e, "companion prestart failed"),
                }
                entry.settle_phase();
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "companion prestart task panicked");
            }
        }
    }

    /// Process-wide shutdown hook: terminate everything and run every cleanup script.
    ///
    /// Slots are torn down concurrently with the shorter shutdown grace period.
    /// Errors and panics are swallowed; this never fails.
    pub async fn cleanup_all(&self) {
        info!("cleaning up all slots");
        let mut tasks = JoinSet::new();
        for slot in self.registry.slot_ids() {
            let Ok(cell) = self.registry.get(slot) else {
                continue;
            };
            let cfg = Arc::clone(&self.cfg);
            let metrics = Arc::clone(&self.metrics);
            tasks.spawn(async move {
                let mut entry = cell.lock_owned().await;
                entry.set_phase(SlotPhase::Stopping);
                for role in Role::TEARDOWN {
                    let Some(mut handle) = entry.take(role) else {
                        continue;
                    };
                    match handle.shutdown(cfg.shutdown_timeout).await {
                        Ok(Termination::AlreadyExited) => {}
                        Ok(termination) => {
                            metrics.record_termination(role, termination == Termination::Forced)
                        }
                        Err(e) => debug!(%slot, %role, error = %e, "shutdown termination failed"),
                    }
                }
                let cleaned = match cleanup_spec(&cfg, slot) {
                    Some(spec) => run_script(&spec, ScriptOutput::Discard, cfg.cleanup_timeout)
                        .await
                        .is_ok(),
                    None => false,
                };
                metrics.record_cleanup(!cleaned);
                entry.settle_phase();
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                debug!(error = %e, "slot cleanup task failed");
            }
        }
        info!("all slots cleaned up");
    }

    async fn terminate_role(
        &self,
        entry: &mut SlotEntry,
        role: Role,
        report: &mut StopReport,
        warnings: &mut Vec<String>,
    ) {
        let Some(mut handle) = entry.take(role) else {
            return;
        };
        let pid = handle.pid();

        match handle.shutdown(self.cfg.stop_timeout).await {
            Ok(Termination::AlreadyExited) => {
                debug!(%role, pid, "cleared handle of exited process");
            }
            Ok(termination) => {
                let forced = termination == Termination::Forced;
                *report.pid_mut(role) = Some(pid);
                if forced {
                    report.forced.push(role);
                }
                self.metrics.record_termination(role, forced);
                debug!(%role, pid, forced, "process terminated");
            }
            Err(e) => {
                // Dropping the handle still sends SIGKILL.
                error!(%role, pid, error = %e, "termination failed");
                *report.pid_mut(role) = Some(pid);
                warnings.push(format!("{role} (pid {pid}) termination error: {e}"));
            }
        }
    }

    /// Run the cleanup script and return whatever is worth surfacing.
    async fn cleanup_script(&self, slot: SlotId) -> Option<String> {
        let Some(spec) = cleanup_spec(&self.cfg, slot) else {
            let path = self.cfg.cleanup_path(slot);
            warn!(path = %path.display(), "cleanup script not found");
            self.metrics.record_cleanup(true);
            return Some(format!("cleanup script not found: {}", path.display()));
        };

        let ran = run_script(&spec, ScriptOutput::Capture, self.cfg.cleanup_timeout).await;
        let warning = match ran {
            Ok(outcome) => {
                let remaining = outcome
                    .stderr
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !self.cfg.is_benign_cleanup_line(line))
                    .collect::<Vec<_>>();
                if !outcome.success && remaining.is_empty() {
                    debug!(
                        code = ?outcome.code,
                        "cleanup script exited non-zero with benign output"
                    );
                }
                (!remaining.is_empty()).then(|| remaining.join("\n"))
            }
            Err(e) => Some(format!("cleanup script failed: {e}")),
        };

        if let Some(w) = &warning {
            warn!(warning = %w, "cleanup script reported problems");
        }
        self.metrics.record_cleanup(warning.is_some());
        warning
    }
}

/// Cleanup invocation for `slot`, or `None` when the script is missing.
fn cleanup_spec(cfg: &SupervisorConfig, slot: SlotId) -> Option<ProcSpec> {
    let path = cfg.cleanup_path(slot);
    if !path.is_file() {
        return None;
    }
    let script = std::path::absolute(&path)
        .unwrap_or(path)
        .display()
        .to_string();
    let spec = match &cfg.cleanup_interpreter {
        Some(interpreter) => ProcSpec::new(interpreter.clone()).arg(script),
        None => ProcSpec::new(script),
    };
    Some(spec.cwd(cfg.root.clone()))
}

/// Probe liveness under the slot lock and publish the result.
fn observe(slot: SlotId, entry: &mut SlotEntry) -> SlotStatus {
    entry.settle_phase();
    entry.snapshot().to_status(slot)
}
