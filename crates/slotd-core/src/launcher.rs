use std::{path::PathBuf, sync::Arc, time::Duration};

use serde_json::Value;
use tokio::{net::TcpStream, time::Instant};
use tracing::{debug, info, instrument, warn};

use slotd_exec::{ProcSpec, ProcessHandle};
use slotd_model::{RawFields, Role, RoleOutcome, SlotId};

use crate::{
    config::SupervisorConfig, error::LaunchError, metrics::MetricsHandle, registry::SlotEntry,
};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Spawns worker and companion processes into a locked slot entry.
///
/// Both launches are idempotent: a live handle is reused as-is.
#[derive(Clone)]
pub struct Launcher {
    cfg: Arc<SupervisorConfig>,
    metrics: MetricsHandle,
}

impl Launcher {
    pub fn new(cfg: Arc<SupervisorConfig>, metrics: MetricsHandle) -> Self {
        Self { cfg, metrics }
    }

    /// Ensure the companion runs, honoring the warm-up barrier after a fresh spawn.
    #[instrument(level = "debug", skip(self, entry), fields(slot = %slot))]
    pub async fn launch_companion(
        &self,
        slot: SlotId,
        entry: &mut SlotEntry,
    ) -> Result<RoleOutcome, LaunchError> {
        if let Some(pid) = entry.live_pid(Role::Companion) {
            debug!(pid, "companion already running");
            return Ok(RoleOutcome {
                pid,
                spawned: false,
            });
        }

        let script = self.resolve(slot, Role::Companion)?;
        let spec = self.script_spec(&script, Vec::new());
        let handle = self.spawn(Role::Companion, &spec)?;
        let pid = handle.pid();
        entry.set(Role::Companion, Some(handle));
        info!(pid, script = %script.display(), "companion started");

        self.warm_up(slot).await;

        if let Some(companion) = entry.get_mut(Role::Companion)
            && !companion.is_alive()
        {
            let status = companion
                .exit_status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown status".to_string());
            entry.take(Role::Companion);
            self.metrics.record_launch_error(Role::Companion);
            return Err(LaunchError::ExitedDuringWarmup {
                role: Role::Companion,
                status,
            });
        }

        Ok(RoleOutcome { pid, spawned: true })
    }

    /// Ensure the worker runs, passing `fields` as command-line flags.
    #[instrument(level = "debug", skip(self, entry, fields), fields(slot = %slot))]
    pub async fn launch_worker(
        &self,
        slot: SlotId,
        entry: &mut SlotEntry,
        fields: &RawFields,
    ) -> Result<RoleOutcome, LaunchError> {
        if let Some(pid) = entry.live_pid(Role::Worker) {
            debug!(pid, "worker already running");
            return Ok(RoleOutcome {
                pid,
                spawned: false,
            });
        }

        let script = self.resolve(slot, Role::Worker)?;
        let spec = self.script_spec(&script, worker_args(slot, fields));
        let handle = self.spawn(Role::Worker, &spec)?;
        let pid = handle.pid();
        entry.set(Role::Worker, Some(handle));
        info!(pid, script = %script.display(), "worker started");

        Ok(RoleOutcome { pid, spawned: true })
    }

    fn resolve(&self, slot: SlotId, role: Role) -> Result<PathBuf, LaunchError> {
        let path = match role {
            Role::Worker => self.cfg.worker_path(slot),
            Role::Companion => self.cfg.companion_path(slot),
        };
        if !path.is_file() {
            warn!(%role, path = %path.display(), "script not found");
            self.metrics.record_launch_error(role);
            return Err(LaunchError::ScriptNotFound { role, path });
        }
        Ok(std::path::absolute(&path).unwrap_or(path))
    }

    fn script_spec(&self, script: &std::path::Path, args: Vec<String>) -> ProcSpec {
        let script = script.display().to_string();
        let spec = match &self.cfg.interpreter {
            Some(interpreter) => ProcSpec::new(interpreter.clone()).arg(script),
            None => ProcSpec::new(script),
        };
        spec.args(args).cwd(self.cfg.root.clone())
    }

    fn spawn(&self, role: Role, spec: &ProcSpec) -> Result<ProcessHandle, LaunchError> {
        match ProcessHandle::spawn(spec) {
            Ok(handle) => {
                self.metrics.record_spawn(role);
                Ok(handle)
            }
            Err(source) => {
                self.metrics.record_launch_error(role);
                Err(LaunchError::Spawn { role, source })
            }
        }
    }

    /// Block the caller until the companion is ready.
    ///
    /// Without a readiness port this is the fixed warm-up delay; with one, the
    /// port is polled and the delay is the upper bound.
    async fn warm_up(&self, slot: SlotId) {
        let Some(port) = self.cfg.companion_ready_port(slot) else {
            debug!(
                warmup_ms = self.cfg.warmup.as_millis() as u64,
                "waiting for companion warm-up"
            );
            tokio::time::sleep(self.cfg.warmup).await;
            return;
        };

        let deadline = Instant::now() + self.cfg.warmup;
        loop {
            if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                debug!(port, "companion is accepting connections");
                return;
            }
            if Instant::now() >= deadline {
                warn!(port, "companion not accepting connections after warm-up; continuing");
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(READY_POLL_INTERVAL.min(remaining)).await;
        }
    }
}

/// Build `--<flag> <value>` pairs for the worker from request fields.
///
/// String values are passed verbatim, so the rival list reaches the worker as
/// the raw comma-joined string under `--Rival`.
pub fn worker_args(slot: SlotId, fields: &RawFields) -> Vec<String> {
    let mut args = Vec::with_capacity(fields.len() * 2);
    for (key, value) in fields {
        args.push(format!("--{}", canonical_flag(key, slot)));
        args.push(arg_value(value));
    }
    args
}

/// Strip the slot number suffix from a request key (`RC3` → `RC` for slot 3).
pub fn canonical_flag(key: &str, slot: SlotId) -> &str {
    let suffix = slot.to_string();
    match key.strip_suffix(suffix.as_str()) {
        Some(base) if !base.is_empty() => base,
        _ => key,
    }
}

fn arg_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
