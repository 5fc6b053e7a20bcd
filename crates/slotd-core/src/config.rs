use std::{path::PathBuf, time::Duration};

use slotd_model::SlotId;

use crate::error::CoreError;

/// Placeholder substituted with the slot number in file name templates.
pub const SLOT_PLACEHOLDER: &str = "{slot}";

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Number of slots; valid ids are `1..=slots`.
    pub slots: u32,
    /// Deployment root: working directory of every child and base of every relative path.
    pub root: PathBuf,
    /// Interpreter for the worker and companion scripts (`None` executes them directly).
    pub interpreter: Option<String>,
    pub companion_script: String,
    pub worker_script: String,
    /// Interpreter for the cleanup script (`None` executes it directly).
    pub cleanup_interpreter: Option<String>,
    pub cleanup_script: String,
    pub config_file: String,
    /// Barrier after a fresh companion launch.
    pub warmup: Duration,
    /// Grace period between SIGTERM and SIGKILL on `stop`.
    pub stop_timeout: Duration,
    /// Grace period between SIGTERM and SIGKILL on process-wide shutdown.
    pub shutdown_timeout: Duration,
    /// Upper bound for one cleanup script run.
    pub cleanup_timeout: Duration,
    /// When set, the companion of slot N is ready once `127.0.0.1:(base + N - 1)` accepts.
    pub companion_ready_port_base: Option<u16>,
    /// Case-insensitive substrings marking cleanup stderr lines as harmless.
    pub benign_cleanup_patterns: Vec<String>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            slots: 5,
            root: PathBuf::from("."),
            interpreter: Some("node".to_string()),
            companion_script: "test_{slot}.js".to_string(),
            worker_script: "galaxy_{slot}.js".to_string(),
            cleanup_interpreter: Some("bash".to_string()),
            cleanup_script: "killNode_{slot}.sh".to_string(),
            config_file: "config{slot}.json".to_string(),
            warmup: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(3),
            cleanup_timeout: Duration::from_secs(10),
            companion_ready_port_base: None,
            benign_cleanup_patterns: vec![
                "process or namespace".to_string(),
                "process not found".to_string(),
                "no such process".to_string(),
            ],
        }
    }
}

impl SupervisorConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.slots == 0 {
            return Err(CoreError::InvalidConfig("slots must be at least 1".into()));
        }
        for (name, template) in [
            ("companion_script", &self.companion_script),
            ("worker_script", &self.worker_script),
            ("cleanup_script", &self.cleanup_script),
            ("config_file", &self.config_file),
        ] {
            if template.trim().is_empty() {
                return Err(CoreError::InvalidConfig(format!("{name} is empty")));
            }
            if self.slots > 1 && !template.contains(SLOT_PLACEHOLDER) {
                return Err(CoreError::InvalidConfig(format!(
                    "{name} '{template}' must contain {SLOT_PLACEHOLDER} with more than one slot"
                )));
            }
        }
        if let Some(base) = self.companion_ready_port_base
            && u32::from(base) + self.slots - 1 > u32::from(u16::MAX)
        {
            return Err(CoreError::InvalidConfig(format!(
                "companion_ready_port_base {base} overflows for {} slots",
                self.slots
            )));
        }
        if self.stop_timeout.is_zero() || self.shutdown_timeout.is_zero() {
            return Err(CoreError::InvalidConfig(
                "termination timeouts must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn companion_path(&self, slot: SlotId) -> PathBuf {
        self.root.join(render(&self.companion_script, slot))
    }

    pub fn worker_path(&self, slot: SlotId) -> PathBuf {
        self.root.join(render(&self.worker_script, slot))
    }

    pub fn cleanup_path(&self, slot: SlotId) -> PathBuf {
        self.root.join(render(&self.cleanup_script, slot))
    }

    pub fn config_path(&self, slot: SlotId) -> PathBuf {
        self.root.join(render(&self.config_file, slot))
    }

    pub fn companion_ready_port(&self, slot: SlotId) -> Option<u16> {
        let base = self.companion_ready_port_base?;
        let offset = u16::try_from(slot.get().checked_sub(1)?).ok()?;
        base.checked_add(offset)
    }

    pub fn is_benign_cleanup_line(&self, line: &str) -> bool {
        let line = line.to_ascii_lowercase();
        self.benign_cleanup_patterns
            .iter()
            .any(|p| line.contains(&p.to_ascii_lowercase()))
    }
}

fn render(template: &str, slot: SlotId) -> String {
    template.replace(SLOT_PLACEHOLDER, &slot.to_string())
}
