use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;
use slotd_core::SupervisorConfig;
use slotd_observe::{LoggerConfig, LoggerError, LoggerFormat, LoggerLevel};

#[derive(Parser, Debug)]
#[command(
    name = "slotd",
    version,
    about = "Slot process supervisor with an HTTP control plane",
    long_about = None
)]
pub(crate) struct Args {
    /// HTTP listen address
    #[arg(long, env = "SLOTD_BIND", default_value = "0.0.0.0:5000")]
    pub(crate) bind: SocketAddr,

    /// Deployment root holding slot scripts and config files
    #[arg(long, env = "SLOTD_ROOT", default_value = ".")]
    pub(crate) root: PathBuf,

    /// Number of slots
    #[arg(long, env = "SLOTD_SLOTS", default_value_t = 5)]
    pub(crate) slots: u32,

    /// Interpreter for companion and worker scripts; empty runs scripts directly
    #[arg(long, env = "SLOTD_INTERPRETER", default_value = "node")]
    pub(crate) interpreter: String,

    /// Interpreter for cleanup scripts; empty runs scripts directly
    #[arg(long, env = "SLOTD_CLEANUP_INTERPRETER", default_value = "bash")]
    pub(crate) cleanup_interpreter: String,

    /// Companion warm-up before the worker starts
    #[arg(long, env = "SLOTD_WARMUP_MS", default_value_t = 5_000)]
    pub(crate) warmup_ms: u64,

    /// Grace period between SIGTERM and SIGKILL on stop
    #[arg(long, env = "SLOTD_STOP_TIMEOUT_MS", default_value_t = 5_000)]
    pub(crate) stop_timeout_ms: u64,

    /// Companion of slot N accepts connections on base + N - 1 once ready
    #[arg(long, env = "SLOTD_COMPANION_READY_PORT_BASE")]
    pub(crate) companion_ready_port_base: Option<u16>,

    /// Launch every companion at boot
    #[arg(long, env = "SLOTD_PRESTART_COMPANIONS")]
    pub(crate) prestart_companions: bool,

    /// Upper bound for slot cleanup after the server stops
    #[arg(long, env = "SLOTD_SHUTDOWN_BUDGET_MS", default_value_t = 10_000)]
    pub(crate) shutdown_budget_ms: u64,

    /// Log filter directive (EnvFilter syntax)
    #[arg(long, env = "SLOTD_LOG_LEVEL", default_value = "info")]
    pub(crate) log_level: String,

    /// Log output: text, json or journald
    #[arg(long, env = "SLOTD_LOG_FORMAT", default_value = "text")]
    pub(crate) log_format: String,
}

impl Args {
    pub(crate) fn logger_config(&self) -> Result<LoggerConfig, LoggerError> {
        Ok(LoggerConfig {
            format: self.log_format.parse::<LoggerFormat>()?,
            level: LoggerLevel::new(self.log_level.as_str())?,
            ..Default::default()
        })
    }

    pub(crate) fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            slots: self.slots,
            root: self.root.clone(),
            interpreter: non_empty(&self.interpreter),
            cleanup_interpreter: non_empty(&self.cleanup_interpreter),
            warmup: Duration::from_millis(self.warmup_ms),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
            companion_ready_port_base: self.companion_ready_port_base,
            ..Default::default()
        }
    }

    pub(crate) fn shutdown_budget(&self) -> Duration {
        Duration::from_millis(self.shutdown_budget_ms)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let args = Args::try_parse_from(["slotd"]).unwrap();
        assert_eq!(args.bind, "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert!(!args.prestart_companions);

        let cfg = args.supervisor_config();
        assert_eq!(cfg.slots, 5);
        assert_eq!(cfg.interpreter.as_deref(), Some("node"));
        assert_eq!(cfg.cleanup_interpreter.as_deref(), Some("bash"));
        assert_eq!(cfg.warmup, Duration::from_secs(5));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_interpreter_runs_scripts_directly() {
        let args = Args::try_parse_from(["slotd", "--interpreter", "", "--slots", "2"]).unwrap();
        let cfg = args.supervisor_config();
        assert_eq!(cfg.interpreter, None);
        assert_eq!(cfg.slots, 2);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "slotd",
            "--bind",
            "127.0.0.1:8000",
            "--root",
            "/srv/galaxy",
            "--companion-ready-port-base",
            "8080",
            "--prestart-companions",
            "--shutdown-budget-ms",
            "2500",
        ])
        .unwrap();
        assert!(args.prestart_companions);
        assert_eq!(args.shutdown_budget(), Duration::from_millis(2500));

        let cfg = args.supervisor_config();
        assert_eq!(cfg.root, PathBuf::from("/srv/galaxy"));
        assert_eq!(cfg.companion_ready_port_base, Some(8080));
    }

    #[test]
    fn bad_log_settings_rejected() {
        let args = Args::try_parse_from(["slotd", "--log-format", "xml"]).unwrap();
        assert!(matches!(
            args.logger_config(),
            Err(LoggerError::InvalidFormat(_))
        ));

        let args = Args::try_parse_from(["slotd", "--log-level", "  "]).unwrap();
        assert!(matches!(
            args.logger_config(),
            Err(LoggerError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn bad_bind_address_rejected() {
        assert!(Args::try_parse_from(["slotd", "--bind", "nowhere"]).is_err());
    }
}
