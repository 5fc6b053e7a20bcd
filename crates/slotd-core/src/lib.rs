pub mod config;
pub use config::SupervisorConfig;

pub mod error;
pub use error::{ConfigError, CoreError, LaunchError};

pub mod metrics;
pub use metrics::{MetricsBackend, MetricsHandle, NoOpMetrics};

pub mod registry;
pub use registry::{SlotEntry, SlotRegistry, SlotSnapshot};

pub mod writer;
pub use writer::ConfigWriter;

pub mod launcher;
pub use launcher::Launcher;

pub mod supervisor;
pub use supervisor::Supervisor;
