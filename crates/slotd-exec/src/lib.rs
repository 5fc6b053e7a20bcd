//! OS process plumbing for slot supervision.
//!
//! [`ProcessHandle`] owns one spawned child and exposes the primitives the
//! supervisor composes: non-blocking liveness, graceful termination request,
//! bounded wait and force kill. [`run_script`] runs short-lived helper scripts
//! to completion.

mod error;
pub use error::{ExecError, ExecResult};

mod handle;
pub use handle::{ProcessHandle, Termination};

mod script;
pub use script::{ScriptOutcome, ScriptOutput, run_script};

mod spec;
pub use spec::ProcSpec;

mod util;
