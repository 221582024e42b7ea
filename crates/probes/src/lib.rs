//! Platform-level primitives the status engine and action runner build on:
//! process lookup by name, TCP connect probes and subprocess execution with
//! captured output.
//!
//! The status engine consumes these through the [`StatusProbes`] trait so
//! tests can substitute deterministic results.

pub mod exec;
pub mod port;
pub mod process;

pub use exec::{run_command, ExecError, RunCapabilities, RunOutcome, RunRequest};
pub use port::check_port_listening;
pub use process::{query_process_by_name, ProcessQuery, StatusProbes, SystemProbes};
