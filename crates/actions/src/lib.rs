//! Action catalog runner.
//!
//! Catalogs are per-app declarative files naming commands the host may
//! launch. Every invocation executes synchronously (or fire-and-forget for
//! detached actions), persists exactly one terminal job record, and answers
//! with the accepted/queued wire contract.

pub mod catalog;
pub mod error;
pub mod executor;
pub mod jobs;
pub mod runner;

pub use catalog::{load_catalog, ActionDefinition, DEFAULT_TIMEOUT_SECONDS};
pub use error::ActionError;
pub use executor::{execute_action, extract_first_json_object, render_command, resolve_action_cwd, ActionRunResult};
pub use jobs::{generate_job_id, job_record_path, read_job_record, write_job_record, ActionJobRecord, JobFailure};
pub use runner::{render_arg_value, ActionRunner};
