use thiserror::Error;

/// Hard failures of the action runner. Soft action failures (unknown
/// action, missing args, non-zero exits, timeouts) are not errors at this
/// level; they land in the job record.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("bad args: {0}")]
    BadArgs(String),
    #[error("{0}")]
    CatalogMissing(String),
    #[error("job not found")]
    JobNotFound { job_id: String },
    #[error("{0}")]
    Internal(String),
}
