use thiserror::Error;

/// Failure modes of the status engine, each with a fixed wire code.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status spec file not found: {0}")]
    SpecMissing(String),
    #[error("invalid status spec: {0}")]
    SpecInvalid(String),
    #[error("status collection failed: {0}")]
    CollectFailed(String),
    #[error("status snapshot write failed: {0}")]
    SnapshotWriteFailed(String),
}

impl StatusError {
    pub fn wire_code(&self) -> &'static str {
        match self {
            StatusError::SpecInvalid(_) => "E_INTERNAL",
            StatusError::SpecMissing(_)
            | StatusError::CollectFailed(_)
            | StatusError::SnapshotWriteFailed(_) => "E_NATIVE_UNAVAILABLE",
        }
    }

    pub(crate) fn for_operation(self, field: &str) -> Self {
        let prefix = |message: String| format!("operation {field} failed: {message}");
        match self {
            StatusError::SpecInvalid(message) => StatusError::SpecInvalid(prefix(message)),
            StatusError::CollectFailed(message) => StatusError::CollectFailed(prefix(message)),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes() {
        assert_eq!(
            StatusError::SpecMissing(String::new()).wire_code(),
            "E_NATIVE_UNAVAILABLE"
        );
        assert_eq!(
            StatusError::SpecInvalid(String::new()).wire_code(),
            "E_INTERNAL"
        );
        assert_eq!(
            StatusError::SnapshotWriteFailed(String::new()).wire_code(),
            "E_NATIVE_UNAVAILABLE"
        );
    }
}
