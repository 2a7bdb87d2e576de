// ABOUTME: Errors that abort an update pass.
// ABOUTME: Per-container failures are logged instead and never appear here.

use crate::container::{ClientError, CycleError};

/// A failure that stops the pass before any container is touched.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// The container set could not be enumerated.
    #[error("failed to list containers: {0}")]
    List(#[source] ClientError),

    /// The link graph has a cycle.
    #[error(transparent)]
    DependencyCycle(#[from] CycleError),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateErrorKind {
    List,
    DependencyCycle,
}

impl UpdateError {
    pub fn kind(&self) -> UpdateErrorKind {
        match self {
            UpdateError::List(_) => UpdateErrorKind::List,
            UpdateError::DependencyCycle(_) => UpdateErrorKind::DependencyCycle,
        }
    }
}
