// ABOUTME: Summary of what one update pass did.
// ABOUTME: Serializable so the CLI can emit it as JSON.

use serde::Serialize;

/// Outcome of a completed pass, by container name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// Containers enumerated.
    pub scanned: usize,
    /// Containers with a newer image.
    pub stale: Vec<String>,
    /// Containers marked stale because a dependency is replaced.
    pub dependents: Vec<String>,
    /// Replacements started successfully.
    pub started: Vec<String>,
    /// Old containers stopped and removed.
    pub stopped: Vec<String>,
    /// Containers whose rename, start, or stop failed.
    pub failed: Vec<String>,
}

impl UpdateReport {
    /// True when the pass changed nothing.
    pub fn is_noop(&self) -> bool {
        self.started.is_empty() && self.stopped.is_empty()
    }
}
