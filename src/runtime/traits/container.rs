// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: List, inspect, clone, start, stop, remove, and rename containers.

use super::sealed::Sealed;
use super::shared_types::{ContainerInfo, ContainerSummary};
use crate::types::ContainerId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Container lifecycle operations.
#[async_trait]
pub trait ContainerOps: Sealed + Send + Sync {
    /// List containers matching the given filters.
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError>;

    /// Get detailed information about a container.
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError>;

    /// Create a new container carrying the full configuration of `source`.
    ///
    /// The image is resolved from the reference `source` was started with, so
    /// a freshly pulled tag is picked up. The new container is not started.
    async fn clone_container(
        &self,
        source: &ContainerId,
        name: &str,
    ) -> Result<ContainerId, ContainerError>;

    /// Start a created container.
    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Stop a running container, sending `signal` (or the image default) first.
    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
        signal: Option<&str>,
    ) -> Result<(), ContainerError>;

    /// Remove a container.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError>;

    /// Rename a container.
    async fn rename_container(
        &self,
        id: &ContainerId,
        new_name: &str,
    ) -> Result<(), ContainerError>;
}

/// Filters for listing containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Filter by label (key=value).
    pub labels: HashMap<String, String>,
    /// Filter by name (supports partial match).
    pub name: Option<String>,
    /// Include stopped containers.
    pub all: bool,
}

impl ContainerFilters {
    /// Running containers only, no further restriction.
    pub fn running() -> Self {
        Self::default()
    }
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("runtime error: {0}")]
    Runtime(String),
}
