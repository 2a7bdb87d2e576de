// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerSummary, ContainerInfo, RuntimeMetadata, and link normalization.

use crate::types::{ContainerId, ImageId};
use std::collections::HashMap;

/// Summary information about a container.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    /// Container ID.
    pub id: ContainerId,
    /// Container name.
    pub name: String,
}

/// Information about a container, as needed to decide whether to replace it.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Container ID.
    pub id: ContainerId,
    /// Container name, without the leading slash.
    pub name: String,
    /// Registry reference from the container config.
    pub image: String,
    /// ID of the image the container is bound to.
    pub image_id: ImageId,
    /// Names of linked containers, normalized to bare names.
    pub links: Vec<String>,
    /// Labels.
    pub labels: HashMap<String, String>,
}

/// Runtime metadata.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    /// Runtime name (e.g., "Docker", "Podman").
    pub name: String,
    /// Runtime version.
    pub version: String,
    /// API version.
    pub api_version: String,
    /// Operating system.
    pub os: String,
    /// Architecture.
    pub arch: String,
}

/// Reduce a runtime link entry to the name of the linked container.
///
/// Docker records links as `/<target>:/<source>/<alias>`; the dependency is
/// the target.
pub fn link_target(link: &str) -> &str {
    let target = link.split_once(':').map(|(t, _)| t).unwrap_or(link);
    target.trim_start_matches('/')
}
