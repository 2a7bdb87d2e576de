// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Pull, resolve to an image ID, and remove container images.

use super::sealed::Sealed;
use crate::types::{ImageId, ImageRef};
use async_trait::async_trait;

/// Image operations: pull, resolve, remove.
#[async_trait]
pub trait ImageOps: Sealed + Send + Sync {
    /// Pull an image from its registry.
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError>;

    /// Resolve a reference to the ID of the local image it currently names.
    async fn image_id(&self, reference: &ImageRef) -> Result<ImageId, ImageError>;

    /// Remove an image by ID.
    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("image in use, cannot remove: {0}")]
    InUse(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
