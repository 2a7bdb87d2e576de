// ABOUTME: The container client contract consumed by the update pass.
// ABOUTME: DockerClient implements it on top of the runtime capability traits.

use super::{Container, Filter, UPDATER_LABEL};
use crate::runtime::{ContainerError, ContainerFilters, ContainerOps, ImageError, ImageOps};
use crate::types::{ContainerId, ImageRef, ParseImageRefError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Capabilities the update pass needs from the container runtime.
///
/// Every call may block on the daemon; `start_container` and `stop_container`
/// are bounded by the timeout they are given.
#[async_trait]
pub trait Client: Send + Sync {
    /// Running containers accepted by `filter`.
    async fn list_containers(&self, filter: &Filter) -> Result<Vec<Container>, ClientError>;

    /// Whether a newer image exists for the container's reference.
    async fn is_container_stale(&self, container: &Container) -> Result<bool, ClientError>;

    async fn rename_container(
        &self,
        container: &Container,
        new_name: &str,
    ) -> Result<(), ClientError>;

    /// Start a replacement from the refreshed image under the container's original name.
    async fn start_container(
        &self,
        container: &Container,
        timeout: Duration,
    ) -> Result<(), ClientError>;

    /// Stop the old container and remove it.
    async fn stop_container(
        &self,
        container: &Container,
        timeout: Duration,
    ) -> Result<(), ClientError>;

    /// Remove the image the old container was bound to.
    async fn remove_image(&self, container: &Container) -> Result<(), ClientError>;
}

/// Errors from container client calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("invalid image reference {reference}: {source}")]
    InvalidReference {
        reference: String,
        #[source]
        source: ParseImageRefError,
    },
}

/// Behavior switches for [`DockerClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Compare against local images only, never pulling.
    pub no_pull: bool,
    /// Hostname of the updater process; a container whose ID starts with it is the updater.
    pub hostname: Option<String>,
}

impl ClientOptions {
    /// Options with the hostname taken from the running process.
    pub fn detect(no_pull: bool) -> Self {
        let hostname = gethostname::gethostname()
            .into_string()
            .ok()
            .filter(|h| !h.is_empty());
        Self { no_pull, hostname }
    }
}

/// [`Client`] backed by a Docker-compatible runtime.
pub struct DockerClient<R> {
    runtime: R,
    options: ClientOptions,
}

impl<R: ContainerOps + ImageOps> DockerClient<R> {
    pub fn new(runtime: R, options: ClientOptions) -> Self {
        Self { runtime, options }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    fn is_updater(&self, id: &str, labels: &std::collections::HashMap<String, String>) -> bool {
        let labelled = labels
            .get(UPDATER_LABEL)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        // Inside a container the hostname defaults to the short container ID.
        let by_hostname = self
            .options
            .hostname
            .as_deref()
            .is_some_and(|h| h.len() >= 12 && id.starts_with(h));
        labelled || by_hostname
    }

    /// Force-remove a replacement that did not come up.
    async fn discard(&self, id: &ContainerId, name: &str) {
        match self.runtime.remove_container(id, true).await {
            Ok(()) | Err(ContainerError::NotFound(_)) => {}
            Err(e) => {
                warn!(container = %name, error = %e, "failed to remove unstartable replacement");
            }
        }
    }
}

#[async_trait]
impl<R: ContainerOps + ImageOps> Client for DockerClient<R> {
    async fn list_containers(&self, filter: &Filter) -> Result<Vec<Container>, ClientError> {
        let summaries = self
            .runtime
            .list_containers(&ContainerFilters::running())
            .await?;

        let mut containers = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let info = match self.runtime.inspect_container(&summary.id).await {
                Ok(info) => info,
                Err(ContainerError::NotFound(_)) => {
                    debug!(container = %summary.name, "container disappeared while listing");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let is_self = self.is_updater(info.id.as_str(), &info.labels);
            let container = Container::new(info.id, info.name, info.image, info.image_id)
                .with_links(info.links)
                .with_labels(info.labels)
                .with_self(is_self);

            if filter.matches(&container) {
                containers.push(container);
            }
        }

        Ok(containers)
    }

    async fn is_container_stale(&self, container: &Container) -> Result<bool, ClientError> {
        let reference = ImageRef::parse(container.image_name()).map_err(|source| {
            ClientError::InvalidReference {
                reference: container.image_name().to_string(),
                source,
            }
        })?;

        if reference.is_image_id() {
            debug!(container = %container.name(), "started from an image ID, nothing to resolve");
            return Ok(false);
        }

        if !self.options.no_pull {
            debug!(image = %reference, "pulling image");
            self.runtime.pull_image(&reference).await?;
        }

        let latest = self.runtime.image_id(&reference).await?;
        if &latest == container.image_id() {
            debug!(container = %container.name(), image = %reference, "image is current");
            return Ok(false);
        }

        info!(
            container = %container.name(),
            image = %reference,
            id = latest.short(),
            "found new image"
        );
        Ok(true)
    }

    async fn rename_container(
        &self,
        container: &Container,
        new_name: &str,
    ) -> Result<(), ClientError> {
        debug!(container = %container.name(), new_name, "renaming container");
        self.runtime
            .rename_container(container.id(), new_name)
            .await?;
        Ok(())
    }

    async fn start_container(
        &self,
        container: &Container,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        info!(container = %container.name(), image = %container.image_name(), "starting replacement");

        let deadline = Instant::now() + timeout;

        let cloned = tokio::time::timeout_at(
            deadline,
            self.runtime
                .clone_container(container.id(), container.name()),
        )
        .await;
        let new_id = match cloned {
            Ok(result) => result?,
            Err(_) => {
                // The daemon may still have created it; only the name is known.
                self.discard(&ContainerId::new(container.name()), container.name())
                    .await;
                return Err(ContainerError::Timeout(timeout).into());
            }
        };

        let started = match tokio::time::timeout_at(deadline, self.runtime.start_container(&new_id))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ContainerError::Timeout(timeout)),
        };

        if let Err(e) = started {
            // Free the name again so the old container can be renamed back.
            self.discard(&new_id, container.name()).await;
            return Err(e.into());
        }

        debug!(container = %container.name(), id = new_id.short(), "replacement running");
        Ok(())
    }

    async fn stop_container(
        &self,
        container: &Container,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        info!(container = %container.name(), id = container.id().short(), "stopping old container");

        match self
            .runtime
            .stop_container(container.id(), timeout, container.stop_signal())
            .await
        {
            Ok(()) | Err(ContainerError::NotRunning(_)) => {}
            Err(e) => return Err(e.into()),
        }

        self.runtime.remove_container(container.id(), true).await?;
        Ok(())
    }

    async fn remove_image(&self, container: &Container) -> Result<(), ClientError> {
        info!(container = %container.name(), image = container.image_id().short(), "removing old image");
        self.runtime
            .remove_image(container.image_id(), true)
            .await?;
        Ok(())
    }
}
