// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Supports both Docker and Podman via Docker-compatible API.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    ContainerError, ContainerFilters, ContainerInfo, ContainerOps, ContainerSummary, ImageError, ImageOps, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
    link_target,
};
use crate::runtime::types::{RuntimeEndpoint, RuntimeType};
use crate::types::{ContainerId, ImageId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{
    ContainerConfig as ModelContainerConfig, ContainerCreateBody, EndpointSettings, NetworkingConfig,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, RemoveImageOptions, RenameContainerOptions, StopContainerOptions,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

/// Seconds the HTTP client waits on the daemon before giving up.
const CLIENT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_image_pull_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    ImageError::PullFailed(format!("{}: {}", image_name, e))
}

fn map_image_inspect_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            ImageError::NotFound(image_name.to_string())
        }
        _ => ImageError::Runtime(format!("failed to inspect {}: {}", image_name, e)),
    }
}

fn map_image_remove_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            ImageError::NotFound(image_name.to_string())
        }
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 409 =>
        {
            ImageError::InUse(image_name.to_string())
        }
        _ => ImageError::Runtime(format!("failed to remove {}: {}", image_name, e)),
    }
}

fn map_container_create_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::ImageNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ContainerError::AlreadyExists(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_start_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::AlreadyRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_stop_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::NotRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_rename_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ContainerError::AlreadyExists(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
///
/// Supports both Docker and Podman via Docker-compatible API.
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
}

impl BollardRuntime {
    /// Create a new BollardRuntime from a Docker client.
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
        }
    }

    /// Connect to a runtime found by [`detect_local`](crate::runtime::detect_local).
    pub fn connect(endpoint: &RuntimeEndpoint) -> Result<Self, RuntimeInfoError> {
        let client = Docker::connect_with_unix(
            &endpoint.socket_path,
            CLIENT_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(client, endpoint.runtime_type))
    }

    /// Get the runtime type (Docker or Podman).
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    /// Image defaults for the image a container is bound to, if still present.
    async fn image_defaults(&self, image_id: &str) -> Option<ModelContainerConfig> {
        match self.client.inspect_image(image_id).await {
            Ok(image) => image.config.map(|c| ModelContainerConfig {
                cmd: c.cmd,
                entrypoint: c.entrypoint,
                env: c.env,
                labels: c.labels,
                working_dir: c.working_dir,
                user: c.user,
                ..Default::default()
            }),
            Err(e) => {
                tracing::debug!(image = image_id, error = %e, "could not inspect old image");
                None
            }
        }
    }
}

/// Build the create request for a replacement of an inspected container.
///
/// Settings the container merely inherited from its old image are dropped so
/// the new image's defaults take effect.
fn replacement_body(
    source_id: &str,
    config: ModelContainerConfig,
    image_defaults: Option<&ModelContainerConfig>,
    host_config: Option<bollard::models::HostConfig>,
    networks: HashMap<String, EndpointSettings>,
) -> ContainerCreateBody {
    let defaults = image_defaults.cloned().unwrap_or_default();

    let unless_default = |value: Option<Vec<String>>, default: &Option<Vec<String>>| {
        if value.is_some() && &value == default {
            None
        } else {
            value
        }
    };

    let env = config.env.map(|env| {
        let inherited = defaults.env.clone().unwrap_or_default();
        env.into_iter()
            .filter(|e| !inherited.contains(e))
            .collect::<Vec<_>>()
    });

    let labels = config.labels.map(|labels| {
        let inherited = defaults.labels.clone().unwrap_or_default();
        labels
            .into_iter()
            .filter(|(k, v)| inherited.get(k) != Some(v))
            .collect::<HashMap<_, _>>()
    });

    let working_dir = config.working_dir.filter(|w| Some(w) != defaults.working_dir.as_ref());
    let user = config.user.filter(|u| Some(u) != defaults.user.as_ref());

    // The default hostname is the short container ID; a copy would make the
    // replacement claim its predecessor's identity.
    let hostname = config
        .hostname
        .filter(|h| !h.is_empty() && !source_id.starts_with(h.as_str()));

    let network_mode = host_config
        .as_ref()
        .and_then(|h| h.network_mode.clone())
        .unwrap_or_default();
    let networking_config = if networks.is_empty()
        || network_mode == "host"
        || network_mode == "none"
        || network_mode.starts_with("container:")
    {
        None
    } else {
        let short_id = source_id.get(..12).unwrap_or(source_id);
        let endpoints = networks
            .into_iter()
            .map(|(name, endpoint)| {
                let aliases = endpoint
                    .aliases
                    .map(|a| a.into_iter().filter(|a| a != short_id).collect());
                (
                    name,
                    EndpointSettings {
                        aliases,
                        links: endpoint.links,
                        ipam_config: endpoint.ipam_config,
                        ..Default::default()
                    },
                )
            })
            .collect();
        Some(NetworkingConfig {
            endpoints_config: Some(endpoints),
        })
    };

    ContainerCreateBody {
        hostname,
        domainname: config.domainname,
        user,
        env,
        cmd: unless_default(config.cmd, &defaults.cmd),
        entrypoint: unless_default(config.entrypoint, &defaults.entrypoint),
        image: config.image,
        labels,
        working_dir,
        exposed_ports: config.exposed_ports,
        volumes: config.volumes,
        healthcheck: config.healthcheck,
        tty: config.tty,
        open_stdin: config.open_stdin,
        stop_signal: config.stop_signal,
        stop_timeout: config.stop_timeout,
        host_config,
        networking_config,
        ..Default::default()
    }
}

impl Sealed for BollardRuntime {}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        let name = match self.runtime_type {
            RuntimeType::Docker => "Docker".to_string(),
            RuntimeType::Podman => "Podman".to_string(),
        };

        Ok(RuntimeMetadata {
            name,
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.operating_system.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let image_name = reference.to_string();

        let opts = CreateImageOptions {
            from_image: Some(image_name.clone()),
            ..Default::default()
        };

        // Pull returns a stream of progress updates - consume it
        let mut stream = self.client.create_image(Some(opts), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| map_image_pull_error(e, &image_name))?;
        }

        Ok(())
    }

    async fn image_id(&self, reference: &ImageRef) -> Result<ImageId, ImageError> {
        let image_name = reference.to_string();

        let image = self
            .client
            .inspect_image(&image_name)
            .await
            .map_err(|e| map_image_inspect_error(e, &image_name))?;

        image
            .id
            .map(ImageId::new)
            .ok_or_else(|| ImageError::Runtime(format!("{} has no image ID", image_name)))
    }

    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError> {
        let opts = RemoveImageOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_image(id.as_str(), Some(opts), None)
            .await
            .map_err(|e| map_image_remove_error(e, id.as_str()))?;

        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();

        if let Some(ref name) = filters.name {
            filter_map.insert("name".to_string(), vec![name.clone()]);
        }

        for (key, value) in &filters.labels {
            filter_map
                .entry("label".to_string())
                .or_default()
                .push(format!("{}={}", key, value));
        }

        let opts = ListContainersOptions {
            all: filters.all,
            filters: Some(filter_map),
            ..Default::default()
        };

        // Podman reports "stopping" as a container state during shutdown, but bollard
        // doesn't recognize it and fails deserialization. Retry after a short delay
        // since "stopping" is a transient state.
        let mut last_error = None;
        for attempt in 0..3 {
            match self.client.list_containers(Some(opts.clone())).await {
                Ok(containers) => {
                    return Ok(containers
                        .into_iter()
                        .map(|c| {
                            let name = c
                                .names
                                .unwrap_or_default()
                                .first()
                                .map(|n| n.trim_start_matches('/').to_string())
                                .unwrap_or_default();

                            ContainerSummary {
                                id: ContainerId::new(c.id.unwrap_or_default()),
                                name,
                            }
                        })
                        .collect());
                }
                Err(e) => {
                    let err_str = e.to_string();
                    if (err_str.contains("unknown variant `stopping`")
                        || err_str.contains("unknown variant `stopped`"))
                        && attempt < 2
                    {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        last_error = Some(err_str);
                        continue;
                    }
                    return Err(ContainerError::Runtime(err_str));
                }
            }
        }

        Err(ContainerError::Runtime(
            last_error.unwrap_or_else(|| "list_containers failed".to_string()),
        ))
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let links = details
            .host_config
            .as_ref()
            .and_then(|h| h.links.as_ref())
            .map(|links| links.iter().map(|l| link_target(l).to_string()).collect())
            .unwrap_or_default();

        let image_id = details.image.clone().ok_or_else(|| {
            ContainerError::Runtime(format!("container {} reports no image ID", id))
        })?;

        let config = details.config.unwrap_or_default();

        Ok(ContainerInfo {
            id: ContainerId::new(details.id.unwrap_or_else(|| id.to_string())),
            name: details
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: config.image.unwrap_or_default(),
            image_id: ImageId::new(image_id),
            links,
            labels: config.labels.unwrap_or_default(),
        })
    }

    async fn clone_container(
        &self,
        source: &ContainerId,
        name: &str,
    ) -> Result<ContainerId, ContainerError> {
        let details = self
            .client
            .inspect_container(source.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let defaults = match details.image.as_deref() {
            Some(image_id) => self.image_defaults(image_id).await,
            None => None,
        };

        let networks = details
            .network_settings
            .and_then(|n| n.networks)
            .unwrap_or_default();

        let body = replacement_body(
            source.as_str(),
            details.config.unwrap_or_default(),
            defaults.as_ref(),
            details.host_config,
            networks,
        );

        let opts = CreateContainerOptions {
            name: Some(name.to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), body)
            .await
            .map_err(map_container_create_error)?;

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(
                id.as_str(),
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
            .map_err(map_container_start_error)
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
        signal: Option<&str>,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(i32::try_from(timeout.as_secs()).unwrap_or(i32::MAX)),
            signal: signal.map(str::to_string),
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_stop_error)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_not_found_error)
    }

    async fn rename_container(
        &self,
        id: &ContainerId,
        new_name: &str,
    ) -> Result<(), ContainerError> {
        self.client
            .rename_container(
                id.as_str(),
                RenameContainerOptions {
                    name: new_name.to_string(),
                },
            )
            .await
            .map_err(map_container_rename_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::HostConfig;

    const SOURCE_ID: &str = "0123456789abcdef0123456789abcdef";

    fn strings(values: &[&str]) -> Option<Vec<String>> {
        Some(values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn replacement_drops_inherited_settings() {
        let config = ModelContainerConfig {
            image: Some("nginx:latest".to_string()),
            cmd: strings(&["nginx", "-g", "daemon off;"]),
            env: strings(&["PATH=/usr/bin", "APP_MODE=prod"]),
            working_dir: Some("/".to_string()),
            ..Default::default()
        };
        let defaults = ModelContainerConfig {
            cmd: strings(&["nginx", "-g", "daemon off;"]),
            env: strings(&["PATH=/usr/bin"]),
            working_dir: Some("/".to_string()),
            ..Default::default()
        };

        let body = replacement_body(SOURCE_ID, config, Some(&defaults), None, HashMap::new());

        assert_eq!(body.image.as_deref(), Some("nginx:latest"));
        assert!(body.cmd.is_none());
        assert!(body.working_dir.is_none());
        assert_eq!(body.env, strings(&["APP_MODE=prod"]));
    }

    #[test]
    fn replacement_keeps_overrides() {
        let config = ModelContainerConfig {
            cmd: strings(&["serve", "--port", "9000"]),
            ..Default::default()
        };
        let defaults = ModelContainerConfig {
            cmd: strings(&["serve"]),
            ..Default::default()
        };

        let body = replacement_body(SOURCE_ID, config, Some(&defaults), None, HashMap::new());
        assert_eq!(body.cmd, strings(&["serve", "--port", "9000"]));
    }

    #[test]
    fn replacement_drops_id_hostname() {
        let config = ModelContainerConfig {
            hostname: Some("0123456789ab".to_string()),
            ..Default::default()
        };
        let body = replacement_body(SOURCE_ID, config, None, None, HashMap::new());
        assert!(body.hostname.is_none());

        let config = ModelContainerConfig {
            hostname: Some("web".to_string()),
            ..Default::default()
        };
        let body = replacement_body(SOURCE_ID, config, None, None, HashMap::new());
        assert_eq!(body.hostname.as_deref(), Some("web"));
    }

    #[test]
    fn replacement_skips_networks_in_host_mode() {
        let mut networks = HashMap::new();
        networks.insert("bridge".to_string(), EndpointSettings::default());
        let host_config = HostConfig {
            network_mode: Some("host".to_string()),
            ..Default::default()
        };

        let body = replacement_body(
            SOURCE_ID,
            ModelContainerConfig::default(),
            None,
            Some(host_config),
            networks,
        );
        assert!(body.networking_config.is_none());
    }

    #[test]
    fn replacement_strips_id_alias() {
        let mut networks = HashMap::new();
        networks.insert(
            "backend".to_string(),
            EndpointSettings {
                aliases: strings(&["0123456789ab", "api"]),
                network_id: Some("netid".to_string()),
                ..Default::default()
            },
        );

        let body = replacement_body(
            SOURCE_ID,
            ModelContainerConfig::default(),
            None,
            None,
            networks,
        );
        let endpoints = body
            .networking_config
            .and_then(|n| n.endpoints_config)
            .unwrap();
        let backend = &endpoints["backend"];
        assert_eq!(backend.aliases, strings(&["api"]));
        assert!(backend.network_id.is_none());
    }
}
