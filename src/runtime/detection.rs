// ABOUTME: Local container runtime detection.
// ABOUTME: Honors explicit config, then checks Podman sockets before Docker.

use super::types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("configured socket does not exist: {0}")]
    SocketMissing(String),
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Detect the container runtime on this host.
///
/// Detection order (when not explicitly configured):
/// 1. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 2. Rootful Podman socket (`/run/podman/podman.sock`)
/// 3. Docker socket (`/var/run/docker.sock`)
pub fn detect_local(config: &RuntimeConfig) -> Result<RuntimeEndpoint, DetectionError> {
    if let Some(runtime_type) = config.runtime {
        let socket_path = config
            .socket
            .clone()
            .unwrap_or_else(|| default_socket_path(runtime_type).to_string());
        if !Path::new(&socket_path).exists() {
            return Err(DetectionError::SocketMissing(socket_path));
        }
        return Ok(RuntimeEndpoint {
            runtime_type,
            socket_path,
        });
    }

    // A bare socket path without a type is treated as Docker-compatible.
    if let Some(ref socket_path) = config.socket {
        if !Path::new(socket_path).exists() {
            return Err(DetectionError::SocketMissing(socket_path.clone()));
        }
        return Ok(RuntimeEndpoint {
            runtime_type: RuntimeType::Docker,
            socket_path: socket_path.clone(),
        });
    }

    let mut candidates = rootless_podman_socket()
        .map(|s| (RuntimeType::Podman, s))
        .into_iter()
        .chain([
            (RuntimeType::Podman, ROOTFUL_PODMAN.to_string()),
            (RuntimeType::Docker, DOCKER_SOCKET.to_string()),
        ]);

    candidates
        .find(|(_, path)| Path::new(path).exists())
        .map(|(runtime_type, socket_path)| RuntimeEndpoint {
            runtime_type,
            socket_path,
        })
        .ok_or(DetectionError::NoRuntimeFound)
}

fn rootless_podman_socket() -> Option<String> {
    get_uid().map(|uid| format!("/run/user/{}/podman/podman.sock", uid))
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

fn default_socket_path(runtime: RuntimeType) -> &'static str {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET,
        RuntimeType::Podman => ROOTFUL_PODMAN,
    }
}
