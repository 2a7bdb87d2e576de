// ABOUTME: Runtime reachability trait for container runtimes.
// ABOUTME: Checked once at startup before the first update pass.

use super::sealed::Sealed;
use super::shared_types::RuntimeMetadata;
use async_trait::async_trait;

#[async_trait]
pub trait RuntimeInfo: Sealed + Send + Sync {
    /// Daemon version and platform.
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError>;

    /// Round-trip to the daemon without side effects.
    async fn ping(&self) -> Result<(), RuntimeInfoError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeInfoError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
