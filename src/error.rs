// ABOUTME: Application-wide error types for relaunch.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::runtime::RuntimeError;
use crate::update::UpdateError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("update failed: {0}")]
    Update(#[from] UpdateError),
}

pub type Result<T> = std::result::Result<T, Error>;
