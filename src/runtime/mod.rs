// ABOUTME: Container runtime access for Docker and Podman.
// ABOUTME: Detection, capability traits, and the bollard-backed implementation.

mod bollard;
mod detection;
mod error;
pub mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use detection::{DetectionError, detect_local};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use traits::*;
pub use types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};
