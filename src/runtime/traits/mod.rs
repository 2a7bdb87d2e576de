// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines ImageOps, ContainerOps, RuntimeInfo.

mod container;
mod image;
mod runtime_info;
pub(crate) mod sealed;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps};
pub use image::{ImageError, ImageOps};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;
