// ABOUTME: Registry image reference parsing.
// ABOUTME: Handles nginx, nginx:tag, registry/image:tag@digest and bare image IDs.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

/// The reference a container was started from, as recorded in its config.
///
/// Containers started directly from an image ID (`sha256:...`) carry no
/// registry reference; [`ImageRef::is_image_id`] reports that case so callers
/// can avoid pulling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    registry: Option<String>,
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        if let Some(c) = input.chars().find(|c| {
            !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_' | '@')
        }) {
            return Err(ParseImageRefError::InvalidChar(c));
        }

        if let Some(hex) = input.strip_prefix("sha256:") {
            if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ParseImageRefError::InvalidFormat(input.to_string()));
            }
            return Ok(Self {
                registry: None,
                name: String::new(),
                tag: None,
                digest: Some(input.to_string()),
            });
        }

        let (without_digest, digest) = match input.split_once('@') {
            Some((before, after)) => (before, Some(after.to_string())),
            None => (input, None),
        };

        // A colon followed by a slash belongs to a registry port, not a tag.
        let (without_tag, tag) = match without_digest.rsplit_once(':') {
            Some((before, after)) if !after.contains('/') => (before, Some(after.to_string())),
            _ => (without_digest, None),
        };

        if without_tag.is_empty() || without_tag.ends_with('/') {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        let (registry, name) = Self::split_registry(without_tag);

        let tag = match (&tag, &digest) {
            (None, None) => Some("latest".to_string()),
            _ => tag,
        };

        Ok(Self {
            registry,
            name,
            tag,
            digest,
        })
    }

    fn split_registry(input: &str) -> (Option<String>, String) {
        // The first component is a registry if it looks like a host.
        match input.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (Some(first.to_string()), rest.to_string())
            }
            _ => (None, input.to_string()),
        }
    }

    /// True when the container was started from a bare image ID.
    pub fn is_image_id(&self) -> bool {
        self.name.is_empty()
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_image_id() {
            return write!(f, "{}", self.digest.as_deref().unwrap_or_default());
        }
        if let Some(ref registry) = self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}
