// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Normalizes the container name allow-list.

use serde::Deserialize;

/// Container names as the runtime reports them, without a leading `/`.
pub fn deserialize_container_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let names: Vec<String> = Vec::deserialize(deserializer)?;
    names
        .into_iter()
        .map(|name| {
            let trimmed = name.trim().trim_start_matches('/');
            if trimmed.is_empty() {
                Err(serde::de::Error::custom("container names cannot be empty"))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}
