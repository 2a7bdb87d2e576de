// ABOUTME: Config scaffolding for new installations.
// ABOUTME: Creates relaunch.yml template files.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

const TEMPLATE: &str = r#"# relaunch configuration

# How often to look for new images.
interval: 5m

# Remove the old image once its container has been replaced.
cleanup: false

# Stop outdated containers without starting replacements.
no_restart: false

# Compare against local images only, without pulling.
no_pull: false

# Only update containers labelled relaunch.enable=true.
label_enable: false

# Containers to watch. An empty list watches every running container.
containers: []

start_timeout: 30s
stop_timeout: 10s

# Skip runtime auto-detection.
# runtime: docker
# socket: /var/run/docker.sock
"#;

/// Write a commented template config into `dir`, returning its path.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;
    Ok(config_path)
}
