// ABOUTME: Configuration types and parsing for relaunch.yml.
// ABOUTME: Handles YAML parsing, file discovery, and conversion into update parameters.

mod deserialize;
mod init;

pub use init::init_config;

use crate::container::Filter;
use crate::error::{Error, Result};
use crate::runtime::RuntimeConfig;
use crate::update::UpdateParams;
use deserialize::deserialize_container_names;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "relaunch.yml";
pub const CONFIG_FILENAME_ALT: &str = "relaunch.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".relaunch/config.yml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "RELAUNCH_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Time between update passes.
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Remove old images once their containers are replaced.
    #[serde(default)]
    pub cleanup: bool,

    /// Only the updater itself gets a replacement started.
    #[serde(default)]
    pub no_restart: bool,

    /// Compare against local images without pulling.
    #[serde(default)]
    pub no_pull: bool,

    /// Only consider containers labelled `relaunch.enable=true`.
    #[serde(default)]
    pub label_enable: bool,

    /// Container names to watch; empty watches every running container.
    #[serde(default, deserialize_with = "deserialize_container_names")]
    pub containers: Vec<String>,

    #[serde(default = "default_start_timeout", with = "humantime_serde")]
    pub start_timeout: Duration,

    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,

    #[serde(flatten)]
    pub runtime: RuntimeConfig,
}

fn default_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_start_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            cleanup: false,
            no_restart: false,
            no_pull: false,
            label_enable: false,
            containers: Vec::new(),
            start_timeout: default_start_timeout(),
            stop_timeout: default_stop_timeout(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Path of the config file that applies to `dir`, if any.
    ///
    /// `RELAUNCH_CONFIG` wins even when the file it names does not exist, so
    /// that a typo surfaces as an error instead of silently using defaults.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }

        [CONFIG_FILENAME, CONFIG_FILENAME_ALT, CONFIG_FILENAME_DIR]
            .into_iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => Err(Error::ConfigNotFound(dir.to_path_buf())),
        }
    }

    /// Like [`Config::discover`], but built-in defaults apply when no file is present.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        let durations = [
            ("interval", self.interval),
            ("start_timeout", self.start_timeout),
            ("stop_timeout", self.stop_timeout),
        ];
        for (field, value) in durations {
            if value.is_zero() {
                return Err(Error::InvalidConfig(format!("{field} must be greater than zero")));
            }
        }
        Ok(())
    }

    /// The container filter this configuration selects.
    pub fn filter(&self) -> Filter {
        Filter::build(&self.containers, self.label_enable)
    }

    pub fn update_params(&self) -> UpdateParams {
        UpdateParams {
            filter: self.filter(),
            cleanup: self.cleanup,
            no_restart: self.no_restart,
            start_timeout: self.start_timeout,
            stop_timeout: self.stop_timeout,
        }
    }
}
