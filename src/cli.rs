// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use relaunch::config::Config;
use relaunch::output::OutputMode;
use relaunch::runtime::RuntimeType;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "relaunch")]
#[command(about = "Keep running containers on the latest version of their images")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a relaunch.yml template in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Watch running containers and replace them when their image changes
    Run(RunArgs),
}

#[derive(Args, Default)]
pub struct RunArgs {
    /// Run a single update pass and exit
    #[arg(long)]
    pub run_once: bool,

    /// Time between passes (e.g. 30s, 5m, 1h)
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Remove old images after updating
    #[arg(long)]
    pub cleanup: bool,

    /// Stop outdated containers without starting replacements
    #[arg(long)]
    pub no_restart: bool,

    /// Use local images only, never pull
    #[arg(long)]
    pub no_pull: bool,

    /// Only update containers labelled relaunch.enable=true
    #[arg(long)]
    pub label_enable: bool,

    /// How long to wait for a replacement to start
    #[arg(long, value_parser = parse_duration)]
    pub start_timeout: Option<Duration>,

    /// How long to wait for an old container to stop
    #[arg(long, value_parser = parse_duration)]
    pub stop_timeout: Option<Duration>,

    /// Container runtime to use instead of auto-detection
    #[arg(long, value_enum)]
    pub runtime: Option<RuntimeType>,

    /// Runtime socket path
    #[arg(long)]
    pub socket: Option<String>,

    /// Print one JSON object per pass
    #[arg(long, conflicts_with = "quiet")]
    pub json: bool,

    /// Only print passes that changed something
    #[arg(long)]
    pub quiet: bool,

    /// Containers to watch (default: all running containers)
    pub names: Vec<String>,
}

impl RunArgs {
    /// Overlay command-line flags onto file configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if let Some(timeout) = self.start_timeout {
            config.start_timeout = timeout;
        }
        if let Some(timeout) = self.stop_timeout {
            config.stop_timeout = timeout;
        }
        config.cleanup |= self.cleanup;
        config.no_restart |= self.no_restart;
        config.no_pull |= self.no_pull;
        config.label_enable |= self.label_enable;
        if !self.names.is_empty() {
            config.containers = self
                .names
                .iter()
                .map(|n| n.trim_start_matches('/').to_string())
                .collect();
        }
        if self.runtime.is_some() {
            config.runtime.runtime = self.runtime;
        }
        if self.socket.is_some() {
            config.runtime.socket = self.socket.clone();
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    let duration = humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if duration.is_zero() {
        return Err("duration must be greater than zero".to_string());
    }
    Ok(duration)
}
