// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use crate::update::UpdateReport;
use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly summary of each pass
    Normal,
    /// Only passes that changed something
    Quiet,
    /// One JSON object per pass, for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing a pass.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print the outcome of one pass.
    pub fn report(&self, report: &UpdateReport) {
        if let Some(line) = self.render(report) {
            println!("{line}");
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message: Some(message),
                    report: None,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    pub(crate) fn render(&self, report: &UpdateReport) -> Option<String> {
        match self.mode {
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "update",
                    message: None,
                    report: Some(report),
                    duration_secs: self.duration(),
                };
                serde_json::to_string(&event).ok()
            }
            OutputMode::Quiet if report.is_noop() && report.failed.is_empty() => None,
            OutputMode::Normal | OutputMode::Quiet => Some(summary(report, self.duration())),
        }
    }
}

fn summary(report: &UpdateReport, elapsed: Option<f64>) -> String {
    let mut line = if report.is_noop() && report.failed.is_empty() {
        format!("Checked {} container(s), all up to date", report.scanned)
    } else {
        let mut parts = vec![format!("Checked {} container(s)", report.scanned)];
        if !report.started.is_empty() {
            parts.push(format!("started {}", report.started.join(", ")));
        }
        if !report.stopped.is_empty() {
            parts.push(format!("stopped {}", report.stopped.join(", ")));
        }
        if !report.failed.is_empty() {
            parts.push(format!("failed {}", report.failed.join(", ")));
        }
        parts.join("; ")
    };
    if let Some(secs) = elapsed {
        line.push_str(&format!(" ({secs:.1}s)"));
    }
    line
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a UpdateReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
