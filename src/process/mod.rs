//! Container inspection and log fetching for monitored workers.
//!
//! Everything here is best-effort: an inspection failure maps to
//! `ProcessStatus::Unknown` and a failed log fetch to `None`, never an
//! error, so the polling loop keeps running when the docker daemon is
//! unavailable.

use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use std::process::Command;
use tracing::warn;

use crate::models::ProcessStatus;

/// Container/process control surface consumed by the state machine when it
/// needs to enrich a failure verdict.
pub trait ProcessInspector {
    fn inspect(&self, container: &str) -> ProcessStatus;

    /// Fetch the last `max_lines` of the container's log. Best-effort.
    fn log_tail(&self, container: &str, max_lines: usize) -> Option<String>;
}

/// Inspector backed by the `docker` CLI.
pub struct DockerInspector;

impl ProcessInspector for DockerInspector {
    fn inspect(&self, container: &str) -> ProcessStatus {
        let output = Command::new("docker")
            .args([
                "inspect",
                "-f",
                "{{.State.Running}}|{{.State.ExitCode}}|{{.State.StartedAt}}",
                container,
            ])
            .output();

        let output = match output {
            Ok(output) if output.status.success() => output,
            _ => return ProcessStatus::Unknown,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_inspect_line(stdout.trim())
    }

    fn log_tail(&self, container: &str, max_lines: usize) -> Option<String> {
        let output = Command::new("docker")
            .args(["logs", "--tail", &max_lines.to_string(), container])
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        // Docker writes container output to both streams.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Some(text)
    }
}

/// Parse `running|exit_code|started_at` as produced by the inspect format
/// string above.
fn parse_inspect_line(line: &str) -> ProcessStatus {
    let mut fields = line.splitn(3, '|');
    let running = fields.next();
    let exit_code = fields.next().and_then(|c| c.parse::<i64>().ok());
    let started_at = fields.next().and_then(parse_started_at);

    match running {
        Some("true") => ProcessStatus::Running { started_at },
        Some("false") => match exit_code {
            Some(code) => ProcessStatus::Exited { code },
            None => ProcessStatus::Unknown,
        },
        _ => ProcessStatus::Unknown,
    }
}

/// Docker reports `StartedAt` as RFC 3339 with nanosecond precision.
fn parse_started_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Scan a log tail for the first matching known-failure pattern.
///
/// Patterns are case-insensitive regular expressions; invalid patterns are
/// skipped with a warning rather than aborting the scan.
pub fn scan_log_for_patterns(text: &str, patterns: &[String]) -> Option<String> {
    for pattern in patterns {
        let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => regex,
            Err(e) => {
                warn!("Skipping invalid failure pattern `{pattern}`: {e}");
                continue;
            }
        };
        if regex.is_match(text) {
            return Some(pattern.clone());
        }
    }
    None
}
