//! Append-only run history.
//!
//! One human-readable line per completed run. The only read path scans for
//! the highest previously recorded run number, which gives the run counter
//! at-least-once monotonicity across process restarts.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::RunRecord;

pub struct RunHistoryStore {
    path: PathBuf,
}

impl RunHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One plus the highest run number on record. Defaults to 1 when the
    /// store is empty, missing, or unreadable; a fresh history must never
    /// block a run from starting.
    pub fn next_run_count(&self) -> u64 {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return 1,
        };

        let regex = match Regex::new(r"Run #(\d+)") {
            Ok(regex) => regex,
            Err(e) => {
                warn!("Run-counter pattern failed to compile: {e}");
                return 1;
            }
        };

        regex
            .captures_iter(&content)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
            .max()
            .map(|highest| highest + 1)
            .unwrap_or(1)
    }

    /// Append one record line. Never rewrites prior entries.
    pub fn append(&self, record: &RunRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create history directory: {}", parent.display())
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history file: {}", self.path.display()))?;

        writeln!(file, "{}", record.format_line())
            .with_context(|| format!("Failed to append to history: {}", self.path.display()))?;

        Ok(())
    }
}
