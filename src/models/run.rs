//! One fleet-wide monitoring cycle and its persisted record.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::models::instance::{Instance, InstanceState};
use crate::util::format_elapsed;

/// Per-instance outcome captured when a run closes.
#[derive(Debug, Clone)]
pub struct InstanceOutcome {
    pub name: String,
    pub state: InstanceState,
    pub sync_duration: Option<Duration>,
    pub blocks_advanced: Option<u64>,
    pub failure: Option<String>,
}

impl InstanceOutcome {
    pub fn capture(instance: &Instance) -> Self {
        Self {
            name: instance.name.clone(),
            state: instance.state,
            sync_duration: instance.sync_duration,
            blocks_advanced: instance.blocks_advanced(),
            failure: instance.failure.as_ref().map(|f| f.to_string()),
        }
    }

    fn detail(&self) -> String {
        if let Some(failure) = &self.failure {
            return failure.clone();
        }
        let mut parts = Vec::new();
        if let Some(sync) = self.sync_duration {
            parts.push(format!("sync {}", format_elapsed(sync)));
        }
        if let Some(blocks) = self.blocks_advanced {
            parts.push(format!("+{blocks} blocks"));
        }
        if parts.is_empty() {
            self.state.to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Immutable record of one completed fleet run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: String,
    pub run_count: u64,
    pub commit: Option<String>,
    pub outcomes: Vec<InstanceOutcome>,
}

impl RunRecord {
    pub fn new(
        run_count: u64,
        started_at: DateTime<Utc>,
        commit: Option<String>,
        instances: &[Instance],
    ) -> Self {
        Self {
            run_id: started_at.format("%Y%m%d_%H%M%S").to_string(),
            run_count,
            commit,
            outcomes: instances.iter().map(InstanceOutcome::capture).collect(),
        }
    }

    /// Derived, never stored independently of the per-instance states.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.state == InstanceState::Success)
    }

    /// Render the single history line for this run.
    ///
    /// Only `RunHistoryStore::next_run_count` ever reads this back, and it
    /// relies solely on the `Run #N` prefix.
    pub fn format_line(&self) -> String {
        let result = if self.all_succeeded() {
            "success"
        } else {
            "failed"
        };
        let instances = self
            .outcomes
            .iter()
            .map(|o| format!("{}={}({})", o.name, o.state, o.detail()))
            .collect::<Vec<_>>()
            .join(" ");
        let commit = self.commit.as_deref().unwrap_or("unknown");
        format!(
            "Run #{} | ID: {} | Commit: {} | Result: {} | Instances: {}",
            self.run_count, self.run_id, commit, result, instances
        )
    }
}
