//! One monitored worker node and its lifecycle state.

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::util::elapsed_since;

/// Lifecycle state of a monitored instance.
///
/// `Success` and `Failed` are terminal; `Synced` is a transient settle state
/// that the state machine leaves for `Processing` within the same poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Waiting,
    Syncing,
    Synced,
    Processing,
    Success,
    Failed,
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceState::Waiting => write!(f, "waiting"),
            InstanceState::Syncing => write!(f, "syncing"),
            InstanceState::Synced => write!(f, "synced"),
            InstanceState::Processing => write!(f, "processing"),
            InstanceState::Success => write!(f, "success"),
            InstanceState::Failed => write!(f, "failed"),
        }
    }
}

impl InstanceState {
    /// Check if transitioning from the current state to the new state is valid.
    ///
    /// Valid transitions:
    /// - `Waiting` -> `Syncing`
    /// - `Syncing` -> `Synced` | `Failed`
    /// - `Synced` -> `Processing`
    /// - `Processing` -> `Success` | `Failed`
    ///
    /// Terminal states (no outgoing transitions): `Success`, `Failed`.
    pub fn can_transition_to(&self, new_state: InstanceState) -> bool {
        if *self == new_state {
            return true;
        }

        match self {
            InstanceState::Waiting => matches!(new_state, InstanceState::Syncing),
            InstanceState::Syncing => {
                matches!(new_state, InstanceState::Synced | InstanceState::Failed)
            }
            InstanceState::Synced => matches!(new_state, InstanceState::Processing),
            InstanceState::Processing => {
                matches!(new_state, InstanceState::Success | InstanceState::Failed)
            }
            InstanceState::Success | InstanceState::Failed => false,
        }
    }

    /// Returns true if this is a terminal state (no valid outgoing transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceState::Success | InstanceState::Failed)
    }
}

fn fmt_matched(pattern: &Option<String>) -> String {
    match pattern {
        Some(p) => format!(", matched `{p}`"),
        None => String::new(),
    }
}

fn fmt_secs(secs: &u64) -> String {
    crate::util::format_elapsed(Duration::from_secs(*secs))
}

/// Terminal failure classification for an instance.
///
/// Set exactly once on the transition into `Failed` and recorded verbatim in
/// the run record. None of these are retried within a run; the only retry is
/// a fresh run cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// Probe unreachable continuously past the unresponsive threshold.
    #[error("node stopped responding for {}", fmt_secs(.unreachable_secs))]
    Unreachable { unreachable_secs: u64 },

    /// Bulk synchronization exceeded the configured timeout.
    #[error("sync timeout ({timeout_mins}m)")]
    SyncTimeout { timeout_mins: u64 },

    /// No forward progress for longer than the stall threshold.
    #[error("stalled at block {counter} for {}", fmt_secs(.stalled_secs))]
    Stalled { counter: u64, stalled_secs: u64 },

    /// Backing process exited, optionally enriched with a matched failure-log pattern.
    #[error("process exited with code {code}{}", fmt_matched(.pattern))]
    ProcessExited { code: i64, pattern: Option<String> },

    /// Reached the end of the processing window without any forward movement.
    #[error("no block progress during {}m monitoring window", .window_mins)]
    NoProgress { window_mins: u64 },
}

/// One monitored worker node.
///
/// Created at fleet-run start (or adopted from a live container), mutated
/// only by the state machine on each poll tick, and reset when a new run
/// cycle begins.
#[derive(Debug, Clone)]
pub struct Instance {
    pub name: String,
    /// Health-check RPC endpoint, e.g. `http://localhost:8545`.
    pub endpoint: String,
    /// Container name used for process inspection and log fetching.
    pub container: String,

    pub state: InstanceState,
    pub state_entered_at: DateTime<Utc>,

    /// Last time the progress counter moved forward.
    pub last_progress_at: Option<DateTime<Utc>>,
    /// First-failure latch for unresponsiveness detection.
    pub unreachable_since: Option<DateTime<Utc>>,
    /// Wall-clock time spent in `Syncing`, set once on entering `Synced`.
    pub sync_duration: Option<Duration>,

    /// Highest progress counter observed; never decreases while present.
    pub last_progress_counter: Option<u64>,
    /// Baseline counter recorded on entering `Processing`.
    pub progress_at_phase_start: Option<u64>,

    /// Set exactly once, on the transition into `Failed`.
    pub failure: Option<FailureReason>,
}

impl Instance {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        container: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            container: container.into(),
            state: InstanceState::Waiting,
            state_entered_at: now,
            last_progress_at: None,
            unreachable_since: None,
            sync_duration: None,
            last_progress_counter: None,
            progress_at_phase_start: None,
            failure: None,
        }
    }

    /// Discard all observed state and return to `Waiting` for a new run cycle.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.state = InstanceState::Waiting;
        self.state_entered_at = now;
        self.last_progress_at = None;
        self.unreachable_since = None;
        self.sync_duration = None;
        self.last_progress_counter = None;
        self.progress_at_phase_start = None;
        self.failure = None;
    }

    /// Adopt an already-running container: skip `Waiting` and treat the
    /// container's observed start time as the sync start.
    pub fn adopt_running(&mut self, started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) {
        self.state = InstanceState::Syncing;
        self.state_entered_at = started_at.unwrap_or(now);
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Wall-clock time spent in the current state.
    pub fn elapsed_in_state(&self, now: DateTime<Utc>) -> Duration {
        elapsed_since(self.state_entered_at, now)
    }

    /// Blocks processed since entering `Processing`, when both ends are known.
    pub fn blocks_advanced(&self) -> Option<u64> {
        match (self.progress_at_phase_start, self.last_progress_counter) {
            (Some(baseline), Some(current)) => Some(current.saturating_sub(baseline)),
            _ => None,
        }
    }
}
