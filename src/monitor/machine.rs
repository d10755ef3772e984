//! The per-instance lifecycle state machine.
//!
//! One entry point, [`update`], dispatches on the current state and applies
//! the transition rules. All timing decisions take `now` as a parameter so
//! the machine is deterministic under test.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{FlapPolicy, MonitorConfig};
use crate::models::{FailureReason, Instance, InstanceState, ProbeReport, ProcessStatus};
use crate::monitor::stall::is_stalled;
use crate::process::{scan_log_for_patterns, ProcessInspector};
use crate::util::{elapsed_since, exceeds};

/// A state change produced by one `update` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: InstanceState,
    pub to: InstanceState,
}

/// Advance one instance by one poll tick.
///
/// Returns the transition taken, if any. Calling this on a terminal
/// instance is a no-op. The inspector is only consulted on the
/// unresponsive-failure path, so a healthy tick costs exactly one probe.
pub fn update(
    inst: &mut Instance,
    report: &ProbeReport,
    now: DateTime<Utc>,
    config: &MonitorConfig,
    inspector: &dyn ProcessInspector,
) -> Option<Transition> {
    if inst.is_terminal() {
        return None;
    }

    match inst.state {
        InstanceState::Waiting => step_waiting(inst, report, now),
        InstanceState::Syncing => step_syncing(inst, report, now, config, inspector),
        // Synced is transient: step_syncing leaves it for Processing within
        // the same tick, so a persisted Synced state only occurs when an
        // instance was constructed there externally.
        InstanceState::Synced => Some(begin_processing(inst, InstanceState::Synced, now)),
        InstanceState::Processing => step_processing(inst, report, now, config),
        InstanceState::Success | InstanceState::Failed => None,
    }
}

fn step_waiting(inst: &mut Instance, report: &ProbeReport, now: DateTime<Utc>) -> Option<Transition> {
    if !report.reachable {
        // Node still booting.
        return None;
    }
    record_progress(inst, report, now);
    Some(enter(inst, InstanceState::Syncing, now))
}

fn step_syncing(
    inst: &mut Instance,
    report: &ProbeReport,
    now: DateTime<Utc>,
    config: &MonitorConfig,
    inspector: &dyn ProcessInspector,
) -> Option<Transition> {
    // The sync deadline applies regardless of reachability.
    if exceeds(inst.state_entered_at, now, config.sync_timeout) {
        let reason = FailureReason::SyncTimeout {
            timeout_mins: config.sync_timeout.as_secs() / 60,
        };
        return Some(fail(inst, reason, now));
    }

    if !report.reachable {
        // Latch the first failure; a single missed probe is not terminal.
        let since = *inst.unreachable_since.get_or_insert(now);
        if is_stalled(Some(since), now, config.unresponsive_timeout) {
            let reason = classify_unreachable(inst, since, now, config, inspector);
            return Some(fail(inst, reason, now));
        }
        return None;
    }

    record_progress(inst, report, now);
    // Under Latch, record_progress clears the latch only on forward
    // progress; mere contact is not enough.
    if config.flap_policy == FlapPolicy::ResetOnContact {
        inst.unreachable_since = None;
    }

    if report.syncing == Some(false) {
        inst.sync_duration = Some(elapsed_since(inst.state_entered_at, now));
        let from = inst.state;
        enter(inst, InstanceState::Synced, now);
        return Some(begin_processing(inst, from, now));
    }

    None
}

/// Enter `Processing`: record the baseline counter and reset the stall clock.
fn begin_processing(inst: &mut Instance, from: InstanceState, now: DateTime<Utc>) -> Transition {
    enter(inst, InstanceState::Processing, now);
    inst.progress_at_phase_start = inst.last_progress_counter;
    inst.last_progress_at = Some(now);
    Transition {
        from,
        to: InstanceState::Processing,
    }
}

fn step_processing(
    inst: &mut Instance,
    report: &ProbeReport,
    now: DateTime<Utc>,
    config: &MonitorConfig,
) -> Option<Transition> {
    if report.reachable {
        record_progress(inst, report, now);
    }

    // Time since last forward progress, not time since state entry; a node
    // making slow-but-steady progress is never misclassified. This also
    // catches nodes that stop answering probes entirely.
    if is_stalled(inst.last_progress_at, now, config.stall_timeout) {
        let counter = inst
            .last_progress_counter
            .or(inst.progress_at_phase_start)
            .unwrap_or(0);
        let stalled_secs = inst
            .last_progress_at
            .map(|mark| elapsed_since(mark, now).as_secs())
            .unwrap_or(0);
        let reason = FailureReason::Stalled {
            counter,
            stalled_secs,
        };
        return Some(fail(inst, reason, now));
    }

    if exceeds(inst.state_entered_at, now, config.processing_duration) {
        return if inst.blocks_advanced().unwrap_or(0) > 0 {
            Some(enter(inst, InstanceState::Success, now))
        } else {
            let reason = FailureReason::NoProgress {
                window_mins: config.processing_duration.as_secs() / 60,
            };
            Some(fail(inst, reason, now))
        };
    }

    None
}

/// Promote sustained unreachability to its terminal reason, enriching with
/// the exit code and any matched failure-log pattern when the container is
/// observed to have crashed.
fn classify_unreachable(
    inst: &Instance,
    since: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &MonitorConfig,
    inspector: &dyn ProcessInspector,
) -> FailureReason {
    if let ProcessStatus::Exited { code } = inspector.inspect(&inst.container) {
        if code != 0 {
            let pattern = inspector
                .log_tail(&inst.container, config.log_tail_lines)
                .and_then(|tail| scan_log_for_patterns(&tail, &config.failure_patterns));
            return FailureReason::ProcessExited { code, pattern };
        }
    }
    FailureReason::Unreachable {
        unreachable_secs: elapsed_since(since, now).as_secs(),
    }
}

/// Record an observed progress counter, keeping it monotonic. Returns true
/// when the counter moved forward; forward progress also clears the
/// unresponsive latch under either flap policy.
fn record_progress(inst: &mut Instance, report: &ProbeReport, now: DateTime<Utc>) -> bool {
    let Some(observed) = report.progress else {
        return false;
    };
    let advanced = inst
        .last_progress_counter
        .map_or(true, |current| observed > current);
    if advanced {
        inst.last_progress_counter = Some(observed);
        inst.last_progress_at = Some(now);
        inst.unreachable_since = None;
    }
    advanced
}

fn enter(inst: &mut Instance, state: InstanceState, now: DateTime<Utc>) -> Transition {
    debug_assert!(
        inst.state.can_transition_to(state),
        "illegal transition {} -> {}",
        inst.state,
        state
    );
    debug!(instance = %inst.name, from = %inst.state, to = %state, "state transition");
    let from = inst.state;
    inst.state = state;
    inst.state_entered_at = now;
    Transition { from, to: state }
}

fn fail(inst: &mut Instance, reason: FailureReason, now: DateTime<Utc>) -> Transition {
    let transition = enter(inst, InstanceState::Failed, now);
    // Immutable once set.
    if inst.failure.is_none() {
        inst.failure = Some(reason);
    }
    transition
}
