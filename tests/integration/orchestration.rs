//! Orchestrated run cycles against scripted collaborators, including run
//! counter recovery across orchestrator restarts.

use anyhow::Result;
use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use vigil::config::{Config, InstanceSpec};
use vigil::history::RunHistoryStore;
use vigil::models::{Instance, InstanceState, ProbeReport, RunRecord};
use vigil::orchestrator::RunOrchestrator;
use vigil::probe::HealthProbe;

use crate::support::{FakeControl, FakeInspector, RecordingNotifier};

/// Probe whose reported height climbs on every poll, so a run completes
/// quickly with a success verdict.
struct ClimbingProbe {
    height: Mutex<u64>,
}

impl ClimbingProbe {
    fn new() -> Self {
        Self {
            height: Mutex::new(1000),
        }
    }
}

impl HealthProbe for ClimbingProbe {
    fn probe(&self, _endpoint: &str) -> ProbeReport {
        let mut height = self.height.lock().unwrap();
        *height += 1;
        ProbeReport::up(*height, false)
    }
}

fn fast_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.instances = vec![InstanceSpec {
        name: "node-1".to_string(),
        endpoint: "http://localhost:18545".to_string(),
        container: None,
    }];
    config.history_path = dir.path().join("history.txt");
    config.logs_dir = dir.path().join("logs");
    config.monitor.tick_interval = Duration::from_millis(5);
    config.monitor.processing_duration = Duration::from_millis(20);
    config
}

fn run_once(config: &Config) -> Result<()> {
    let control = FakeControl::default();
    let probe = ClimbingProbe::new();
    let inspector = FakeInspector::unknown();
    let notifier = RecordingNotifier::default();
    let shutdown = Arc::new(AtomicBool::new(false));

    let orchestrator = RunOrchestrator::new(
        config,
        &control,
        &probe,
        &inspector,
        &notifier,
        shutdown,
    );
    let summary = orchestrator.run()?;
    assert!(!summary.any_failed);
    Ok(())
}

/// Each orchestrator construction models a process restart; the counter
/// must keep climbing because it is recovered from the history file.
#[test]
fn test_run_counter_recovers_across_restarts() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);

    for _ in 0..3 {
        run_once(&config).unwrap();
    }

    let history = fs::read_to_string(&config.history_path).unwrap();
    assert!(history.contains("Run #1"));
    assert!(history.contains("Run #2"));
    assert!(history.contains("Run #3"));

    let store = RunHistoryStore::new(&config.history_path);
    assert_eq!(store.next_run_count(), 4);
}

/// With auto-update enabled, the cycle runs pull, build, and restart in
/// order before monitoring, and records the pulled commit.
#[test]
fn test_update_cycle_order_and_commit_recording() {
    let dir = TempDir::new().unwrap();
    let mut config = fast_config(&dir);
    config.update.enabled = true;
    config.update.branch = "develop".to_string();

    let control = FakeControl::default();
    let probe = ClimbingProbe::new();
    let inspector = FakeInspector::unknown();
    let notifier = RecordingNotifier::default();
    let shutdown = Arc::new(AtomicBool::new(false));

    let orchestrator = RunOrchestrator::new(
        &config,
        &control,
        &probe,
        &inspector,
        &notifier,
        shutdown,
    );
    let summary = orchestrator.run().unwrap();
    assert_eq!(summary.exit_code(), 0);

    let calls = control.calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec!["pull:develop", "build:release", "restart:node-1"]
    );

    let history = fs::read_to_string(&config.history_path).unwrap();
    assert!(history.contains("Commit: deadbee"));

    let messages = notifier.messages.lock().unwrap();
    assert!(messages.iter().any(|(header, body, success)| {
        header.contains("Run #1") && body.contains("deadbee") && *success
    }));
}

/// A record for a mixed-outcome fleet reads back as a failed run but still
/// yields the next counter.
#[test]
fn test_mixed_outcome_record_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.txt");
    let store = RunHistoryStore::new(&path);

    let t0 = chrono::Utc::now();
    let mut ok = Instance::new("a", "http://localhost:1", "a", t0);
    ok.state = InstanceState::Success;
    let mut bad = Instance::new("b", "http://localhost:2", "b", t0);
    bad.state = InstanceState::Failed;
    bad.failure = Some(vigil::models::FailureReason::NoProgress { window_mins: 30 });

    let record = RunRecord::new(5, t0, None, &[ok, bad]);
    assert!(!record.all_succeeded());
    store.append(&record).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("Result: failed"));
    assert!(content.contains("no block progress during 30m monitoring window"));
    assert_eq!(store.next_run_count(), 6);
}
