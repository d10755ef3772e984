//! End-to-end lifecycle scenarios driven through the state machine and the
//! fleet scheduler.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use vigil::config::MonitorConfig;
use vigil::models::{FailureReason, Instance, InstanceState, ProbeReport};
use vigil::monitor::{self, FleetScheduler, MonitorOutcome};
use vigil::notify::NoopNotifier;

use crate::support::{FakeInspector, RecordingNotifier, ScriptedProbe};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
}

fn after(secs: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(secs)
}

fn config() -> MonitorConfig {
    MonitorConfig {
        sync_timeout: Duration::from_secs(600),
        unresponsive_timeout: Duration::from_secs(60),
        stall_timeout: Duration::from_secs(120),
        processing_duration: Duration::from_secs(300),
        ..MonitorConfig::default()
    }
}

fn new_instance() -> Instance {
    Instance::new("node-1", "http://localhost:8545", "client-node-1", t0())
}

/// First probe reachable and syncing moves the instance into `Syncing`;
/// a later "sync done" probe settles it straight into `Processing` with the
/// observed height as baseline.
#[test]
fn test_startup_sync_and_settle() {
    let cfg = config();
    let inspector = FakeInspector::unknown();
    let mut inst = new_instance();

    let transition = monitor::update(
        &mut inst,
        &ProbeReport::up(1000, true),
        after(5),
        &cfg,
        &inspector,
    );
    assert_eq!(transition.map(|t| t.to), Some(InstanceState::Syncing));

    let transition = monitor::update(
        &mut inst,
        &ProbeReport::up(1200, false),
        after(200),
        &cfg,
        &inspector,
    );
    assert_eq!(transition.map(|t| t.to), Some(InstanceState::Processing));
    assert_eq!(inst.progress_at_phase_start, Some(1200));
    assert_eq!(inst.sync_duration, Some(Duration::from_secs(195)));
}

/// A counter pinned at its baseline past the stall threshold fails with a
/// stall verdict naming the stuck height.
#[test]
fn test_pinned_counter_stalls_out() {
    let cfg = config();
    let inspector = FakeInspector::unknown();
    let mut inst = new_instance();

    monitor::update(&mut inst, &ProbeReport::up(100, true), t0(), &cfg, &inspector);
    monitor::update(
        &mut inst,
        &ProbeReport::up(100, false),
        after(10),
        &cfg,
        &inspector,
    );
    assert_eq!(inst.state, InstanceState::Processing);

    for (i, secs) in [40, 70, 100].iter().enumerate() {
        let transition = monitor::update(
            &mut inst,
            &ProbeReport::up(100, false),
            after(*secs),
            &cfg,
            &inspector,
        );
        assert!(transition.is_none(), "tick {i} should not transition");
    }

    let transition = monitor::update(
        &mut inst,
        &ProbeReport::up(100, false),
        after(135),
        &cfg,
        &inspector,
    );
    assert_eq!(transition.map(|t| t.to), Some(InstanceState::Failed));
    match &inst.failure {
        Some(FailureReason::Stalled { counter, .. }) => assert_eq!(*counter, 100),
        other => panic!("expected stall, got {other:?}"),
    }
    // The verdict is immutable from here on.
    let frozen = inst.failure.clone();
    monitor::update(
        &mut inst,
        &ProbeReport::up(9999, false),
        after(10_000),
        &cfg,
        &inspector,
    );
    assert_eq!(inst.failure, frozen);
}

/// Steady progress across the whole observation window ends in `Success`.
#[test]
fn test_steady_progress_succeeds() {
    let cfg = config();
    let inspector = FakeInspector::unknown();
    let mut inst = new_instance();

    monitor::update(&mut inst, &ProbeReport::up(100, true), t0(), &cfg, &inspector);
    monitor::update(
        &mut inst,
        &ProbeReport::up(100, false),
        after(10),
        &cfg,
        &inspector,
    );

    let mut height = 100;
    for secs in (60..=300).step_by(60) {
        height += 10;
        monitor::update(
            &mut inst,
            &ProbeReport::up(height, false),
            after(secs),
            &cfg,
            &inspector,
        );
    }
    let transition = monitor::update(
        &mut inst,
        &ProbeReport::up(height, false),
        after(315),
        &cfg,
        &inspector,
    );

    assert_eq!(transition.map(|t| t.to), Some(InstanceState::Success));
    assert_eq!(inst.blocks_advanced(), Some(50));
    assert!(inst.failure.is_none());
}

/// Two instances driven by the scheduler: one completes, one dies. The loop
/// ends only when both are terminal, and per-instance notifications carry
/// the right success flag.
#[test]
fn test_scheduler_mixed_fleet_outcome() {
    let cfg = MonitorConfig {
        tick_interval: Duration::from_millis(5),
        sync_timeout: Duration::from_secs(30),
        unresponsive_timeout: Duration::from_millis(30),
        stall_timeout: Duration::from_secs(30),
        processing_duration: Duration::from_millis(30),
        ..MonitorConfig::default()
    };

    let good = "http://localhost:18545";
    let bad = "http://localhost:18546";
    let probe = ScriptedProbe::new()
        .script(
            good,
            vec![
                ProbeReport::up(100, true),
                ProbeReport::up(110, false),
                ProbeReport::up(120, false),
                ProbeReport::up(130, false),
            ],
        )
        .script(
            bad,
            vec![ProbeReport::up(50, true), ProbeReport::unreachable()],
        );
    let inspector = FakeInspector::unknown();
    let notifier = RecordingNotifier::default();
    let shutdown = Arc::new(AtomicBool::new(false));

    let scheduler = FleetScheduler::new(&cfg, &probe, &inspector, &notifier, shutdown);
    let now = Utc::now();
    let mut instances = vec![
        Instance::new("good", good, "good", now),
        Instance::new("bad", bad, "bad", now),
    ];

    let outcome = scheduler.run(&mut instances);

    assert_eq!(outcome, MonitorOutcome::Completed);
    assert_eq!(instances[0].state, InstanceState::Success);
    assert_eq!(instances[1].state, InstanceState::Failed);

    let messages = notifier.messages.lock().unwrap();
    assert!(messages
        .iter()
        .any(|(header, _, success)| header.contains("good") && *success));
    assert!(messages
        .iter()
        .any(|(header, _, success)| header.contains("bad") && !*success));
}

/// A pre-set interrupt flag stops the loop after one tick without forcing
/// any instance terminal.
#[test]
fn test_interrupt_leaves_fleet_untouched() {
    let cfg = MonitorConfig {
        tick_interval: Duration::from_millis(5),
        ..config()
    };
    let endpoint = "http://localhost:18547";
    let probe = ScriptedProbe::new().script(endpoint, vec![ProbeReport::up(100, true)]);
    let inspector = FakeInspector::unknown();
    let shutdown = Arc::new(AtomicBool::new(true));

    let scheduler = FleetScheduler::new(&cfg, &probe, &inspector, &NoopNotifier, shutdown);
    let mut instances = vec![Instance::new("node-1", endpoint, "node-1", Utc::now())];

    let outcome = scheduler.run(&mut instances);
    assert_eq!(outcome, MonitorOutcome::Interrupted);
    assert_eq!(instances[0].state, InstanceState::Syncing);
}
