//! The fleet polling loop.
//!
//! Drives every instance state machine at a fixed tick interval until all
//! reach a terminal state. Instances are updated in their configured order
//! each tick, so concurrent transitions are observed and logged stably. The
//! inter-tick sleep is the only blocking point and is where the interrupt
//! flag is honored.

use chrono::Utc;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

use crate::config::MonitorConfig;
use crate::models::{Instance, InstanceState};
use crate::monitor::machine;
use crate::monitor::render::{render, CLEAR_SCREEN};
use crate::notify::Notify;
use crate::probe::HealthProbe;
use crate::process::ProcessInspector;
use crate::util::{exceeds, format_elapsed, truncate};

/// How a monitoring pass over the fleet ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Every instance reached a terminal state.
    Completed,
    /// An external interrupt stopped the loop early. Workers are left
    /// running for post-mortem inspection.
    Interrupted,
}

pub struct FleetScheduler<'a> {
    config: &'a MonitorConfig,
    probe: &'a dyn HealthProbe,
    inspector: &'a dyn ProcessInspector,
    notifier: &'a dyn Notify,
    shutdown: Arc<AtomicBool>,
}

impl<'a> FleetScheduler<'a> {
    pub fn new(
        config: &'a MonitorConfig,
        probe: &'a dyn HealthProbe,
        inspector: &'a dyn ProcessInspector,
        notifier: &'a dyn Notify,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            probe,
            inspector,
            notifier,
            shutdown,
        }
    }

    /// Poll the fleet until every instance is terminal or an interrupt is
    /// requested. Renders a snapshot whenever a transition occurred or the
    /// status-print interval elapsed.
    pub fn run(&self, instances: &mut [Instance]) -> MonitorOutcome {
        let mut last_print = None;

        loop {
            let now = Utc::now();
            let mut any_changed = false;

            for inst in instances.iter_mut() {
                let report = self.probe.probe(&inst.endpoint);
                let transition =
                    machine::update(inst, &report, now, self.config, self.inspector);
                if let Some(transition) = transition {
                    any_changed = true;
                    info!(
                        instance = %inst.name,
                        from = %transition.from,
                        to = %transition.to,
                        "instance transitioned"
                    );
                    if inst.is_terminal() {
                        self.notify_terminal(inst);
                    }
                }
            }

            let print_due = last_print
                .map_or(true, |at| exceeds(at, now, self.config.status_print_interval));
            if any_changed || print_due {
                self.print_snapshot(instances);
                last_print = Some(now);
            }

            if instances.iter().all(Instance::is_terminal) {
                return MonitorOutcome::Completed;
            }

            // The sleep between ticks is the cancellation point. No worker
            // teardown happens on interrupt.
            if self.shutdown.load(Ordering::SeqCst) {
                warn!("Interrupt received, rendering final snapshot");
                self.print_snapshot(instances);
                return MonitorOutcome::Interrupted;
            }
            thread::sleep(self.config.tick_interval);
        }
    }

    fn print_snapshot(&self, instances: &[Instance]) {
        print!(
            "{CLEAR_SCREEN}{}",
            render(instances, self.config, Utc::now())
        );
        let _ = std::io::stdout().flush();
    }

    fn notify_terminal(&self, inst: &Instance) {
        match inst.state {
            InstanceState::Success => {
                let sync = inst
                    .sync_duration
                    .map(format_elapsed)
                    .unwrap_or_else(|| "unknown".to_string());
                let blocks = inst.blocks_advanced().unwrap_or(0);
                self.notifier.notify(
                    &format!("✅ {} sync complete", inst.name),
                    &format!("*Synced in:* {sync}\n*Blocks processed:* +{blocks}"),
                    true,
                );
            }
            InstanceState::Failed => {
                let reason = inst
                    .failure
                    .as_ref()
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                self.notifier.notify(
                    &format!("❌ {} failed", inst.name),
                    &format!("*Error:* {}", truncate(&reason, 200)),
                    false,
                );
            }
            _ => {}
        }
    }
}
