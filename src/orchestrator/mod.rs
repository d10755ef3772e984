//! Whole-fleet run cycles.
//!
//! The orchestrator sequences each cycle: optional source update and
//! rebuild, worker restart, monitoring to completion, log archiving, run
//! record persistence, and notification, then loops or exits. Pull, build,
//! and restart are hard prerequisites; everything after the monitoring pass
//! is best-effort and never aborts the cycle.

pub mod control;

pub use control::{CommandControl, ControlPlane};

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::history::RunHistoryStore;
use crate::models::{Instance, RunRecord};
use crate::monitor::{FleetScheduler, MonitorOutcome};
use crate::notify::Notify;
use crate::probe::HealthProbe;
use crate::process::ProcessInspector;

/// Aggregate result of an orchestrated session (one or more run cycles).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub runs_completed: u64,
    pub any_failed: bool,
    pub interrupted: bool,
}

impl RunSummary {
    /// Process exit code: 0 all succeeded, 1 any failure, 130 interrupted.
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            130
        } else if self.any_failed {
            1
        } else {
            0
        }
    }
}

pub struct RunOrchestrator<'a> {
    config: &'a Config,
    control: &'a dyn ControlPlane,
    probe: &'a dyn HealthProbe,
    inspector: &'a dyn ProcessInspector,
    notifier: &'a dyn Notify,
    history: RunHistoryStore,
    shutdown: Arc<AtomicBool>,
}

impl<'a> RunOrchestrator<'a> {
    pub fn new(
        config: &'a Config,
        control: &'a dyn ControlPlane,
        probe: &'a dyn HealthProbe,
        inspector: &'a dyn ProcessInspector,
        notifier: &'a dyn Notify,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            control,
            probe,
            inspector,
            notifier,
            history: RunHistoryStore::new(&config.history_path),
            shutdown,
        }
    }

    /// Drive run cycles until completion, interrupt, or a prerequisite
    /// failure. A prerequisite failure surfaces as `Err`; a worker failing
    /// at runtime does not: it is recorded in the run outcome and the
    /// worker is left running for post-mortem inspection.
    pub fn run(&self) -> Result<RunSummary> {
        let mut instances: Vec<Instance> = self
            .config
            .instances
            .iter()
            .map(|spec| {
                Instance::new(
                    &spec.name,
                    &spec.endpoint,
                    spec.container_name(),
                    Utc::now(),
                )
            })
            .collect();

        let mut summary = RunSummary {
            runs_completed: 0,
            any_failed: false,
            interrupted: false,
        };

        loop {
            let run_count = self.history.next_run_count();
            let started_at = Utc::now();
            info!(run_count, "starting fleet run");

            for inst in instances.iter_mut() {
                inst.reset(started_at);
            }

            let commit = if self.config.update.enabled {
                let commit = self
                    .control
                    .pull_latest(&self.config.update.branch)
                    .context("Source update failed; aborting run")?;
                self.control
                    .build(&self.config.update.profile)
                    .context("Build failed; aborting run")?;
                Some(commit)
            } else {
                None
            };

            let containers: Vec<String> = instances
                .iter()
                .map(|inst| inst.container.clone())
                .collect();
            self.control
                .restart(&containers)
                .context("Worker restart failed; aborting run")?;

            let scheduler = FleetScheduler::new(
                &self.config.monitor,
                self.probe,
                self.inspector,
                self.notifier,
                self.shutdown.clone(),
            );
            let outcome = scheduler.run(&mut instances);

            let record = RunRecord::new(run_count, started_at, commit, &instances);
            self.archive_logs(&record.run_id, &instances);

            if outcome == MonitorOutcome::Interrupted {
                // The run never closed; keep the archived logs but record
                // and notify nothing.
                summary.interrupted = true;
                return Ok(summary);
            }

            if let Err(e) = self.history.append(&record) {
                warn!("Failed to append run record: {e:#}");
            }
            self.notify_run(&record);

            summary.runs_completed += 1;
            if !record.all_succeeded() {
                summary.any_failed = true;
            }
            if !self.config.auto_loop {
                return Ok(summary);
            }
            if let Some(max) = self.config.max_runs {
                if summary.runs_completed >= max {
                    return Ok(summary);
                }
            }
        }
    }

    /// Save each instance's log tail under the per-run archive directory.
    /// Best-effort: a failed fetch or write is logged and skipped.
    fn archive_logs(&self, run_id: &str, instances: &[Instance]) {
        let run_dir = self.config.logs_dir.join(format!("run_{run_id}"));
        if let Err(e) = fs::create_dir_all(&run_dir) {
            warn!("Failed to create log archive dir: {e}");
            return;
        }

        for inst in instances {
            let Some(tail) = self
                .inspector
                .log_tail(&inst.container, self.config.monitor.log_tail_lines)
            else {
                continue;
            };
            let path = run_dir.join(format!("{}.log", inst.name));
            if let Err(e) = fs::write(&path, tail) {
                warn!("Failed to archive log for {}: {e}", inst.name);
            }
        }
    }

    fn notify_run(&self, record: &RunRecord) {
        let success = record.all_succeeded();
        let header = if success {
            format!("🎉 Run #{}: all instances synced", record.run_count)
        } else {
            format!("⚠️ Run #{} finished with failures", record.run_count)
        };

        let mut lines = vec![format!("*Run ID:* `{}`", record.run_id)];
        if let Some(commit) = &record.commit {
            lines.push(format!("*Commit:* `{commit}`"));
        }
        for outcome in &record.outcomes {
            let detail = outcome
                .failure
                .clone()
                .unwrap_or_else(|| outcome.state.to_string());
            lines.push(format!("*{}:* {detail}", outcome.name));
        }

        self.notifier.notify(&header, &lines.join("\n"), success);
    }
}
