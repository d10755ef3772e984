//! `vigil monitor`: watch an already-running fleet to completion.

use anyhow::{bail, Result};
use chrono::Utc;
use colored::Colorize;

use crate::config::Config;
use crate::models::{Instance, InstanceState, ProcessStatus};
use crate::monitor::{FleetScheduler, MonitorOutcome};
use crate::probe::RpcProbe;
use crate::process::{DockerInspector, ProcessInspector};
use crate::util::format_elapsed;

use super::{build_notifier, install_interrupt_flag};

pub fn execute(config: &Config) -> Result<i32> {
    if config.instances.is_empty() {
        bail!("No instances configured. Pass --names/--endpoints or a config file.");
    }

    let probe = RpcProbe::new(config.monitor.probe_timeout)?;
    let inspector = DockerInspector;
    let notifier = build_notifier(&config.notify)?;
    let shutdown = install_interrupt_flag()?;

    let now = Utc::now();
    let mut instances: Vec<Instance> = config
        .instances
        .iter()
        .map(|spec| Instance::new(&spec.name, &spec.endpoint, spec.container_name(), now))
        .collect();

    // Adopt containers that are already up: their observed start time is
    // the sync start, so timeouts measure the node's life, not ours.
    for inst in instances.iter_mut() {
        if let ProcessStatus::Running { started_at } = inspector.inspect(&inst.container) {
            inst.adopt_running(started_at, now);
        }
    }

    println!("Monitoring {} instances...", instances.len());
    println!(
        "  Sync timeout: {}",
        format_elapsed(config.monitor.sync_timeout)
    );
    println!(
        "  Processing window: {}",
        format_elapsed(config.monitor.processing_duration)
    );

    let scheduler = FleetScheduler::new(
        &config.monitor,
        &probe,
        &inspector,
        notifier.as_ref(),
        shutdown,
    );
    let outcome = scheduler.run(&mut instances);

    if outcome == MonitorOutcome::Interrupted {
        println!("\n{}", "Interrupted. Workers were left running.".yellow());
        return Ok(130);
    }

    let all_succeeded = instances
        .iter()
        .all(|inst| inst.state == InstanceState::Success);
    if all_succeeded {
        println!("{}", "All instances synced successfully!".green().bold());
        Ok(0)
    } else {
        println!("{}", "Some instances failed".red().bold());
        Ok(1)
    }
}
