//! `vigil run`: drive full orchestrated run cycles.

use anyhow::{bail, Result};
use colored::Colorize;

use crate::config::Config;
use crate::orchestrator::{CommandControl, RunOrchestrator};
use crate::probe::RpcProbe;
use crate::process::DockerInspector;

use super::{build_notifier, install_interrupt_flag};

pub fn execute(config: &Config) -> Result<i32> {
    if config.instances.is_empty() {
        bail!("No instances configured. Pass --names/--endpoints or a config file.");
    }

    let probe = RpcProbe::new(config.monitor.probe_timeout)?;
    let inspector = DockerInspector;
    let notifier = build_notifier(&config.notify)?;
    let shutdown = install_interrupt_flag()?;
    let control = CommandControl::new(&config.update);

    let orchestrator = RunOrchestrator::new(
        config,
        &control,
        &probe,
        &inspector,
        notifier.as_ref(),
        shutdown,
    );

    let summary = orchestrator.run()?;

    println!();
    if summary.interrupted {
        println!("{}", "Interrupted. Workers were left running.".yellow());
    } else if summary.any_failed {
        println!(
            "{}",
            format!(
                "{} run(s) completed, at least one with failures",
                summary.runs_completed
            )
            .red()
            .bold()
        );
    } else {
        println!(
            "{}",
            format!("{} run(s) completed successfully", summary.runs_completed)
                .green()
                .bold()
        );
    }

    Ok(summary.exit_code())
}
