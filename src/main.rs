use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use vigil::commands::{history, monitor, run};
use vigil::config::{Config, InstanceSpec};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Fleet lifecycle monitor CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch an already-running fleet until every instance is terminal
    Monitor {
        /// Comma-separated instance names
        #[arg(long)]
        names: Option<String>,

        /// Comma-separated RPC endpoints, one per name
        #[arg(long)]
        endpoints: Option<String>,

        /// Comma-separated container names (default: the instance names)
        #[arg(long)]
        containers: Option<String>,

        /// Sync timeout in minutes
        #[arg(long)]
        sync_timeout: Option<u64>,

        /// Disable webhook notifications
        #[arg(long)]
        no_notify: bool,
    },

    /// Drive full run cycles: update, restart, monitor, record
    Run {
        /// Pull and rebuild the monitored client before each cycle
        #[arg(long)]
        update: bool,

        /// Branch to pull when updating
        #[arg(long)]
        branch: Option<String>,

        /// Cargo profile to build when updating
        #[arg(long)]
        profile: Option<String>,

        /// Start a new cycle after each completed run
        #[arg(long = "loop")]
        auto_loop: bool,

        /// Maximum number of cycles when looping
        #[arg(long)]
        max_runs: Option<u64>,

        /// Disable webhook notifications
        #[arg(long)]
        no_notify: bool,
    },

    /// Show recorded runs and the next run counter
    History {
        /// Number of recent runs to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            1
        }
    };
    std::process::exit(code);
}

fn dispatch(cli: Cli) -> Result<i32> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Monitor {
            names,
            endpoints,
            containers,
            sync_timeout,
            no_notify,
        } => {
            apply_fleet_flags(&mut config, names, endpoints, containers)?;
            if let Some(mins) = sync_timeout {
                config.monitor.sync_timeout = Duration::from_secs(mins * 60);
            }
            if no_notify {
                config.notify.enabled = false;
            }
            monitor::execute(&config)
        }
        Commands::Run {
            update,
            branch,
            profile,
            auto_loop,
            max_runs,
            no_notify,
        } => {
            if update {
                config.update.enabled = true;
            }
            if let Some(branch) = branch {
                config.update.branch = branch;
            }
            if let Some(profile) = profile {
                config.update.profile = profile;
            }
            if auto_loop {
                config.auto_loop = true;
            }
            if max_runs.is_some() {
                config.max_runs = max_runs;
            }
            if no_notify {
                config.notify.enabled = false;
            }
            run::execute(&config)
        }
        Commands::History { limit } => history::execute(&config, limit),
    }
}

/// Build the instance set from comma-separated flags, overriding any
/// config-file instances when present.
fn apply_fleet_flags(
    config: &mut Config,
    names: Option<String>,
    endpoints: Option<String>,
    containers: Option<String>,
) -> Result<()> {
    let (Some(names), Some(endpoints)) = (&names, &endpoints) else {
        if names.is_some() || endpoints.is_some() {
            bail!("--names and --endpoints must be given together");
        }
        return Ok(());
    };

    let names: Vec<&str> = names.split(',').map(str::trim).collect();
    let endpoints: Vec<&str> = endpoints.split(',').map(str::trim).collect();
    if names.len() != endpoints.len() {
        bail!("--names and --endpoints must have the same length");
    }

    let containers: Vec<Option<&str>> = match &containers {
        Some(list) => {
            let list: Vec<&str> = list.split(',').map(str::trim).collect();
            if list.len() != names.len() {
                bail!("--containers must have the same length as --names");
            }
            list.into_iter().map(Some).collect()
        }
        None => vec![None; names.len()],
    };

    config.instances = names
        .iter()
        .zip(&endpoints)
        .zip(&containers)
        .map(|((name, endpoint), container)| InstanceSpec {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            container: container.map(String::from),
        })
        .collect();

    Ok(())
}
