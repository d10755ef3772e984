//! Explicit configuration for the monitor and orchestrator.
//!
//! Assembled from built-in defaults, an optional TOML file, and CLI flag
//! overrides, then passed into the orchestrator at construction time. There
//! is no ambient environment-variable state.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How a cleared probe failure interacts with the unresponsive latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlapPolicy {
    /// Any successful probe clears the first-failure latch entirely.
    #[default]
    ResetOnContact,
    /// Brief recoveries keep the latch; only observed forward progress
    /// clears it.
    Latch,
}

/// One monitored worker in the fleet configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceSpec {
    pub name: String,
    /// Health-check RPC endpoint, e.g. `http://localhost:8545`.
    pub endpoint: String,
    /// Container name; defaults to the instance name when omitted.
    #[serde(default)]
    pub container: Option<String>,
}

impl InstanceSpec {
    pub fn container_name(&self) -> &str {
        self.container.as_deref().unwrap_or(&self.name)
    }
}

/// Timing and classification policy for the state machine and scheduler.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Poll tick interval.
    pub tick_interval: Duration,
    /// How often to render a status snapshot when nothing changed.
    pub status_print_interval: Duration,
    /// Per-probe request timeout.
    pub probe_timeout: Duration,
    /// Maximum time allowed in `Syncing`.
    pub sync_timeout: Duration,
    /// Continuous unreachability past this threshold is terminal.
    pub unresponsive_timeout: Duration,
    /// No forward progress past this threshold in `Processing` is terminal.
    pub stall_timeout: Duration,
    /// Length of the sustained-progress observation window.
    pub processing_duration: Duration,
    pub flap_policy: FlapPolicy,
    /// Known-failure log patterns used to enrich process-exit reasons.
    pub failure_patterns: Vec<String>,
    /// Lines of container log fetched for pattern scanning and archiving.
    pub log_tail_lines: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            status_print_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            sync_timeout: Duration::from_secs(180 * 60),
            unresponsive_timeout: Duration::from_secs(5 * 60),
            stall_timeout: Duration::from_secs(15 * 60),
            processing_duration: Duration::from_secs(30 * 60),
            flap_policy: FlapPolicy::default(),
            failure_patterns: vec![
                "Sync cycle failed".to_string(),
                "validation failed".to_string(),
                "BodiesNotFound".to_string(),
            ],
            log_tail_lines: 200,
        }
    }
}

/// Source update and rebuild steps run before each cycle when enabled.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub enabled: bool,
    /// Checkout of the monitored client's source.
    pub repo_dir: PathBuf,
    /// Directory holding the compose file that runs the fleet.
    pub compose_dir: PathBuf,
    pub branch: String,
    pub profile: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            repo_dir: PathBuf::from("."),
            compose_dir: PathBuf::from("."),
            branch: "main".to_string(),
            profile: "release".to_string(),
        }
    }
}

/// Webhook notification sinks. Absent URLs disable the matching channel.
#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    pub enabled: bool,
    pub success_webhook: Option<String>,
    pub failure_webhook: Option<String>,
}

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub instances: Vec<InstanceSpec>,
    pub monitor: MonitorConfig,
    pub update: UpdateConfig,
    pub notify: NotifyConfig,
    /// Append-only run history file.
    pub history_path: PathBuf,
    /// Per-run log archive root.
    pub logs_dir: PathBuf,
    /// Start a fresh cycle after each completed run.
    pub auto_loop: bool,
    /// Stop after this many cycles when looping.
    pub max_runs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            monitor: MonitorConfig::default(),
            update: UpdateConfig::default(),
            notify: NotifyConfig::default(),
            history_path: PathBuf::from("vigil_history.txt"),
            logs_dir: PathBuf::from("vigil_logs"),
            auto_loop: false,
            max_runs: None,
        }
    }
}

// TOML file shape. Every field is optional; values present override the
// built-in defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    instances: Vec<InstanceSpec>,
    #[serde(default)]
    monitor: MonitorFile,
    #[serde(default)]
    update: UpdateFile,
    #[serde(default)]
    notify: NotifyFile,
    history_path: Option<PathBuf>,
    logs_dir: Option<PathBuf>,
    auto_loop: Option<bool>,
    max_runs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MonitorFile {
    tick_interval_secs: Option<u64>,
    status_print_interval_secs: Option<u64>,
    probe_timeout_secs: Option<u64>,
    sync_timeout_mins: Option<u64>,
    unresponsive_timeout_secs: Option<u64>,
    stall_timeout_secs: Option<u64>,
    processing_duration_mins: Option<u64>,
    flap_policy: Option<FlapPolicy>,
    failure_patterns: Option<Vec<String>>,
    log_tail_lines: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateFile {
    enabled: Option<bool>,
    repo_dir: Option<PathBuf>,
    compose_dir: Option<PathBuf>,
    branch: Option<String>,
    profile: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NotifyFile {
    enabled: Option<bool>,
    success_webhook: Option<String>,
    failure_webhook: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file layered over the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let file: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(Self::from_parts(file))
    }

    fn from_parts(file: ConfigFile) -> Self {
        let mut config = Config::default();

        if !file.instances.is_empty() {
            config.instances = file.instances;
        }

        let m = file.monitor;
        let mon = &mut config.monitor;
        if let Some(secs) = m.tick_interval_secs {
            mon.tick_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = m.status_print_interval_secs {
            mon.status_print_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = m.probe_timeout_secs {
            mon.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(mins) = m.sync_timeout_mins {
            mon.sync_timeout = Duration::from_secs(mins * 60);
        }
        if let Some(secs) = m.unresponsive_timeout_secs {
            mon.unresponsive_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = m.stall_timeout_secs {
            mon.stall_timeout = Duration::from_secs(secs);
        }
        if let Some(mins) = m.processing_duration_mins {
            mon.processing_duration = Duration::from_secs(mins * 60);
        }
        if let Some(policy) = m.flap_policy {
            mon.flap_policy = policy;
        }
        if let Some(patterns) = m.failure_patterns {
            mon.failure_patterns = patterns;
        }
        if let Some(lines) = m.log_tail_lines {
            mon.log_tail_lines = lines;
        }

        let u = file.update;
        let upd = &mut config.update;
        if let Some(enabled) = u.enabled {
            upd.enabled = enabled;
        }
        if let Some(dir) = u.repo_dir {
            upd.repo_dir = dir;
        }
        if let Some(dir) = u.compose_dir {
            upd.compose_dir = dir;
        }
        if let Some(branch) = u.branch {
            upd.branch = branch;
        }
        if let Some(profile) = u.profile {
            upd.profile = profile;
        }

        let n = file.notify;
        if let Some(enabled) = n.enabled {
            config.notify.enabled = enabled;
        }
        config.notify.success_webhook = n.success_webhook;
        config.notify.failure_webhook = n.failure_webhook;

        if let Some(path) = file.history_path {
            config.history_path = path;
        }
        if let Some(dir) = file.logs_dir {
            config.logs_dir = dir;
        }
        if let Some(auto_loop) = file.auto_loop {
            config.auto_loop = auto_loop;
        }
        config.max_runs = file.max_runs;

        config
    }
}
