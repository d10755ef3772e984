//! Source update, build, and container restart operations.
//!
//! A failed pull or build is a hard prerequisite failure for a run; the
//! orchestrator propagates those. Restarting workers is likewise
//! prerequisite. Nothing here ever tears a worker down.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

use crate::config::UpdateConfig;

/// Control surface for preparing a fleet run.
pub trait ControlPlane {
    /// Fast-forward the monitored client's checkout to the latest commit on
    /// `branch`. Returns the short commit id now checked out.
    fn pull_latest(&self, branch: &str) -> Result<String>;

    /// Rebuild the monitored client with the given cargo profile.
    fn build(&self, profile: &str) -> Result<()>;

    /// Restart the given containers. Start-only; never removes volumes or
    /// sibling services.
    fn restart(&self, containers: &[String]) -> Result<()>;
}

/// Control plane backed by the `git`, `cargo`, and `docker` CLIs.
pub struct CommandControl {
    repo_dir: PathBuf,
    compose_dir: PathBuf,
}

impl CommandControl {
    pub fn new(update: &UpdateConfig) -> Self {
        Self {
            repo_dir: update.repo_dir.clone(),
            compose_dir: update.compose_dir.clone(),
        }
    }
}

impl ControlPlane for CommandControl {
    fn pull_latest(&self, branch: &str) -> Result<String> {
        run_in(
            &self.repo_dir,
            "git",
            &["pull", "--ff-only", "origin", branch],
        )
        .with_context(|| format!("Failed to pull branch '{branch}'"))?;

        let commit = run_in(&self.repo_dir, "git", &["rev-parse", "--short", "HEAD"])
            .context("Failed to resolve HEAD after pull")?;
        let commit = commit.trim().to_string();
        info!(%commit, "source updated");
        Ok(commit)
    }

    fn build(&self, profile: &str) -> Result<()> {
        run_in(&self.repo_dir, "cargo", &["build", "--profile", profile])
            .with_context(|| format!("Build failed (profile '{profile}')"))?;
        Ok(())
    }

    fn restart(&self, containers: &[String]) -> Result<()> {
        let mut args = vec!["compose", "restart"];
        args.extend(containers.iter().map(String::as_str));
        run_in(&self.compose_dir, "docker", &args).context("Failed to restart workers")?;
        Ok(())
    }
}

/// Run a command in a directory, returning stdout on success and a
/// stderr-bearing error otherwise.
fn run_in(dir: &Path, program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("Failed to execute {program}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{program} {} exited with {}: {}",
            args.join(" "),
            output.status,
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
