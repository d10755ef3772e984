//! Status snapshot rendering.
//!
//! Pure text assembly, decoupled from the polling loop so it can be tested
//! without running a fleet. The scheduler decides when to print and whether
//! to clear the screen first.

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::config::MonitorConfig;
use crate::models::{Instance, InstanceState};
use crate::util::{elapsed_since, format_elapsed};

/// ANSI sequence clearing the screen and homing the cursor, printed by the
/// scheduler ahead of each snapshot.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Render a one-screen snapshot of the fleet.
pub fn render(instances: &[Instance], config: &MonitorConfig, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(&"=".repeat(60));
    out.push('\n');
    out.push_str(&format!("Status at {}\n", now.format("%H:%M:%S")));
    out.push_str(&"=".repeat(60));
    out.push('\n');

    for inst in instances {
        out.push_str(&render_instance(inst, config, now));
        out.push('\n');
    }

    out
}

fn render_instance(inst: &Instance, config: &MonitorConfig, now: DateTime<Utc>) -> String {
    let tag = match inst.state {
        InstanceState::Waiting => "⏳",
        InstanceState::Syncing => "🔄",
        InstanceState::Synced => "✅",
        InstanceState::Processing => "📦",
        InstanceState::Success => "🎉",
        InstanceState::Failed => "❌",
    };

    let state = match inst.state {
        InstanceState::Success => inst.state.to_string().green().bold().to_string(),
        InstanceState::Failed => inst.state.to_string().red().bold().to_string(),
        _ => inst.state.to_string(),
    };

    let extra = match inst.state {
        InstanceState::Waiting => " (waiting for node...)".to_string(),
        InstanceState::Syncing => {
            format!(" ({} elapsed)", format_elapsed(inst.elapsed_in_state(now)))
        }
        InstanceState::Synced => match inst.sync_duration {
            Some(sync) => format!(" (synced in {})", format_elapsed(sync)),
            None => String::new(),
        },
        InstanceState::Processing => {
            let block = inst
                .last_progress_counter
                .map(|b| b.to_string())
                .unwrap_or_else(|| "?".to_string());
            let remaining = config
                .processing_duration
                .saturating_sub(inst.elapsed_in_state(now));
            format!(" (block {block}, {} remaining)", format_elapsed(remaining))
        }
        InstanceState::Success => {
            let mut parts = Vec::new();
            if let Some(sync) = inst.sync_duration {
                parts.push(format!("synced in {}", format_elapsed(sync)));
            }
            if let Some(blocks) = inst.blocks_advanced() {
                parts.push(format!("+{blocks} blocks"));
            }
            if parts.is_empty() {
                String::new()
            } else {
                format!(" ({})", parts.join(", "))
            }
        }
        InstanceState::Failed => match &inst.failure {
            Some(reason) => format!(" - {reason}"),
            None => String::new(),
        },
    };

    format!("  {tag} {} ({}): {state}{extra}", inst.name.bold(), inst.endpoint)
}
