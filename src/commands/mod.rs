pub mod history;
pub mod monitor;
pub mod run;

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::NotifyConfig;
use crate::notify::{NoopNotifier, Notify, WebhookNotifier};

/// Build the configured notification sink.
pub(crate) fn build_notifier(config: &NotifyConfig) -> Result<Box<dyn Notify>> {
    if !config.enabled {
        return Ok(Box::new(NoopNotifier));
    }
    let notifier = WebhookNotifier::new(
        config.success_webhook.clone(),
        config.failure_webhook.clone(),
    )?;
    Ok(Box::new(notifier))
}

/// Install a Ctrl-C handler that flips a shared flag. The scheduler checks
/// the flag at its sleep point; no teardown happens on interrupt.
pub(crate) fn install_interrupt_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install interrupt handler")?;
    Ok(flag)
}
