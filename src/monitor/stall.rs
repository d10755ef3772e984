//! Forward-progress stall detection.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::util::exceeds;

/// Whether no forward progress has been observed for strictly more than
/// `stall_timeout`.
///
/// Pure over its inputs; reused for both the unresponsive check in
/// `Syncing` and the progress check in `Processing`, each with its own
/// timeout. `last_progress_at` being `None` means no progress has ever
/// been observed, which never counts as stalled on its own; callers pass
/// the phase-entry time as the initial mark instead.
pub fn is_stalled(
    last_progress_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    stall_timeout: Duration,
) -> bool {
    match last_progress_at {
        Some(mark) => exceeds(mark, now, stall_timeout),
        None => false,
    }
}
