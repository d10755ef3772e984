//! Small formatting and time helpers shared across the crate.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Format a duration as a compact human-readable string, e.g. `1h 2m 3s`.
///
/// Zero components are omitted except that a zero duration renders as `0s`.
pub fn format_elapsed(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

/// Whether strictly more than `window` has passed since `since`.
///
/// Negative elapsed time (clock skew) never counts as exceeded.
pub fn exceeds(since: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now.signed_duration_since(since)
        .to_std()
        .map(|elapsed| elapsed > window)
        .unwrap_or(false)
}

/// Elapsed wall-clock time since `since`, clamped to zero on skew.
pub fn elapsed_since(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(since)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Truncate a string to at most `max_len` characters, appending `...` when cut.
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
