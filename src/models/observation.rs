//! Normalized inputs consumed by the state machine on each poll tick.

use chrono::{DateTime, Utc};

/// Result of one bounded-timeout health probe against a worker's endpoint.
///
/// Probes never error: timeouts and network failures collapse to
/// `reachable = false` with both optional fields absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub reachable: bool,
    /// Current progress counter (block height), when the node answered.
    pub progress: Option<u64>,
    /// Whether the node reports itself as still bulk-syncing.
    /// `Some(false)` means fully synced; `None` means the sync query failed.
    pub syncing: Option<bool>,
}

impl ProbeReport {
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            progress: None,
            syncing: None,
        }
    }

    pub fn up(progress: u64, syncing: bool) -> Self {
        Self {
            reachable: true,
            progress: Some(progress),
            syncing: Some(syncing),
        }
    }
}

/// Observed state of a worker's backing container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    Running {
        started_at: Option<DateTime<Utc>>,
    },
    Exited {
        code: i64,
    },
    /// Inspection failed or the container does not exist.
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_report_has_no_data() {
        let report = ProbeReport::unreachable();
        assert!(!report.reachable);
        assert!(report.progress.is_none());
        assert!(report.syncing.is_none());
    }

    #[test]
    fn test_reachable_report() {
        let report = ProbeReport::up(1234, true);
        assert!(report.reachable);
        assert_eq!(report.progress, Some(1234));
        assert_eq!(report.syncing, Some(true));
    }
}
