use serde::Serialize;
use uuid::Uuid;
use crate::snapshot::{
    LoggedOnUser, NetworkConnection, PersistenceMechanism, PrefetchFile, Process, ShimcacheEntry,
};

/// Differences between a baseline and a current snapshot of the same host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSet {
    pub baseline_scan_id: Uuid,
    pub current_scan_id: Uuid,
    pub new_processes: Vec<Process>,
    pub removed_processes: Vec<Process>,
    pub new_connections: Vec<NetworkConnection>,
    pub removed_connections: Vec<NetworkConnection>,
    pub new_persistence: Vec<PersistenceMechanism>,
    pub removed_persistence: Vec<PersistenceMechanism>,
    pub new_execution: ExecutionChanges,
    pub system_changes: SystemChanges,
    pub summary: ChangeSummary,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        self.summary.total_changes > 0
    }
}

/// Execution evidence only appears; removals are not tracked.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionChanges {
    pub prefetch_files: Vec<PrefetchFile>,
    pub shimcache_entries: Vec<ShimcacheEntry>,
}

impl ExecutionChanges {
    pub fn len(&self) -> usize {
        self.prefetch_files.len() + self.shimcache_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_change: Option<UptimeChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname_change: Option<ValueChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version_change: Option<ValueChange>,
    pub new_users: Vec<LoggedOnUser>,
    pub removed_users: Vec<LoggedOnUser>,
}

impl SystemChanges {
    pub fn count(&self) -> usize {
        usize::from(self.uptime_change.is_some())
            + usize::from(self.hostname_change.is_some())
            + usize::from(self.os_version_change.is_some())
            + self.new_users.len()
            + self.removed_users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Uptime moved by more than the configured window, which usually means a
/// reboot between scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UptimeChange {
    pub baseline: u64,
    pub current: u64,
    pub difference_secs: i64,
}

impl UptimeChange {
    pub fn new(baseline: u64, current: u64) -> Self {
        let difference_secs = i64::try_from(current)
            .unwrap_or(i64::MAX)
            .saturating_sub(i64::try_from(baseline).unwrap_or(i64::MAX));
        Self {
            baseline,
            current,
            difference_secs,
        }
    }

    pub fn magnitude(&self) -> u64 {
        self.baseline.abs_diff(self.current)
    }

    /// Uptime went backwards.
    pub fn indicates_reboot(&self) -> bool {
        self.current < self.baseline
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueChange {
    pub baseline: String,
    pub current: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub new_processes: usize,
    pub removed_processes: usize,
    pub new_connections: usize,
    pub removed_connections: usize,
    pub new_persistence: usize,
    pub removed_persistence: usize,
    pub new_execution: usize,
    pub system_changes: usize,
    pub total_changes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_change_direction() {
        let reboot = UptimeChange::new(200_000, 600);
        assert!(reboot.indicates_reboot());
        assert_eq!(reboot.difference_secs, -199_400);
        assert_eq!(reboot.magnitude(), 199_400);

        let long_gap = UptimeChange::new(600, 200_000);
        assert!(!long_gap.indicates_reboot());
        assert_eq!(long_gap.difference_secs, 199_400);
    }

    #[test]
    fn test_system_changes_count() {
        let mut changes = SystemChanges::default();
        assert!(changes.is_empty());
        changes.uptime_change = Some(UptimeChange::new(0, 100_000));
        changes.new_users.push(LoggedOnUser {
            username: "alice".to_string(),
            domain: "CORP".to_string(),
            logon_time: "2024-03-01T08:00:00Z".to_string(),
        });
        assert_eq!(changes.count(), 2);
    }
}
