use std::collections::HashSet;
use std::hash::Hash;
use tracing::{debug, info};
use crate::config::CompareConfig;
use crate::snapshot::{
    LoggedOnUser, NetworkConnection, PersistenceMechanism, Process, Snapshot, SystemInfo,
};
use super::changeset::{
    ChangeSet, ChangeSummary, ExecutionChanges, SystemChanges, UptimeChange, ValueChange,
};

/// Key-based diff of two snapshots.
pub struct SnapshotComparator {
    config: CompareConfig,
}

impl Default for SnapshotComparator {
    fn default() -> Self {
        Self::new(CompareConfig::default())
    }
}

impl SnapshotComparator {
    pub fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    pub fn compare(&self, baseline: &Snapshot, current: &Snapshot) -> ChangeSet {
        let before = &baseline.artifacts;
        let after = &current.artifacts;

        let process_key = |p: &Process| (p.name.clone(), p.executable_path.clone());
        let new_processes = added(&before.running_processes, &after.running_processes, process_key);
        let removed_processes = added(&after.running_processes, &before.running_processes, process_key);

        let connection_key = |c: &NetworkConnection| {
            (c.protocol.clone(), c.local_address.clone(), c.remote_address.clone())
        };
        let new_connections =
            added(&before.network_connections, &after.network_connections, connection_key);
        let removed_connections =
            added(&after.network_connections, &before.network_connections, connection_key);

        let persistence_key = |m: &PersistenceMechanism| {
            (m.mechanism_type.clone(), m.name.clone(), m.source.clone())
        };
        let new_persistence =
            added(&before.persistence_mechanisms, &after.persistence_mechanisms, persistence_key);
        let removed_persistence =
            added(&after.persistence_mechanisms, &before.persistence_mechanisms, persistence_key);

        let new_execution = ExecutionChanges {
            prefetch_files: added(
                &before.execution_evidence.prefetch_files,
                &after.execution_evidence.prefetch_files,
                |f| f.filename.clone(),
            ),
            shimcache_entries: added(
                &before.execution_evidence.shimcache_entries,
                &after.execution_evidence.shimcache_entries,
                |e| e.path.clone(),
            ),
        };

        let system_changes = self.compare_system(baseline, current);

        let mut summary = ChangeSummary {
            new_processes: new_processes.len(),
            removed_processes: removed_processes.len(),
            new_connections: new_connections.len(),
            removed_connections: removed_connections.len(),
            new_persistence: new_persistence.len(),
            removed_persistence: removed_persistence.len(),
            new_execution: new_execution.len(),
            system_changes: system_changes.count(),
            total_changes: 0,
        };
        summary.total_changes = summary.new_processes
            + summary.removed_processes
            + summary.new_connections
            + summary.removed_connections
            + summary.new_persistence
            + summary.removed_persistence
            + summary.new_execution
            + summary.system_changes;

        debug!(
            new_processes = summary.new_processes,
            removed_processes = summary.removed_processes,
            new_connections = summary.new_connections,
            removed_connections = summary.removed_connections,
            new_persistence = summary.new_persistence,
            removed_persistence = summary.removed_persistence,
            new_execution = summary.new_execution,
            "compared artifact categories"
        );
        info!(
            baseline = %baseline.scan_metadata.scan_id,
            current = %current.scan_metadata.scan_id,
            total = summary.total_changes,
            "comparison complete"
        );

        ChangeSet {
            baseline_scan_id: baseline.scan_metadata.scan_id,
            current_scan_id: current.scan_metadata.scan_id,
            new_processes,
            removed_processes,
            new_connections,
            removed_connections,
            new_persistence,
            removed_persistence,
            new_execution,
            system_changes,
            summary,
        }
    }

    fn compare_system(&self, baseline: &Snapshot, current: &Snapshot) -> SystemChanges {
        let mut changes = SystemChanges {
            uptime_change: self.uptime_change(&baseline.artifacts.system_info, &current.artifacts.system_info),
            ..SystemChanges::default()
        };

        let (old_meta, new_meta) = (&baseline.scan_metadata, &current.scan_metadata);
        if old_meta.hostname != new_meta.hostname {
            changes.hostname_change = Some(ValueChange {
                baseline: old_meta.hostname.clone(),
                current: new_meta.hostname.clone(),
            });
        }
        if old_meta.os_version != new_meta.os_version {
            changes.os_version_change = Some(ValueChange {
                baseline: old_meta.os_version.clone(),
                current: new_meta.os_version.clone(),
            });
        }

        let user_key = |u: &LoggedOnUser| (u.domain.clone(), u.username.clone());
        let old_users = &baseline.artifacts.system_info.logged_on_users;
        let new_users = &current.artifacts.system_info.logged_on_users;
        changes.new_users = added(old_users, new_users, user_key);
        changes.removed_users = added(new_users, old_users, user_key);

        changes
    }

    fn uptime_change(&self, baseline: &SystemInfo, current: &SystemInfo) -> Option<UptimeChange> {
        let change = UptimeChange::new(baseline.uptime_secs, current.uptime_secs);
        (change.magnitude() > self.config.uptime_discontinuity_secs).then_some(change)
    }
}

/// Items of `to` whose key is absent from `from`, first occurrence per key,
/// in `to` order.
fn added<T, K, F>(from: &[T], to: &[T], key: F) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let known: HashSet<K> = from.iter().map(&key).collect();
    let mut seen = HashSet::new();
    to.iter()
        .filter(|item| {
            let k = key(*item);
            !known.contains(&k) && seen.insert(k)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_keeps_order_and_dedups() {
        let from = vec![("a", 1), ("b", 2)];
        let to = vec![("c", 3), ("a", 9), ("c", 4), ("d", 5)];
        let result = added(&from, &to, |(name, _)| *name);
        assert_eq!(result, vec![("c", 3), ("d", 5)]);
    }

    #[test]
    fn test_added_symmetry() {
        let a = vec![1, 2, 3, 3];
        let b = vec![3, 4, 4, 5];
        assert_eq!(added(&a, &b, |x| *x), vec![4, 5]);
        assert_eq!(added(&b, &a, |x| *x), vec![1, 2]);
    }
}
