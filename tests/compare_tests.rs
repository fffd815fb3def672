use triagescope::{
    CompareConfig, IndicatorAnalyzer, IndicatorCategory, PersistenceType, Snapshot,
    SnapshotComparator, SnapshotLoader,
};
use serde_json::json;
use std::path::Path;

fn fixtures_path() -> &'static Path {
    Path::new("tests/fixtures")
}

fn load(name: &str) -> Snapshot {
    SnapshotLoader::new().load(fixtures_path().join(name)).unwrap()
}

#[test]
fn test_identical_snapshots_have_no_changes() {
    let snapshot = load("clean_scan.json");
    let changes = SnapshotComparator::default().compare(&snapshot, &snapshot);
    assert!(!changes.has_changes());
    assert_eq!(changes.summary.total_changes, 0);
}

#[test]
fn test_baseline_to_current() {
    let baseline = load("baseline_scan.json");
    let current = load("current_scan.json");
    let changes = SnapshotComparator::default().compare(&baseline, &current);

    assert_eq!(changes.new_processes.len(), 1);
    assert_eq!(changes.new_processes[0].name, "upd.exe");
    assert_eq!(changes.removed_processes.len(), 1);
    assert_eq!(changes.removed_processes[0].name, "Teams.exe");

    assert_eq!(changes.new_connections.len(), 1);
    assert_eq!(changes.new_connections[0].remote_address, "45.33.32.156:8443");
    assert!(changes.removed_connections.is_empty());

    assert_eq!(changes.new_execution.prefetch_files.len(), 1);
    assert!(changes.new_execution.shimcache_entries.is_empty());

    let system = &changes.system_changes;
    let uptime = system.uptime_change.unwrap();
    assert_eq!(uptime.baseline, 200_000);
    assert_eq!(uptime.current, 600);
    assert!(uptime.indicates_reboot());
    assert!(system.hostname_change.is_none());
    assert_eq!(system.new_users.len(), 1);
    assert_eq!(system.new_users[0].username, "svc_backup");
    assert!(system.removed_users.is_empty());

    assert_eq!(changes.summary.system_changes, 2);
    assert_eq!(changes.summary.total_changes, 8);
}

#[test]
fn test_persistence_swap_and_analysis() {
    let baseline = load("baseline_scan.json");
    let current = load("current_scan.json");
    let changes = SnapshotComparator::default().compare(&baseline, &current);

    assert_eq!(changes.removed_persistence.len(), 1);
    assert_eq!(changes.removed_persistence[0].name, "Updater");
    assert_eq!(changes.new_persistence.len(), 1);
    assert_eq!(changes.new_persistence[0].name, "Updater2");
    assert_eq!(changes.new_persistence[0].mechanism_type, PersistenceType::ScheduledTask);

    let analyzer = IndicatorAnalyzer::default();
    assert!(analyzer
        .analyze(&baseline)
        .by_category(IndicatorCategory::UnusualPersistence)
        .is_empty());

    let report = analyzer.analyze(&current);
    let unusual = report.by_category(IndicatorCategory::UnusualPersistence);
    assert_eq!(unusual.len(), 1);
    assert!(unusual[0].evidence.to_string().contains("Updater2"));
}

#[test]
fn test_comparison_is_antisymmetric() {
    let a = load("baseline_scan.json");
    let b = load("current_scan.json");
    let comparator = SnapshotComparator::default();
    let forward = comparator.compare(&a, &b);
    let backward = comparator.compare(&b, &a);

    assert_eq!(forward.new_processes, backward.removed_processes);
    assert_eq!(forward.removed_processes, backward.new_processes);
    assert_eq!(forward.new_connections, backward.removed_connections);
    assert_eq!(forward.new_persistence, backward.removed_persistence);
    assert_eq!(forward.system_changes.new_users, backward.system_changes.removed_users);
}

#[test]
fn test_pid_change_alone_is_not_a_new_process() {
    let baseline = load("clean_scan.json");
    let mut current = baseline.clone();
    current.artifacts.running_processes[3].pid = 4444;
    let changes = SnapshotComparator::default().compare(&baseline, &current);
    assert!(changes.new_processes.is_empty());
    assert!(changes.removed_processes.is_empty());
}

#[test]
fn test_duplicate_keys_reported_once() {
    let baseline = load("clean_scan.json");
    let mut current = baseline.clone();
    let mut extra = current.artifacts.running_processes[3].clone();
    extra.executable_path = "C:\\Temp\\svchost.exe".to_string();
    current.artifacts.running_processes.push(extra.clone());
    extra.pid = 9999;
    current.artifacts.running_processes.push(extra);

    let changes = SnapshotComparator::default().compare(&baseline, &current);
    assert_eq!(changes.new_processes.len(), 1);
    assert_eq!(changes.new_processes[0].pid, 1020);
}

#[test]
fn test_uptime_threshold() {
    let baseline = load("clean_scan.json");
    let mut current = baseline.clone();
    current.artifacts.system_info.uptime_secs = baseline.artifacts.system_info.uptime_secs + 86_400;
    assert!(SnapshotComparator::default()
        .compare(&baseline, &current)
        .system_changes
        .uptime_change
        .is_none());

    current.artifacts.system_info.uptime_secs += 1;
    assert!(SnapshotComparator::default()
        .compare(&baseline, &current)
        .system_changes
        .uptime_change
        .is_some());

    let relaxed = SnapshotComparator::new(CompareConfig {
        uptime_discontinuity_secs: 7 * 86_400,
    });
    assert!(relaxed
        .compare(&baseline, &current)
        .system_changes
        .uptime_change
        .is_none());
}

#[test]
fn test_host_metadata_changes() {
    let baseline = load("clean_scan.json");
    let mut current = baseline.clone();
    current.scan_metadata.hostname = "WS-FIN-043".to_string();
    current.scan_metadata.os_version = "Windows 11 Enterprise 23H2".to_string();

    let changes = SnapshotComparator::default().compare(&baseline, &current);
    let hostname = changes.system_changes.hostname_change.as_ref().unwrap();
    assert_eq!(hostname.baseline, "WS-FIN-042");
    assert_eq!(hostname.current, "WS-FIN-043");
    assert!(changes.system_changes.os_version_change.is_some());
    assert_eq!(changes.summary.total_changes, 2);
}

#[test]
fn test_execution_removals_not_tracked() {
    let baseline = load("current_scan.json");
    let current = load("baseline_scan.json");
    let changes = SnapshotComparator::default().compare(&baseline, &current);
    assert!(changes.new_execution.is_empty());
}

#[test]
fn test_changeset_serializes() {
    let changes = SnapshotComparator::default()
        .compare(&load("baseline_scan.json"), &load("current_scan.json"));
    let value = serde_json::to_value(&changes).unwrap();
    assert_eq!(value["summary"]["new_persistence"], json!(1));
    assert_eq!(value["new_persistence"][0]["type"], json!("Scheduled Task"));
    assert_eq!(value["system_changes"]["uptime_change"]["difference_secs"], json!(-199_400));
    assert!(value["system_changes"].get("hostname_change").is_none());
}
