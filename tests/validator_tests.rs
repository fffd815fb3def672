use triagescope::validator::codes;
use triagescope::{FindingSeverity, Snapshot, SnapshotValidator, ValidatorConfig};
use serde_json::{json, Value};
use std::path::Path;

fn fixtures_path() -> &'static Path {
    Path::new("tests/fixtures")
}

fn load_fixture(name: &str) -> Value {
    let text = std::fs::read_to_string(fixtures_path().join(name)).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn clean() -> Value {
    load_fixture("clean_scan.json")
}

#[test]
fn test_clean_fixture_has_no_findings() {
    let report = SnapshotValidator::default().validate(&clean());
    assert!(report.is_valid());
    assert!(report.findings.is_empty(), "{:?}", report.findings);
}

#[test]
fn test_compromised_fixture_is_valid_with_unsigned_warnings() {
    let report = SnapshotValidator::default().validate(&load_fixture("compromised_scan.json"));
    assert!(report.is_valid(), "{:?}", report.findings);
    assert_eq!(report.error_count(), 0);
    assert_eq!(report.warning_count(), 2);
    assert!(report.warnings().all(|f| f.code == codes::UNSIGNED_PROCESS));
}

#[test]
fn test_accepted_fixtures_decode_into_records() {
    for name in ["clean_scan.json", "compromised_scan.json", "baseline_scan.json", "current_scan.json"] {
        let doc = load_fixture(name);
        assert!(SnapshotValidator::default().validate(&doc).is_valid(), "{}", name);
        let snapshot = Snapshot::from_value(doc).unwrap();
        assert!(!snapshot.artifacts.running_processes.is_empty(), "{}", name);
    }
}

#[test]
fn test_missing_top_level_section_still_checks_others() {
    for section in Snapshot::TOP_LEVEL_SECTIONS {
        let mut doc = clean();
        doc.as_object_mut().unwrap().remove(*section);
        // Broken record in a section that is still present.
        if *section != "artifacts" {
            doc["artifacts"]["running_processes"][1]["pid"] = json!(-5);
        } else {
            doc["scan_metadata"]["scan_id"] = json!("bogus");
        }

        let report = SnapshotValidator::default().validate(&doc);
        let missing: Vec<_> = report
            .errors()
            .filter(|f| f.code == codes::MISSING_SECTION)
            .collect();
        assert_eq!(missing.len(), 1, "{}", section);
        assert!(missing[0].message.contains(section));
        assert_eq!(report.error_count(), 2, "{}: {:?}", section, report.findings);
    }
}

#[test]
fn test_missing_artifact_section_names_it() {
    let mut doc = clean();
    doc["artifacts"].as_object_mut().unwrap().remove("persistence_mechanisms");
    let report = SnapshotValidator::default().validate(&doc);
    assert_eq!(report.error_count(), 1);
    let finding = report.errors().next().unwrap();
    assert_eq!(finding.section, "persistence_mechanisms");
    assert!(finding.message.contains("persistence_mechanisms"));
}

#[test]
fn test_negative_duration_is_exactly_one_error() {
    let mut doc = clean();
    doc["scan_metadata"]["scan_duration_ms"] = json!(-1);
    let report = SnapshotValidator::default().validate(&doc);
    let errors: Vec<_> = report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].section, "scan_metadata");
    assert!(errors[0].message.contains("scan_duration_ms"));
}

#[test]
fn test_hash_presence_controls_unsigned_warning() {
    let doc = clean();
    let report = SnapshotValidator::default().validate(&doc);
    assert!(report.warnings().all(|f| f.code != codes::UNSIGNED_PROCESS));

    let mut doc = clean();
    doc["artifacts"]["running_processes"][2]
        .as_object_mut()
        .unwrap()
        .remove("sha256_hash");
    let report = SnapshotValidator::default().validate(&doc);
    let unsigned: Vec<_> = report
        .warnings()
        .filter(|f| f.code == codes::UNSIGNED_PROCESS)
        .collect();
    assert_eq!(unsigned.len(), 1);
    assert_eq!(unsigned[0].index, Some(2));

    let mut doc = clean();
    doc["artifacts"]["running_processes"][2]["sha256_hash"] = Value::Null;
    let report = SnapshotValidator::default().validate(&doc);
    assert_eq!(report.warning_count(), 1);
}

#[test]
fn test_every_problem_is_reported() {
    let mut doc = clean();
    doc["scan_metadata"]["scan_start_utc"] = json!("yesterday");
    doc["artifacts"]["running_processes"][1]["pid"] = json!(0);
    doc["artifacts"]["network_connections"][0]["protocol"] = json!("ICMP");
    doc["artifacts"]["network_connections"][1]["state"] = json!("HALF_OPEN");
    doc["artifacts"]["network_connections"][1]["local_address"] = json!("192.168.10.25");
    doc["artifacts"]["event_logs"]["system"][0]["level"] = json!("Fatal");
    doc["collection_log"][0]["level"] = json!("TRACE");

    let report = SnapshotValidator::default().validate(&doc);
    let codes_found: Vec<&str> = report.errors().map(|f| f.code).collect();
    assert_eq!(report.error_count(), 7, "{:?}", report.findings);
    assert!(codes_found.contains(&codes::INVALID_TIMESTAMP));
    assert!(codes_found.contains(&codes::INVALID_PID));
    assert!(codes_found.contains(&codes::INVALID_ADDRESS));
    assert_eq!(codes_found.iter().filter(|c| **c == codes::INVALID_ENUM).count(), 4);
}

#[test]
fn test_zero_pid_allowed_by_config() {
    let mut doc = clean();
    doc["artifacts"]["running_processes"][1]["pid"] = json!(0);

    let strict = SnapshotValidator::default().validate(&doc);
    assert!(!strict.is_valid());

    let lenient = SnapshotValidator::new(ValidatorConfig {
        allow_zero_pid: true,
        ..ValidatorConfig::default()
    })
    .validate(&doc);
    assert!(lenient.is_valid(), "{:?}", lenient.findings);
}

#[test]
fn test_collector_tcp_states_accepted() {
    let mut doc = clean();
    for (i, state) in ["LISTEN", "SYN_RCVD", "CLOSING", "DELETE_TCB"].iter().enumerate() {
        doc["artifacts"]["network_connections"][i]["state"] = json!(state);
    }
    assert!(SnapshotValidator::default().validate(&doc).findings.is_empty());
}

#[test]
fn test_unknown_persistence_type_is_warning() {
    let mut doc = clean();
    doc["artifacts"]["persistence_mechanisms"][0]["type"] = json!("Browser Extension");
    let report = SnapshotValidator::default().validate(&doc);
    assert!(report.is_valid());
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].code, codes::UNKNOWN_PERSISTENCE_TYPE);
    assert_eq!(report.findings[0].severity, FindingSeverity::Warning);
}

#[test]
fn test_dangling_owning_pid_warns() {
    let mut doc = clean();
    doc["artifacts"]["network_connections"][1]["owning_pid"] = json!(31337);
    let report = SnapshotValidator::default().validate(&doc);
    assert!(report.is_valid());
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].code, codes::DANGLING_OWNING_PID);
    assert_eq!(report.findings[0].location(), "network_connections[1]");
}

#[test]
fn test_unattributed_socket_is_not_dangling() {
    let mut doc = clean();
    doc["artifacts"]["network_connections"][0]["owning_pid"] = json!(0);
    assert!(SnapshotValidator::default().validate(&doc).findings.is_empty());
}

#[test]
fn test_volume_sanity_warnings() {
    let mut doc = clean();
    doc["artifacts"]["running_processes"] = json!([]);
    doc["artifacts"]["network_connections"] = json!([]);
    let report = SnapshotValidator::default().validate(&doc);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].code, codes::NO_PROCESSES);

    let doc = clean();
    let report = SnapshotValidator::new(ValidatorConfig {
        max_processes: 2,
        max_connections: 1,
        ..ValidatorConfig::default()
    })
    .validate(&doc);
    let warning_codes: Vec<&str> = report.warnings().map(|f| f.code).collect();
    assert_eq!(warning_codes, vec![codes::HIGH_PROCESS_COUNT, codes::HIGH_CONNECTION_COUNT]);
}

#[test]
fn test_warnings_as_errors() {
    let doc = load_fixture("compromised_scan.json");
    let report = SnapshotValidator::new(ValidatorConfig {
        warnings_as_errors: true,
        ..ValidatorConfig::default()
    })
    .validate(&doc);
    assert_eq!(report.error_count(), 0);
    assert!(!report.is_valid());
}

#[test]
fn test_wrong_section_types() {
    let mut doc = clean();
    doc["artifacts"]["running_processes"] = json!({"pid": 4});
    doc["artifacts"]["event_logs"]["security"] = json!("none");
    doc["collection_log"] = json!(null);
    let report = SnapshotValidator::default().validate(&doc);
    assert_eq!(report.error_count(), 3);
    assert!(report.errors().all(|f| f.code == codes::WRONG_SECTION_TYPE));
}

#[test]
fn test_execution_evidence_rules() {
    let mut doc = clean();
    doc["artifacts"]["execution_evidence"]["prefetch_files"][0]["filename"] = json!("SVCHOST.EXE");
    doc["artifacts"]["execution_evidence"]["prefetch_files"][0]["run_count"] = json!(-3);
    doc["artifacts"]["execution_evidence"]["shimcache_entries"][0]["file_size"] = json!(-1);
    doc["artifacts"]["execution_evidence"]["shimcache_entries"][0]["last_modified"] = json!("13/13/2023");
    let report = SnapshotValidator::default().validate(&doc);
    assert_eq!(report.error_count(), 4, "{:?}", report.findings);
    assert_eq!(
        report.for_section("execution_evidence.prefetch_files").count(),
        2
    );
}

#[test]
fn test_timestamp_forms_accepted() {
    let mut doc = clean();
    doc["scan_metadata"]["scan_start_utc"] = json!("2024-03-01T10:00:00.123456+00:00");
    doc["artifacts"]["running_processes"][1]["start_time"] = json!("2024-03-01T08:00:05");
    doc["collection_log"][0]["timestamp"] = json!("2024-03-01 10:00:00");
    doc["artifacts"]["event_logs"]["system"][0]["timestamp"] = json!("2024-03-01");
    assert!(SnapshotValidator::default().validate(&doc).findings.is_empty());
}

#[test]
fn test_validation_is_idempotent() {
    let doc = load_fixture("compromised_scan.json");
    let validator = SnapshotValidator::default();
    let first = validator.validate(&doc);
    let second = validator.validate(&doc);
    assert_eq!(first.findings, second.findings);
}

#[test]
fn test_unreadable_text() {
    let report = SnapshotValidator::default().validate_str("scan_metadata: yes");
    assert!(report.is_fatal());
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].code, codes::UNREADABLE_DOCUMENT);
}
