use std::collections::HashSet;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;
use crate::config::ValidatorConfig;
use crate::snapshot::{
    is_internal_ip, parse_endpoint_ip, ConnectionState, EventLevel, EventLogs, LogLevel,
    PersistenceType, Protocol,
};
use super::codes;
use super::finding::{Finding, ValidationReport};
use super::probe::{records, type_name, Record};

const METADATA_FIELDS: &[&str] = &[
    "scan_id",
    "scan_start_utc",
    "scan_duration_ms",
    "hostname",
    "os_version",
    "cli_version",
];
const PROCESS_FIELDS: &[&str] = &[
    "pid",
    "parent_pid",
    "name",
    "command_line",
    "executable_path",
    "start_time",
];
const CONNECTION_FIELDS: &[&str] = &[
    "protocol",
    "local_address",
    "remote_address",
    "state",
    "owning_pid",
];
const PERSISTENCE_FIELDS: &[&str] = &["type", "name", "command", "source"];
const EVENT_FIELDS: &[&str] = &["event_id", "level", "timestamp", "source", "message"];
const PREFETCH_FIELDS: &[&str] = &[
    "filename",
    "executable_name",
    "run_count",
    "last_run_time",
    "file_paths",
];
const SHIMCACHE_FIELDS: &[&str] = &["path", "last_modified", "file_size"];
const LOG_FIELDS: &[&str] = &["timestamp", "level", "message"];
const USER_FIELDS: &[&str] = &["username", "domain", "logon_time"];

const DOCUMENT: &str = "document";
const ARTIFACTS: &str = "artifacts";

/// Structural and semantic checks over a raw snapshot document.
///
/// Every rule runs regardless of earlier failures so one pass reports every
/// problem in the file.
pub struct SnapshotValidator {
    config: ValidatorConfig,
    uuid_pattern: Regex,
    hash_pattern: Regex,
}

impl Default for SnapshotValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl SnapshotValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            uuid_pattern: Regex::new(
                r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
            )
            .unwrap(),
            hash_pattern: Regex::new(r"^[a-fA-F0-9]{64}$").unwrap(),
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Parse and validate. A document that is not JSON yields a single
    /// fatal finding.
    pub fn validate_str(&self, text: &str) -> ValidationReport {
        match serde_json::from_str::<Value>(text) {
            Ok(document) => self.validate(&document),
            Err(e) => self.report(vec![Finding::error(
                codes::UNREADABLE_DOCUMENT,
                DOCUMENT,
                format!("document is not valid JSON: {}", e),
            )]),
        }
    }

    /// Like `validate_str`, but input that is not UTF-8 is reported as a
    /// fatal finding instead of failing the read.
    pub fn validate_bytes(&self, bytes: &[u8]) -> ValidationReport {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.validate_str(text),
            Err(e) => self.report(vec![Finding::error(
                codes::UNREADABLE_DOCUMENT,
                DOCUMENT,
                format!("document is not valid UTF-8: {}", e),
            )]),
        }
    }

    pub fn validate(&self, document: &Value) -> ValidationReport {
        let Some(root) = document.as_object() else {
            return self.report(vec![Finding::error(
                codes::UNREADABLE_DOCUMENT,
                DOCUMENT,
                format!("document root must be an object, found {}", type_name(document)),
            )]);
        };

        let mut findings = Vec::new();

        if let Some(metadata) = object_section(root, "scan_metadata", &mut findings) {
            self.check_scan_metadata(metadata, &mut findings);
        }

        if let Some(artifacts) = object_section(root, ARTIFACTS, &mut findings) {
            self.check_artifacts(artifacts, &mut findings);
        }

        if let Some(log) = list_section(root, "collection_log", "collection_log", &mut findings) {
            self.check_collection_log(log, &mut findings);
        }

        if let Some(artifacts) = root.get(ARTIFACTS).and_then(Value::as_object) {
            self.check_integrity(artifacts, &mut findings);
        }

        let report = self.report(findings);
        debug!(
            errors = report.error_count(),
            warnings = report.warning_count(),
            "validated snapshot document"
        );
        report
    }

    fn report(&self, findings: Vec<Finding>) -> ValidationReport {
        ValidationReport::new(findings, self.config.warnings_as_errors)
    }

    fn check_scan_metadata(&self, metadata: &Map<String, Value>, out: &mut Vec<Finding>) {
        let record = Record::new("scan_metadata", None, metadata);
        record.require(METADATA_FIELDS, out);

        if let Some(scan_id) = record.string("scan_id", false, out) {
            if !self.uuid_pattern.is_match(scan_id) {
                out.push(record.error(
                    codes::INVALID_UUID,
                    format!("invalid UUID format for scan_id: {}", scan_id),
                ));
            }
        }
        record.timestamp("scan_start_utc", out);
        record.uint("scan_duration_ms", u64::MAX, out);
        for name in ["hostname", "os_version", "cli_version"] {
            record.string(name, false, out);
        }
    }

    fn check_artifacts(&self, artifacts: &Map<String, Value>, out: &mut Vec<Finding>) {
        if let Some(info) = object_section(artifacts, "system_info", out) {
            self.check_system_info(info, out);
        }
        if let Some(items) = list_section(artifacts, "running_processes", "running_processes", out) {
            self.check_processes(items, out);
        }
        if let Some(items) = list_section(artifacts, "network_connections", "network_connections", out) {
            self.check_connections(items, out);
        }
        if let Some(items) =
            list_section(artifacts, "persistence_mechanisms", "persistence_mechanisms", out)
        {
            self.check_persistence(items, out);
        }
        if let Some(logs) = object_section(artifacts, "event_logs", out) {
            self.check_event_logs(logs, out);
        }

        match artifacts.get("execution_evidence") {
            None if self.config.require_execution_evidence => out.push(Finding::error(
                codes::MISSING_SECTION,
                "execution_evidence",
                "missing required section: execution_evidence",
            )),
            None => out.push(Finding::warning(
                codes::OPTIONAL_SECTION_MISSING,
                "execution_evidence",
                "optional section not collected: execution_evidence",
            )),
            Some(Value::Object(evidence)) => self.check_execution_evidence(evidence, out),
            Some(other) => out.push(wrong_type("execution_evidence", "an object", other)),
        }
    }

    fn check_system_info(&self, info: &Map<String, Value>, out: &mut Vec<Finding>) {
        let record = Record::new("system_info", None, info);
        record.uint("uptime_secs", u64::MAX, out);

        match info.get("logged_on_users") {
            None => {}
            Some(Value::Array(users)) => {
                for user in records("system_info.logged_on_users", users, out) {
                    user.require(USER_FIELDS, out);
                    for name in USER_FIELDS {
                        user.string(name, false, out);
                    }
                }
            }
            Some(other) => out.push(wrong_type("system_info.logged_on_users", "a list", other)),
        }
    }

    fn check_processes(&self, items: &[Value], out: &mut Vec<Finding>) {
        for record in records("running_processes", items, out) {
            record.require(PROCESS_FIELDS, out);
            record.pid("pid", self.config.allow_zero_pid, out);
            record.pid("parent_pid", true, out);
            record.string("name", false, out);
            record.string("command_line", false, out);
            let path = record.string("executable_path", false, out);
            record.timestamp("start_time", out);
            record.uint("memory_usage", u64::MAX, out);
            record.string("user", true, out);

            match record.string("sha256_hash", true, out) {
                Some(hash) if !hash.is_empty() => {
                    if !self.hash_pattern.is_match(hash) {
                        out.push(record.error(
                            codes::INVALID_VALUE,
                            format!("invalid SHA-256 hash format: {}", hash),
                        ));
                    }
                }
                _ => {
                    if !record.has_value("sha256_hash")
                        || record.get("sha256_hash").and_then(Value::as_str) == Some("")
                    {
                        out.push(record.warning(
                            codes::UNSIGNED_PROCESS,
                            format!("{} has no SHA-256 hash (unsigned)", display_name(&record)),
                        ));
                    }
                }
            }

            if self.config.heuristic_hints {
                if let Some(path) = path {
                    let lowered = path.to_lowercase();
                    if self.config.suspicious_path_markers.iter().any(|m| lowered.contains(m.as_str())) {
                        out.push(record.warning(
                            codes::HEURISTIC_HINT,
                            format!("{} in suspicious location: {}", display_name(&record), path),
                        ));
                    }
                }
            }
        }
        debug!(count = items.len(), "checked running_processes");
    }

    fn check_connections(&self, items: &[Value], out: &mut Vec<Finding>) {
        for record in records("network_connections", items, out) {
            record.require(CONNECTION_FIELDS, out);
            record.one_of("protocol", |p| Protocol::from(p.to_string()).is_known(), out);
            record.one_of("state", |s| ConnectionState::from(s.to_string()).is_known(), out);

            for name in ["local_address", "remote_address"] {
                if let Some(address) = record.string(name, false, out) {
                    if !address.contains(':') {
                        out.push(record.error(
                            codes::INVALID_ADDRESS,
                            format!("invalid {} format: {}", name, address),
                        ));
                    }
                }
            }
            record.pid("owning_pid", true, out);

            if self.config.heuristic_hints {
                let remote = record.get("remote_address").and_then(Value::as_str);
                if let Some(remote) = remote {
                    if parse_endpoint_ip(remote).is_some_and(|ip| !is_internal_ip(&ip)) {
                        out.push(record.warning(
                            codes::HEURISTIC_HINT,
                            format!("connection to external address: {}", remote),
                        ));
                    }
                }
            }
        }
        debug!(count = items.len(), "checked network_connections");
    }

    fn check_persistence(&self, items: &[Value], out: &mut Vec<Finding>) {
        for record in records("persistence_mechanisms", items, out) {
            record.require(PERSISTENCE_FIELDS, out);
            if let Some(kind) = record.string("type", false, out) {
                if !PersistenceType::from(kind).is_known() {
                    out.push(record.warning(
                        codes::UNKNOWN_PERSISTENCE_TYPE,
                        format!(
                            "unknown persistence type: {} (known: {})",
                            kind,
                            PersistenceType::KNOWN.join(", ")
                        ),
                    ));
                }
            }
            record.string("name", false, out);
            record.string("source", false, out);
            let command = record.string("command", false, out);

            if self.config.heuristic_hints {
                if let Some(command) = command {
                    let lowered = command.to_lowercase();
                    if self.config.suspicious_command_markers.iter().any(|m| lowered.contains(m.as_str())) {
                        out.push(record.warning(
                            codes::HEURISTIC_HINT,
                            format!("suspicious command: {}", command),
                        ));
                    }
                }
            }
        }
        debug!(count = items.len(), "checked persistence_mechanisms");
    }

    fn check_event_logs(&self, logs: &Map<String, Value>, out: &mut Vec<Finding>) {
        for channel in EventLogs::CHANNELS {
            let section = format!("event_logs.{}", channel);
            let required = *channel != "application" || self.config.require_application_log;

            let items = match logs.get(*channel) {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    out.push(wrong_type(&section, "a list", other));
                    continue;
                }
                None if required => {
                    out.push(Finding::error(
                        codes::MISSING_SECTION,
                        section.as_str(),
                        format!("missing event log channel: {}", channel),
                    ));
                    continue;
                }
                None => continue,
            };

            for record in records(&section, items, out) {
                record.require(EVENT_FIELDS, out);
                if let Some(0) = record.uint("event_id", u64::from(u32::MAX), out) {
                    out.push(record.error(codes::INVALID_VALUE, "invalid event_id: 0"));
                }
                record.one_of("level", |l| EventLevel::NAMES.contains(&l), out);
                record.timestamp("timestamp", out);
                record.string("source", false, out);
                record.string("message", false, out);
            }
            debug!(channel = *channel, count = items.len(), "checked event log channel");
        }
    }

    fn check_execution_evidence(&self, evidence: &Map<String, Value>, out: &mut Vec<Finding>) {
        const PREFETCH: &str = "execution_evidence.prefetch_files";
        const SHIMCACHE: &str = "execution_evidence.shimcache_entries";

        match evidence.get("prefetch_files") {
            None => {}
            Some(Value::Array(items)) => {
                for record in records(PREFETCH, items, out) {
                    record.require(PREFETCH_FIELDS, out);
                    if let Some(filename) = record.string("filename", false, out) {
                        if !filename.ends_with(self.config.prefetch_extension.as_str()) {
                            out.push(record.error(
                                codes::INVALID_VALUE,
                                format!("invalid prefetch filename format: {}", filename),
                            ));
                        }
                    }
                    record.string("executable_name", false, out);
                    record.uint("run_count", u64::MAX, out);
                    record.timestamp("last_run_time", out);
                    record.string_list("file_paths", out);
                }
            }
            Some(other) => out.push(wrong_type(PREFETCH, "a list", other)),
        }

        match evidence.get("shimcache_entries") {
            None => {}
            Some(Value::Array(items)) => {
                for record in records(SHIMCACHE, items, out) {
                    record.require(SHIMCACHE_FIELDS, out);
                    record.string("path", false, out);
                    record.uint("file_size", u64::MAX, out);
                    record.timestamp("last_modified", out);
                    record.boolean("executed", out);
                }
            }
            Some(other) => out.push(wrong_type(SHIMCACHE, "a list", other)),
        }
    }

    fn check_collection_log(&self, items: &[Value], out: &mut Vec<Finding>) {
        for record in records("collection_log", items, out) {
            record.require(LOG_FIELDS, out);
            record.one_of("level", |l| LogLevel::NAMES.contains(&l), out);
            record.timestamp("timestamp", out);
            record.string("message", false, out);
            record.string("module", true, out);
        }
        debug!(count = items.len(), "checked collection_log");
    }

    /// Cross-section consistency and volume sanity checks.
    fn check_integrity(&self, artifacts: &Map<String, Value>, out: &mut Vec<Finding>) {
        let processes = artifacts.get("running_processes").and_then(Value::as_array);
        let connections = artifacts.get("network_connections").and_then(Value::as_array);

        if let (Some(processes), Some(connections)) = (processes, connections) {
            let pids: HashSet<u64> = processes
                .iter()
                .filter_map(|p| p.get("pid").and_then(Value::as_u64))
                .collect();

            for (i, conn) in connections.iter().enumerate() {
                let Some(owner) = conn.get("owning_pid").and_then(Value::as_u64) else {
                    continue;
                };
                if owner != 0 && !pids.contains(&owner) {
                    out.push(
                        Finding::warning(
                            codes::DANGLING_OWNING_PID,
                            "network_connections",
                            format!("references non-existent PID: {}", owner),
                        )
                        .at(i),
                    );
                }
            }
        }

        if let Some(processes) = processes {
            if processes.is_empty() {
                out.push(Finding::warning(
                    codes::NO_PROCESSES,
                    "running_processes",
                    "no processes found, unusual for a live Windows host",
                ));
            } else if processes.len() > self.config.max_processes {
                out.push(Finding::warning(
                    codes::HIGH_PROCESS_COUNT,
                    "running_processes",
                    format!("very high process count ({})", processes.len()),
                ));
            }
        }

        if let Some(connections) = connections {
            if connections.len() > self.config.max_connections {
                out.push(Finding::warning(
                    codes::HIGH_CONNECTION_COUNT,
                    "network_connections",
                    format!("very high connection count ({})", connections.len()),
                ));
            }
        }
    }
}

fn object_section<'a>(
    parent: &'a Map<String, Value>,
    name: &str,
    out: &mut Vec<Finding>,
) -> Option<&'a Map<String, Value>> {
    match parent.get(name) {
        Some(Value::Object(section)) => Some(section),
        Some(other) => {
            out.push(wrong_type(name, "an object", other));
            None
        }
        None => {
            out.push(missing_section(name));
            None
        }
    }
}

fn list_section<'a>(
    parent: &'a Map<String, Value>,
    name: &str,
    section: &str,
    out: &mut Vec<Finding>,
) -> Option<&'a [Value]> {
    match parent.get(name) {
        Some(Value::Array(items)) => Some(items.as_slice()),
        Some(other) => {
            out.push(wrong_type(section, "a list", other));
            None
        }
        None => {
            out.push(missing_section(section));
            None
        }
    }
}

fn missing_section(name: &str) -> Finding {
    Finding::error(
        codes::MISSING_SECTION,
        name,
        format!("missing required section: {}", name),
    )
}

fn wrong_type(section: &str, expected: &str, found: &Value) -> Finding {
    Finding::error(
        codes::WRONG_SECTION_TYPE,
        section,
        format!("{} must be {}, found {}", section, expected, type_name(found)),
    )
}

fn display_name(record: &Record<'_>) -> String {
    let name = record.get("name").and_then(Value::as_str).unwrap_or("unknown");
    match record.index {
        Some(i) => format!("process {} ({})", i, name),
        None => format!("process ({})", name),
    }
}
