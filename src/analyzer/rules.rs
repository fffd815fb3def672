use tracing::debug;
use crate::config::AnalyzerConfig;
use crate::snapshot::{
    ExecutionEvidence, EventLogs, LogEntry, LogLevel, NetworkConnection, PersistenceMechanism,
    Process, Snapshot,
};
use super::indicator::{AnalysisReport, Evidence, Indicator, IndicatorCategory};

pub const REASON_UNUSUAL_LOCATION: &str = "Unusual location";
pub const REASON_NO_PATH: &str = "No executable path";
pub const REASON_UNUSUAL_NAME: &str = "Unusual characters in name";

/// Heuristic triage over a decoded snapshot.
pub struct IndicatorAnalyzer {
    config: AnalyzerConfig,
    trusted_upper: Vec<String>,
    profile_root_upper: String,
    appdata_upper: String,
}

impl Default for IndicatorAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl IndicatorAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let trusted_upper = config
            .trusted_directories
            .iter()
            .map(|d| d.to_uppercase())
            .collect();
        let profile_root_upper = config.user_profile_root.to_uppercase();
        let appdata_upper = config.appdata_marker.to_uppercase();
        Self {
            config,
            trusted_upper,
            profile_root_upper,
            appdata_upper,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(&self, snapshot: &Snapshot) -> AnalysisReport {
        let mut indicators = Vec::new();
        let artifacts = &snapshot.artifacts;

        self.check_scan_duration(snapshot.scan_metadata.scan_duration_ms, &mut indicators);
        self.check_processes(&artifacts.running_processes, &mut indicators);
        self.check_connections(&artifacts.network_connections, &mut indicators);
        self.check_persistence(&artifacts.persistence_mechanisms, &mut indicators);
        self.check_events(&artifacts.event_logs, &mut indicators);
        self.check_execution(&artifacts.execution_evidence, &mut indicators);
        self.check_collection_log(&snapshot.collection_log, &mut indicators);

        let report = AnalysisReport::new(
            snapshot.scan_metadata.scan_id,
            snapshot.scan_metadata.hostname.clone(),
            indicators,
            snapshot.stats(),
        );
        debug!(
            hostname = %report.hostname,
            indicators = report.total(),
            risk = %report.risk_level,
            "analysis complete"
        );
        report
    }

    fn check_scan_duration(&self, duration_ms: u64, out: &mut Vec<Indicator>) {
        if duration_ms > self.config.long_scan_ms {
            out.push(Indicator::new(
                IndicatorCategory::CollectionIssue,
                format!("Unusually long scan duration: {}ms", duration_ms),
                Evidence::ScanDuration { duration_ms },
            ));
        }
    }

    fn check_processes(&self, processes: &[Process], out: &mut Vec<Indicator>) {
        let before = out.len();
        for process in processes {
            for reason in self.process_reasons(process) {
                out.push(Indicator::new(
                    IndicatorCategory::SuspiciousProcess,
                    reason,
                    Evidence::Process {
                        pid: process.pid,
                        name: process.name.clone(),
                        path: process.executable_path.clone(),
                    },
                ));
            }
        }
        debug!(count = out.len() - before, "suspicious process indicators");
    }

    /// Reasons a single process looks out of place, in rule order.
    pub fn process_reasons(&self, process: &Process) -> Vec<String> {
        let mut reasons = Vec::new();
        let path = process.executable_path.to_uppercase();

        if process.has_executable_path() && !self.is_trusted_location(&path) {
            reasons.push(REASON_UNUSUAL_LOCATION.to_string());
        }

        if !process.has_executable_path()
            && !self
                .config
                .system_pseudo_processes
                .iter()
                .any(|p| *p == process.name)
        {
            reasons.push(REASON_NO_PATH.to_string());
        }

        if process.name.chars().any(|c| self.config.unusual_name_chars.contains(&c)) {
            reasons.push(REASON_UNUSUAL_NAME.to_string());
        }

        let mib = process.memory_mib();
        if mib > self.config.memory_threshold_mib as f64 {
            reasons.push(format!("High memory usage: {:.1}MB", mib));
        }

        reasons
    }

    fn is_trusted_location(&self, upper_path: &str) -> bool {
        if self.trusted_upper.iter().any(|d| upper_path.starts_with(d.as_str())) {
            return true;
        }
        upper_path.starts_with(&self.profile_root_upper) && upper_path.contains(&self.appdata_upper)
    }

    fn check_connections(&self, connections: &[NetworkConnection], out: &mut Vec<Indicator>) {
        let before = out.len();
        for conn in connections.iter().filter(|c| c.is_external()) {
            out.push(Indicator::new(
                IndicatorCategory::ExternalConnection,
                "Connection to external address",
                Evidence::Connection {
                    protocol: conn.protocol.clone(),
                    local: conn.local_address.clone(),
                    remote: conn.remote_address.clone(),
                    state: conn.state.clone(),
                    pid: conn.owning_pid,
                },
            ));
        }
        debug!(count = out.len() - before, "external connection indicators");
    }

    fn check_persistence(&self, mechanisms: &[PersistenceMechanism], out: &mut Vec<Indicator>) {
        let vendors: Vec<String> = self
            .config
            .known_vendors
            .iter()
            .map(|v| v.to_lowercase())
            .collect();

        let before = out.len();
        for mech in mechanisms {
            let source = mech.source.to_lowercase();
            let command = mech.command.to_lowercase();
            let vendor_backed = vendors
                .iter()
                .any(|v| source.contains(v.as_str()) || command.contains(v.as_str()));
            if vendor_backed {
                continue;
            }
            out.push(Indicator::new(
                IndicatorCategory::UnusualPersistence,
                "Unknown vendor",
                Evidence::Persistence {
                    mechanism_type: mech.mechanism_type.clone(),
                    name: mech.name.clone(),
                    command: mech.command.clone(),
                    source: mech.source.clone(),
                },
            ));
        }
        debug!(count = out.len() - before, "unusual persistence indicators");
    }

    fn check_events(&self, logs: &EventLogs, out: &mut Vec<Indicator>) {
        let rules = &self.config.event_rules;

        let failed = logs.security_with_ids(&rules.failed_logon_ids).count();
        if failed > rules.failed_logon_threshold {
            out.push(Indicator::new(
                IndicatorCategory::SecurityEvent,
                format!("Multiple failed logons: {} failed logon attempts detected", failed),
                Evidence::EventCount {
                    event_ids: rules.failed_logon_ids.clone(),
                    count: failed,
                },
            ));
        }

        let privileged = logs.security_with_ids(&rules.privilege_ids).count();
        if privileged > 0 {
            out.push(Indicator::new(
                IndicatorCategory::SecurityEvent,
                format!("Privilege usage: {} privilege usage events", privileged),
                Evidence::EventCount {
                    event_ids: rules.privilege_ids.clone(),
                    count: privileged,
                },
            ));
        }
        debug!(failed_logons = failed, privilege_events = privileged, "security events counted");
    }

    fn check_execution(&self, evidence: &ExecutionEvidence, out: &mut Vec<Indicator>) {
        for pf in &evidence.prefetch_files {
            if pf.run_count > self.config.prefetch_run_count_threshold {
                out.push(Indicator::new(
                    IndicatorCategory::ExecutionAnomaly,
                    "High execution count",
                    Evidence::Prefetch {
                        executable: pf.executable_name.clone(),
                        run_count: pf.run_count,
                        last_run: pf.last_run_time,
                    },
                ));
            }
        }

        let markers: Vec<String> = self
            .config
            .shimcache_path_markers
            .iter()
            .map(|m| m.to_lowercase())
            .collect();
        for entry in evidence.shimcache_entries.iter().filter(|e| e.executed) {
            let path = entry.path.to_lowercase();
            if markers.iter().any(|m| path.contains(m.as_str())) {
                out.push(Indicator::new(
                    IndicatorCategory::ExecutionAnomaly,
                    "Execution from temp/downloads",
                    Evidence::Shimcache {
                        path: entry.path.clone(),
                        last_modified: entry.last_modified,
                    },
                ));
            }
        }
    }

    fn check_collection_log(&self, log: &[LogEntry], out: &mut Vec<Indicator>) {
        for entry in log.iter().filter(|e| e.level == LogLevel::Error) {
            out.push(Indicator::new(
                IndicatorCategory::CollectionIssue,
                format!("Collection error: {}", entry.message),
                Evidence::CollectionError {
                    message: entry.message.clone(),
                    module: entry.module.clone().unwrap_or_else(|| "unknown".to_string()),
                    timestamp: entry.timestamp,
                },
            ));
        }

        let warnings: Vec<&LogEntry> = log.iter().filter(|e| e.level == LogLevel::Warn).collect();
        if warnings.len() > self.config.collection_warning_threshold {
            out.push(Indicator::new(
                IndicatorCategory::CollectionIssue,
                format!("{} warnings during collection", warnings.len()),
                Evidence::CollectionWarnings {
                    count: warnings.len(),
                    sample: warnings
                        .iter()
                        .take(self.config.warning_sample_size)
                        .map(|w| w.message.clone())
                        .collect(),
                },
            ));
        }
    }
}
