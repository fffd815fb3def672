mod events;
mod execution;
mod loader;
mod network;
mod persistence;
mod process;
pub mod timestamp;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::error::{Result, TriageError};

pub use events::{EventLevel, EventLogEntry, EventLogs};
pub use execution::{ExecutionEvidence, PrefetchFile, ShimcacheEntry};
pub use loader::SnapshotLoader;
pub use network::{is_internal_ip, parse_endpoint_ip, ConnectionState, NetworkConnection, Protocol};
pub use persistence::{PersistenceMechanism, PersistenceType};
pub use process::Process;
pub use timestamp::{is_valid_timestamp, parse_timestamp};

/// One point-in-time forensic capture of a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub scan_metadata: ScanMetadata,
    pub artifacts: Artifacts,
    #[serde(default)]
    pub collection_log: Vec<LogEntry>,
}

impl Snapshot {
    pub const TOP_LEVEL_SECTIONS: &'static [&'static str] =
        &["scan_metadata", "artifacts", "collection_log"];

    /// Decode an already-parsed document into typed records.
    ///
    /// Run the validator first: this only reports the first decoding failure.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| TriageError::InvalidSnapshot(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| TriageError::InvalidSnapshot(e.to_string()))
    }

    pub fn hostname(&self) -> &str {
        &self.scan_metadata.hostname
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            total_processes: self.artifacts.running_processes.len(),
            total_connections: self.artifacts.network_connections.len(),
            total_persistence: self.artifacts.persistence_mechanisms.len(),
            total_events: self.artifacts.event_logs.total_entries(),
            scan_duration_ms: self.scan_metadata.scan_duration_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub scan_id: Uuid,
    #[serde(with = "timestamp")]
    pub scan_start_utc: DateTime<Utc>,
    pub scan_duration_ms: u64,
    pub hostname: String,
    pub os_version: String,
    pub cli_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    #[serde(default)]
    pub system_info: SystemInfo,
    #[serde(default)]
    pub running_processes: Vec<Process>,
    #[serde(default)]
    pub network_connections: Vec<NetworkConnection>,
    #[serde(default)]
    pub persistence_mechanisms: Vec<PersistenceMechanism>,
    #[serde(default)]
    pub event_logs: EventLogs,
    #[serde(default)]
    pub execution_evidence: ExecutionEvidence,
}

impl Artifacts {
    pub fn total_artifact_count(&self) -> usize {
        self.running_processes.len()
            + self.network_connections.len()
            + self.persistence_mechanisms.len()
            + self.event_logs.total_entries()
            + self.system_info.logged_on_users.len()
            + self.execution_evidence.prefetch_files.len()
            + self.execution_evidence.shimcache_entries.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(default)]
    pub uptime_secs: u64,
    #[serde(default)]
    pub logged_on_users: Vec<LoggedOnUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggedOnUser {
    pub username: String,
    pub domain: String,
    pub logon_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub const NAMES: &'static [&'static str] = &["ERROR", "WARN", "INFO", "DEBUG"];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entry written by the collector while it ran; chronological.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub total_processes: usize,
    pub total_connections: usize,
    pub total_persistence: usize,
    pub total_events: usize,
    pub scan_duration_ms: u64,
}
