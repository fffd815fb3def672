pub mod error;
pub mod config;
pub mod snapshot;
pub mod validator;
pub mod analyzer;
pub mod compare;
pub mod report;

pub use error::{TriageError, Result};
pub use config::{AnalyzerConfig, CompareConfig, EventRules, TriageConfig, ValidatorConfig};
pub use snapshot::{
    Artifacts, ConnectionState, EventLevel, EventLogEntry, EventLogs, ExecutionEvidence, LogEntry,
    LogLevel, LoggedOnUser, NetworkConnection, PersistenceMechanism, PersistenceType, PrefetchFile,
    Process, Protocol, ScanMetadata, ShimcacheEntry, Snapshot, SnapshotLoader, SnapshotStats,
    SystemInfo,
};
pub use validator::{Finding, FindingSeverity, SnapshotValidator, ValidationReport};
pub use analyzer::{
    AnalysisReport, Evidence, Indicator, IndicatorAnalyzer, IndicatorCategory, ProcessReasons,
    RiskLevel,
};
pub use compare::{ChangeSet, ChangeSummary, SnapshotComparator, SystemChanges, UptimeChange};
