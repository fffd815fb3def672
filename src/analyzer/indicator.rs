use std::collections::BTreeMap;
use std::fmt;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::snapshot::{ConnectionState, PersistenceType, Protocol, SnapshotStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorCategory {
    SuspiciousProcess,
    ExternalConnection,
    UnusualPersistence,
    ExecutionAnomaly,
    SecurityEvent,
    CollectionIssue,
}

impl IndicatorCategory {
    pub const ALL: [IndicatorCategory; 6] = [
        IndicatorCategory::SuspiciousProcess,
        IndicatorCategory::ExternalConnection,
        IndicatorCategory::UnusualPersistence,
        IndicatorCategory::ExecutionAnomaly,
        IndicatorCategory::SecurityEvent,
        IndicatorCategory::CollectionIssue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorCategory::SuspiciousProcess => "suspicious_process",
            IndicatorCategory::ExternalConnection => "external_connection",
            IndicatorCategory::UnusualPersistence => "unusual_persistence",
            IndicatorCategory::ExecutionAnomaly => "execution_anomaly",
            IndicatorCategory::SecurityEvent => "security_event",
            IndicatorCategory::CollectionIssue => "collection_issue",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            IndicatorCategory::SuspiciousProcess => "Suspicious Processes",
            IndicatorCategory::ExternalConnection => "External Network Connections",
            IndicatorCategory::UnusualPersistence => "Unusual Persistence Mechanisms",
            IndicatorCategory::ExecutionAnomaly => "Execution Anomalies",
            IndicatorCategory::SecurityEvent => "Security Events",
            IndicatorCategory::CollectionIssue => "Collection Issues",
        }
    }

    /// Follow-up action suggested when the category has any indicator.
    pub fn recommendation(&self) -> &'static str {
        match self {
            IndicatorCategory::SuspiciousProcess => "Investigate suspicious processes and their origins",
            IndicatorCategory::ExternalConnection => "Review external network connections for legitimacy",
            IndicatorCategory::UnusualPersistence => "Examine unusual persistence mechanisms",
            IndicatorCategory::ExecutionAnomaly => "Analyze execution evidence for malicious activity",
            IndicatorCategory::SecurityEvent => "Review security event logs for account misuse",
            IndicatorCategory::CollectionIssue => "Re-run collection after resolving reported collection problems",
        }
    }
}

impl fmt::Display for IndicatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The artifact data that triggered an indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    Process {
        pid: u32,
        name: String,
        path: String,
    },
    Connection {
        protocol: Protocol,
        local: String,
        remote: String,
        state: ConnectionState,
        pid: u32,
    },
    Persistence {
        mechanism_type: PersistenceType,
        name: String,
        command: String,
        source: String,
    },
    Prefetch {
        executable: String,
        run_count: u64,
        last_run: DateTime<Utc>,
    },
    Shimcache {
        path: String,
        last_modified: DateTime<Utc>,
    },
    EventCount {
        event_ids: Vec<u32>,
        count: usize,
    },
    CollectionError {
        message: String,
        module: String,
        timestamp: DateTime<Utc>,
    },
    CollectionWarnings {
        count: usize,
        sample: Vec<String>,
    },
    ScanDuration {
        duration_ms: u64,
    },
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::Process { pid, name, path } if path.is_empty() => {
                write!(f, "PID {}: {}", pid, name)
            }
            Evidence::Process { pid, name, path } => write!(f, "PID {}: {} ({})", pid, name, path),
            Evidence::Connection { protocol, local, remote, pid, .. } => {
                write!(f, "{} {} -> {} (PID {})", protocol, local, remote, pid)
            }
            Evidence::Persistence { mechanism_type, name, command, .. } => {
                write!(f, "{}: {} [{}]", mechanism_type, name, command)
            }
            Evidence::Prefetch { executable, run_count, .. } => {
                write!(f, "{} ({} runs)", executable, run_count)
            }
            Evidence::Shimcache { path, .. } => write!(f, "{}", path),
            Evidence::EventCount { event_ids, count } => {
                let ids: Vec<String> = event_ids.iter().map(|id| id.to_string()).collect();
                write!(f, "{} events ({})", count, ids.join(", "))
            }
            Evidence::CollectionError { module, message, .. } => write!(f, "{}: {}", module, message),
            Evidence::CollectionWarnings { count, .. } => write!(f, "{} warnings during collection", count),
            Evidence::ScanDuration { duration_ms } => write!(f, "{}ms", duration_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    pub category: IndicatorCategory,
    pub reason: String,
    pub evidence: Evidence,
}

impl Indicator {
    pub fn new(category: IndicatorCategory, reason: impl Into<String>, evidence: Evidence) -> Self {
        Self {
            category,
            reason: reason.into(),
            evidence,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.evidence, self.reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_count(count: usize) -> Self {
        match count {
            0..=4 => RiskLevel::Low,
            5..=14 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// All reasons raised against one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessReasons {
    pub pid: u32,
    pub name: String,
    pub path: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub scan_id: Uuid,
    pub hostname: String,
    pub indicators: Vec<Indicator>,
    pub risk_level: RiskLevel,
    pub stats: SnapshotStats,
}

impl AnalysisReport {
    pub fn new(scan_id: Uuid, hostname: String, indicators: Vec<Indicator>, stats: SnapshotStats) -> Self {
        let risk_level = RiskLevel::from_count(indicators.len());
        Self {
            scan_id,
            hostname,
            indicators,
            risk_level,
            stats,
        }
    }

    /// No indicators at all, as opposed to merely low risk.
    pub fn is_clean(&self) -> bool {
        self.indicators.is_empty()
    }

    pub fn total(&self) -> usize {
        self.indicators.len()
    }

    pub fn by_category(&self, category: IndicatorCategory) -> Vec<&Indicator> {
        self.indicators
            .iter()
            .filter(|i| i.category == category)
            .collect()
    }

    pub fn summary(&self) -> BTreeMap<IndicatorCategory, usize> {
        let mut counts = BTreeMap::new();
        for indicator in &self.indicators {
            *counts.entry(indicator.category).or_insert(0) += 1;
        }
        counts
    }

    /// Suspicious-process reasons merged per PID, in first-seen order.
    pub fn process_reasons(&self) -> Vec<ProcessReasons> {
        let mut grouped: Vec<ProcessReasons> = Vec::new();
        for indicator in &self.indicators {
            let Evidence::Process { pid, name, path } = &indicator.evidence else {
                continue;
            };
            match grouped.iter_mut().find(|p| p.pid == *pid) {
                Some(entry) => {
                    if !entry.reasons.contains(&indicator.reason) {
                        entry.reasons.push(indicator.reason.clone());
                    }
                }
                None => grouped.push(ProcessReasons {
                    pid: *pid,
                    name: name.clone(),
                    path: path.clone(),
                    reasons: vec![indicator.reason.clone()],
                }),
            }
        }
        grouped
    }

    pub fn recommendations(&self) -> Vec<&'static str> {
        if self.is_clean() {
            return vec!["System appears clean, continue regular monitoring"];
        }
        let summary = self.summary();
        IndicatorCategory::ALL
            .iter()
            .filter(|c| summary.contains_key(*c))
            .map(|c| c.recommendation())
            .collect()
    }

    pub fn assessment(&self) -> &'static str {
        if self.is_clean() {
            return "No significant security indicators detected.";
        }
        match self.risk_level {
            RiskLevel::Low => "Low risk: few security indicators detected.",
            RiskLevel::Medium => "Medium risk: several security indicators detected.",
            RiskLevel::High => "High risk: many security indicators detected.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process_indicator(pid: u32, reason: &str) -> Indicator {
        Indicator::new(
            IndicatorCategory::SuspiciousProcess,
            reason,
            Evidence::Process {
                pid,
                name: "evil.exe".to_string(),
                path: "C:\\Temp\\evil.exe".to_string(),
            },
        )
    }

    fn report(indicators: Vec<Indicator>) -> AnalysisReport {
        AnalysisReport::new(Uuid::nil(), "WS-01".to_string(), indicators, SnapshotStats::default())
    }

    #[test]
    fn test_risk_thresholds() {
        assert_eq!(RiskLevel::from_count(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_count(4), RiskLevel::Low);
        assert_eq!(RiskLevel::from_count(5), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_count(14), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_count(15), RiskLevel::High);
    }

    #[test]
    fn test_clean_differs_from_low() {
        let clean = report(vec![]);
        assert!(clean.is_clean());
        assert_eq!(clean.risk_level, RiskLevel::Low);

        let low = report(vec![process_indicator(10, "Unusual location")]);
        assert!(!low.is_clean());
        assert_eq!(low.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_process_reasons_grouped_by_pid() {
        let r = report(vec![
            process_indicator(10, "Unusual location"),
            process_indicator(11, "Unusual location"),
            process_indicator(10, "Unusual characters in name"),
        ]);
        let grouped = r.process_reasons();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].pid, 10);
        assert_eq!(grouped[0].reasons, vec!["Unusual location", "Unusual characters in name"]);
    }

    #[test]
    fn test_recommendations_follow_categories() {
        assert_eq!(
            report(vec![]).recommendations(),
            vec!["System appears clean, continue regular monitoring"]
        );
        let r = report(vec![process_indicator(10, "Unusual location")]);
        assert_eq!(r.recommendations(), vec![IndicatorCategory::SuspiciousProcess.recommendation()]);
    }

    #[test]
    fn test_evidence_serializes_with_kind_tag() {
        let value = serde_json::to_value(Evidence::EventCount { event_ids: vec![4625], count: 12 }).unwrap();
        assert_eq!(value["kind"], "event_count");
        assert_eq!(value["count"], 12);
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let value = serde_json::to_value(IndicatorCategory::UnusualPersistence).unwrap();
        assert_eq!(value, "unusual_persistence");
    }
}
