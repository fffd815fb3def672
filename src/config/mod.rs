use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::{Result, TriageError};

/// Every tunable threshold and allow-list, grouped per component.
///
/// Missing keys in a YAML file fall back to the defaults below, so a config
/// file only needs to name what it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub validator: ValidatorConfig,
    pub analyzer: AnalyzerConfig,
    pub compare: CompareConfig,
}

impl TriageConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| TriageError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_yaml(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.analyzer.event_rules.failed_logon_ids.is_empty() {
            return Err(TriageError::Config(
                "analyzer.event_rules.failed_logon_ids must not be empty".to_string(),
            ));
        }
        if self.validator.prefetch_extension.is_empty() {
            return Err(TriageError::Config(
                "validator.prefetch_extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Treat warnings as validity-affecting.
    pub warnings_as_errors: bool,
    /// Accept `pid == 0` in `running_processes`.
    pub allow_zero_pid: bool,
    /// Require the `application` event-log channel.
    pub require_application_log: bool,
    /// Report a missing `execution_evidence` section as an error rather than a warning.
    pub require_execution_evidence: bool,
    pub max_processes: usize,
    pub max_connections: usize,
    pub prefetch_extension: String,
    /// Emit location/command/address hints as warnings.
    pub heuristic_hints: bool,
    pub suspicious_path_markers: Vec<String>,
    pub suspicious_command_markers: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            warnings_as_errors: false,
            allow_zero_pid: false,
            require_application_log: true,
            require_execution_evidence: false,
            max_processes: 1000,
            max_connections: 500,
            prefetch_extension: ".pf".to_string(),
            heuristic_hints: false,
            suspicious_path_markers: strings(&["temp", "appdata\\local\\temp", "downloads"]),
            suspicious_command_markers: strings(&["powershell", "cmd", "temp", "appdata"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub trusted_directories: Vec<String>,
    /// Processes under `<profile root>...<appdata marker>` are not flagged for location.
    pub user_profile_root: String,
    pub appdata_marker: String,
    pub system_pseudo_processes: Vec<String>,
    pub unusual_name_chars: Vec<char>,
    pub memory_threshold_mib: u64,
    pub known_vendors: Vec<String>,
    pub prefetch_run_count_threshold: u64,
    pub shimcache_path_markers: Vec<String>,
    pub event_rules: EventRules,
    pub collection_warning_threshold: usize,
    pub warning_sample_size: usize,
    pub long_scan_ms: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            trusted_directories: strings(&[
                "C:\\Windows\\System32\\",
                "C:\\Windows\\SysWOW64\\",
                "C:\\Program Files\\",
                "C:\\Program Files (x86)\\",
            ]),
            user_profile_root: "C:\\Users\\".to_string(),
            appdata_marker: "\\AppData\\".to_string(),
            system_pseudo_processes: strings(&["System", "[System Process]"]),
            unusual_name_chars: vec!['@', '#', '$', '%', '^', '&', '*'],
            memory_threshold_mib: 1000,
            known_vendors: strings(&["Microsoft", "Windows", "Intel", "NVIDIA", "AMD", "Realtek"]),
            prefetch_run_count_threshold: 1000,
            shimcache_path_markers: strings(&["temp", "downloads"]),
            event_rules: EventRules::default(),
            collection_warning_threshold: 5,
            warning_sample_size: 5,
            long_scan_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRules {
    pub failed_logon_ids: Vec<u32>,
    /// Failed logons are reported only when the count exceeds this.
    pub failed_logon_threshold: usize,
    pub privilege_ids: Vec<u32>,
}

impl Default for EventRules {
    fn default() -> Self {
        Self {
            failed_logon_ids: vec![4625],
            failed_logon_threshold: 10,
            privilege_ids: vec![4672, 4673, 4674],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub uptime_discontinuity_secs: u64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            uptime_discontinuity_secs: 86_400,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
