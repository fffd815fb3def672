use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const BYTES_PER_MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub pid: u32,
    pub parent_pid: u32,
    pub name: String,
    pub command_line: String,
    /// Empty for kernel and other pseudo-processes.
    pub executable_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_hash: Option<String>,
    /// Resident memory in bytes.
    #[serde(default)]
    pub memory_usage: u64,
    #[serde(with = "super::timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Process {
    pub fn has_executable_path(&self) -> bool {
        !self.executable_path.is_empty()
    }

    pub fn memory_mib(&self) -> f64 {
        self.memory_usage as f64 / BYTES_PER_MIB as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Process {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_deserialize_minimal_process() {
        let p = parse(r#"{
            "pid": 4,
            "parent_pid": 0,
            "name": "System",
            "command_line": "",
            "executable_path": "",
            "start_time": "2024-01-01T00:00:00Z"
        }"#);
        assert_eq!(p.pid, 4);
        assert!(!p.has_executable_path());
        assert!(p.sha256_hash.is_none());
        assert_eq!(p.memory_usage, 0);
    }

    #[test]
    fn test_memory_mib() {
        let p = parse(r#"{
            "pid": 100,
            "parent_pid": 4,
            "name": "big.exe",
            "command_line": "big.exe",
            "executable_path": "C:\\Program Files\\Big\\big.exe",
            "memory_usage": 2097152,
            "start_time": "2024-01-01T00:00:00Z"
        }"#);
        assert!((p.memory_mib() - 2.0).abs() < f64::EPSILON);
    }
}
