use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefetchFile {
    pub filename: String,
    pub executable_name: String,
    pub run_count: u64,
    #[serde(with = "super::timestamp")]
    pub last_run_time: DateTime<Utc>,
    #[serde(default)]
    pub file_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShimcacheEntry {
    pub path: String,
    #[serde(with = "super::timestamp")]
    pub last_modified: DateTime<Utc>,
    pub file_size: u64,
    #[serde(default)]
    pub executed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvidence {
    #[serde(default)]
    pub prefetch_files: Vec<PrefetchFile>,
    #[serde(default)]
    pub shimcache_entries: Vec<ShimcacheEntry>,
}
