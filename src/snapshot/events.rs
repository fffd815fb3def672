use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventLevel {
    Critical,
    Error,
    Warning,
    Information,
    Verbose,
}

impl EventLevel {
    pub const NAMES: &'static [&'static str] =
        &["Critical", "Error", "Warning", "Information", "Verbose"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub event_id: u32,
    pub level: EventLevel,
    #[serde(with = "super::timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLogs {
    #[serde(default)]
    pub security: Vec<EventLogEntry>,
    #[serde(default)]
    pub system: Vec<EventLogEntry>,
    #[serde(default)]
    pub application: Vec<EventLogEntry>,
}

impl EventLogs {
    pub const CHANNELS: &'static [&'static str] = &["security", "system", "application"];

    pub fn total_entries(&self) -> usize {
        self.security.len() + self.system.len() + self.application.len()
    }

    pub fn security_with_ids<'a>(&'a self, ids: &'a [u32]) -> impl Iterator<Item = &'a EventLogEntry> {
        self.security.iter().filter(move |e| ids.contains(&e.event_id))
    }
}
