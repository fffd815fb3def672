use serde::{Deserialize, Serialize};
use std::fmt;

/// Persistence category.
///
/// The set of mechanisms grows as the collector learns new locations, so an
/// unrecognized label is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PersistenceType {
    RegistryRunKey,
    ScheduledTask,
    Service,
    StartupFolder,
    WmiEvent,
    DllHijacking,
    Other(String),
}

impl PersistenceType {
    pub const KNOWN: &'static [&'static str] = &[
        "Registry Run Key",
        "Scheduled Task",
        "Service",
        "Startup Folder",
        "WMI Event",
        "DLL Hijacking",
    ];

    pub fn as_str(&self) -> &str {
        match self {
            PersistenceType::RegistryRunKey => "Registry Run Key",
            PersistenceType::ScheduledTask => "Scheduled Task",
            PersistenceType::Service => "Service",
            PersistenceType::StartupFolder => "Startup Folder",
            PersistenceType::WmiEvent => "WMI Event",
            PersistenceType::DllHijacking => "DLL Hijacking",
            PersistenceType::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, PersistenceType::Other(_))
    }
}

impl From<String> for PersistenceType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Registry Run Key" => PersistenceType::RegistryRunKey,
            "Scheduled Task" => PersistenceType::ScheduledTask,
            "Service" => PersistenceType::Service,
            "Startup Folder" => PersistenceType::StartupFolder,
            "WMI Event" => PersistenceType::WmiEvent,
            "DLL Hijacking" => PersistenceType::DllHijacking,
            _ => PersistenceType::Other(raw),
        }
    }
}

impl From<&str> for PersistenceType {
    fn from(raw: &str) -> Self {
        PersistenceType::from(raw.to_string())
    }
}

impl From<PersistenceType> for String {
    fn from(kind: PersistenceType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for PersistenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceMechanism {
    #[serde(rename = "type")]
    pub mechanism_type: PersistenceType,
    pub name: String,
    pub command: String,
    /// Registry key, task path or file the entry was found under.
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_types_parse() {
        for name in PersistenceType::KNOWN {
            let kind = PersistenceType::from(*name);
            assert!(kind.is_known(), "{} should be known", name);
            assert_eq!(kind.as_str(), *name);
        }
    }

    #[test]
    fn test_unknown_type_preserved() {
        let kind = PersistenceType::from("Windows Service");
        assert_eq!(kind, PersistenceType::Other("Windows Service".to_string()));
        assert!(!kind.is_known());
    }

    #[test]
    fn test_deserialize_type_field() {
        let mech: PersistenceMechanism = serde_json::from_str(r#"{
            "type": "Scheduled Task",
            "name": "GoogleUpdate",
            "command": "C:\\Program Files\\Google\\Update\\GoogleUpdate.exe",
            "source": "\\GoogleUpdateTaskMachineCore"
        }"#).unwrap();
        assert_eq!(mech.mechanism_type, PersistenceType::ScheduledTask);
    }
}
