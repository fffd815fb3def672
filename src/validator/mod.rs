mod checker;
mod finding;
mod probe;

pub use checker::SnapshotValidator;
pub use finding::{Finding, FindingSeverity, ValidationReport};

/// Stable finding codes. Errors are `E0xx`, warnings `W0xx`.
pub mod codes {
    pub const UNREADABLE_DOCUMENT: &str = "E000";
    pub const MISSING_SECTION: &str = "E001";
    pub const WRONG_SECTION_TYPE: &str = "E002";
    pub const MISSING_FIELD: &str = "E003";
    pub const INVALID_VALUE: &str = "E004";
    pub const INVALID_UUID: &str = "E005";
    pub const INVALID_TIMESTAMP: &str = "E006";
    pub const INVALID_PID: &str = "E007";
    pub const INVALID_ENUM: &str = "E008";
    pub const INVALID_ADDRESS: &str = "E009";
    pub const NOT_AN_OBJECT: &str = "E010";

    pub const OPTIONAL_SECTION_MISSING: &str = "W001";
    pub const UNSIGNED_PROCESS: &str = "W002";
    pub const UNKNOWN_PERSISTENCE_TYPE: &str = "W003";
    pub const DANGLING_OWNING_PID: &str = "W004";
    pub const NO_PROCESSES: &str = "W005";
    pub const HIGH_PROCESS_COUNT: &str = "W006";
    pub const HIGH_CONNECTION_COUNT: &str = "W007";
    pub const HEURISTIC_HINT: &str = "W008";
}
