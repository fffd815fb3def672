use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Snapshot file not found: {0}")]
    SnapshotFileNotFound(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid file pattern: {0}")]
    Pattern(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TriageError>;
