use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use glob::glob;
use tracing::debug;
use crate::error::{Result, TriageError};
use super::Snapshot;

/// Reads scan documents from disk.
///
/// Decoding stops at the untyped document when the caller still has to run
/// the validator over it; `load` goes straight to typed records.
pub struct SnapshotLoader;

impl SnapshotLoader {
    pub fn new() -> Self {
        Self
    }

    /// Find every `*.json` document below `dir`, sorted by path.
    pub fn discover(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let pattern = dir.as_ref().join("**/*.json");
        let pattern_str = pattern.to_string_lossy();

        let mut files: Vec<PathBuf> = glob(&pattern_str)
            .map_err(|e| TriageError::Pattern(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        files.sort();

        debug!(dir = %dir.as_ref().display(), count = files.len(), "discovered scan files");
        Ok(files)
    }

    /// Raw file contents, for callers that report encoding problems themselves.
    pub fn read_bytes(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();
        fs::read(path).map_err(|e| not_found_or_io(path, e))
    }

    pub fn read_text(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        fs::read_to_string(path).map_err(|e| not_found_or_io(path, e))
    }

    pub fn read_document(&self, path: impl AsRef<Path>) -> Result<serde_json::Value> {
        let text = self.read_text(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<Snapshot> {
        let path = path.as_ref();
        let text = self.read_text(path)?;
        let snapshot = Snapshot::from_json(&text)?;

        debug!(
            path = %path.display(),
            scan_id = %snapshot.scan_metadata.scan_id,
            artifacts = snapshot.artifacts.total_artifact_count(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }
}

fn not_found_or_io(path: &Path, err: io::Error) -> TriageError {
    match err.kind() {
        io::ErrorKind::NotFound => TriageError::SnapshotFileNotFound(path.display().to_string()),
        _ => TriageError::Io(err),
    }
}

impl Default for SnapshotLoader {
    fn default() -> Self {
        Self::new()
    }
}
