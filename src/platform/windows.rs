//! Windows platform implementation.
//!
//! Walks the program installation directories. Windows Search is not wired
//! up, so the metadata source always reports itself unavailable and the
//! catalog relies on the filesystem walk alone.

use super::Platform;
use crate::core::artifact::ArtifactRecord;
use crate::error::{ScoutError, ScoutResult};
use crate::services::metadata::{MetadataError, MetadataQuery};
use std::path::PathBuf;

/// Windows platform implementation.
pub struct WindowsPlatform;

impl WindowsPlatform {
    /// Create a new Windows platform instance.
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for WindowsPlatform {
    fn default_roots(&self) -> Vec<PathBuf> {
        ["ProgramFiles", "ProgramFiles(x86)", "LOCALAPPDATA"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|value| {
                let path = PathBuf::from(value);
                if path.ends_with("Local") {
                    path.join("Programs")
                } else {
                    path
                }
            })
            .collect()
    }

    fn start_metadata_query(&self) -> Result<Box<dyn MetadataQuery>, MetadataError> {
        Err(MetadataError::Unavailable(
            "Windows Search is not supported".to_string(),
        ))
    }

    fn launch_artifact(&self, record: &ArtifactRecord) -> ScoutResult<()> {
        std::process::Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(&record.path)
            .spawn()
            .map_err(|e| ScoutError::Launch(format!("Failed to launch {}: {}", record.name, e)))?;
        Ok(())
    }
}
