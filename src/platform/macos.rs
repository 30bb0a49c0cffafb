//! macOS platform implementation.
//!
//! This module implements the Platform trait for macOS using:
//! - /Applications, /System/Applications and ~/Applications as walk roots
//! - Spotlight (`mdfind`) as the metadata search facility
//! - `open` for launching bundles

use super::{child_dirs, Platform};
use crate::core::artifact::{ArtifactKind, ArtifactRecord};
use crate::error::{ScoutError, ScoutResult};
use crate::services::metadata::{MetadataError, MetadataQuery};

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

const SPOTLIGHT_APPLICATIONS: &str = "kMDItemContentType == 'com.apple.application-bundle'";

/// macOS platform implementation.
pub struct MacOSPlatform;

impl MacOSPlatform {
    /// Create a new macOS platform instance.
    pub fn new() -> Self {
        Self
    }
}

impl Default for MacOSPlatform {
    fn default() -> Self {
        Self::new()
    }
}

/// A running `mdfind` process.
///
/// Output is drained on a reader thread so a large result set can never
/// block the child on a full pipe.
struct SpotlightQuery {
    child: Child,
    output: Receiver<std::io::Result<String>>,
    reader: Option<JoinHandle<()>>,
    done: bool,
}

impl SpotlightQuery {
    fn start() -> Result<Self, MetadataError> {
        let mut child = Command::new("mdfind")
            .arg(SPOTLIGHT_APPLICATIONS)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MetadataError::Unavailable(format!("Failed to run mdfind: {}", e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| MetadataError::Failed("mdfind stdout not captured".to_string()))?;

        let (tx, output) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("spotlight-reader".to_string())
            .spawn(move || {
                let mut text = String::new();
                let outcome = stdout.read_to_string(&mut text).map(|_| text);
                let _ = tx.send(outcome);
            })
            .map_err(|e| MetadataError::Failed(format!("Failed to spawn reader: {}", e)))?;

        Ok(Self {
            child,
            output,
            reader: Some(reader),
            done: false,
        })
    }
}

impl MetadataQuery for SpotlightQuery {
    fn try_collect(&mut self) -> Result<Option<Vec<PathBuf>>, MetadataError> {
        let text = match self.output.try_recv() {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(MetadataError::Failed(format!("mdfind output: {}", e))),
            Err(TryRecvError::Empty) => return Ok(None),
            Err(TryRecvError::Disconnected) => {
                return Err(MetadataError::Failed("mdfind reader exited".to_string()))
            }
        };

        let status = self
            .child
            .wait()
            .map_err(|e| MetadataError::Failed(format!("mdfind wait: {}", e)))?;
        self.done = true;
        if !status.success() {
            return Err(MetadataError::Failed(format!("mdfind exited with {}", status)));
        }

        Ok(Some(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .collect(),
        ))
    }

    fn cancel(&mut self) {
        if !self.done {
            // Already-exited children make kill fail; that is fine
            let _ = self.child.kill();
            let _ = self.child.wait();
            self.done = true;
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Platform for MacOSPlatform {
    fn default_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![
            PathBuf::from("/Applications"),
            PathBuf::from("/System/Applications"),
        ];

        if let Some(home) = dirs::home_dir() {
            roots.push(home.join("Applications"));
        }

        roots.push(PathBuf::from("/usr/local/bin"));
        roots.push(PathBuf::from("/opt/homebrew/bin"));
        roots
    }

    fn mounted_volumes(&self) -> Vec<PathBuf> {
        // The boot volume appears in /Volumes as a symlink to /, which
        // child_dirs already leaves out
        child_dirs(Path::new("/Volumes"))
    }

    fn start_metadata_query(&self) -> Result<Box<dyn MetadataQuery>, MetadataError> {
        Ok(Box::new(SpotlightQuery::start()?))
    }

    fn launch_artifact(&self, record: &ArtifactRecord) -> ScoutResult<()> {
        match record.kind {
            ArtifactKind::Bundle => {
                Command::new("open")
                    .arg(&record.path)
                    .spawn()
                    .map_err(|e| ScoutError::Launch(format!("Failed to launch {}: {}", record.name, e)))?;
            }
            ArtifactKind::Executable => {
                Command::new(&record.path)
                    .spawn()
                    .map_err(|e| ScoutError::Launch(format!("Failed to launch {}: {}", record.name, e)))?;
            }
        }
        Ok(())
    }

    fn config_dir(&self) -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join("Library/Application Support"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("appscout")
    }
}
