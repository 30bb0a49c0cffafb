//! Shared fixtures for unit tests: fake filesystem trees and a scripted
//! platform.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core::artifact::ArtifactRecord;
use crate::error::{ScoutError, ScoutResult};
use crate::platform::Platform;
use crate::services::metadata::{MetadataError, MetadataQuery};

/// Create `parent/name` as a bundle with an XML `Info.plist`.
pub fn make_bundle(
    parent: &Path,
    name: &str,
    identity: Option<&str>,
    version: Option<&str>,
) -> PathBuf {
    let bundle = parent.join(name);
    let contents = bundle.join("Contents");
    fs::create_dir_all(&contents).unwrap();

    let mut dict = String::new();
    if let Some(identity) = identity {
        dict.push_str(&format!(
            "<key>CFBundleIdentifier</key><string>{}</string>\n",
            identity
        ));
    }
    if let Some(version) = version {
        dict.push_str(&format!(
            "<key>CFBundleShortVersionString</key><string>{}</string>\n",
            version
        ));
    }
    fs::write(
        contents.join("Info.plist"),
        format!("<plist version=\"1.0\"><dict>\n{}</dict></plist>\n", dict),
    )
    .unwrap();

    bundle
}

/// Create `parent/name` as an executable script.
pub fn make_executable(parent: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(parent).unwrap();
    let path = parent.join(name);
    fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    path
}

/// How the fake metadata facility behaves.
#[derive(Debug, Clone)]
pub enum FakeMetadata {
    /// Completes on the first poll
    Ready(Vec<PathBuf>),
    /// Completes after a delay
    Delayed(Duration, Vec<PathBuf>),
    /// Never completes
    Hang,
    /// Cannot be started
    Unavailable,
    /// Starts, then reports an error
    Fail,
}

pub struct FakePlatform {
    pub roots: Vec<PathBuf>,
    metadata: Mutex<FakeMetadata>,
    starts: AtomicUsize,
    cancels: Arc<AtomicUsize>,
    pub launched: Mutex<Vec<PathBuf>>,
    pub fail_launch: bool,
}

impl FakePlatform {
    pub fn new(metadata: FakeMetadata) -> Self {
        Self {
            roots: Vec::new(),
            metadata: Mutex::new(metadata),
            starts: AtomicUsize::new(0),
            cancels: Arc::new(AtomicUsize::new(0)),
            launched: Mutex::new(Vec::new()),
            fail_launch: false,
        }
    }

    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    pub fn set_metadata(&self, metadata: FakeMetadata) {
        *self.metadata.lock().unwrap() = metadata;
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

struct FakeQuery {
    outcome: Option<Result<Vec<PathBuf>, MetadataError>>,
    ready_at: Option<Instant>,
    cancels: Arc<AtomicUsize>,
    cancelled: bool,
}

impl MetadataQuery for FakeQuery {
    fn try_collect(&mut self) -> Result<Option<Vec<PathBuf>>, MetadataError> {
        match self.ready_at {
            Some(at) if Instant::now() >= at => {}
            _ => return Ok(None),
        }
        match self.outcome.take() {
            Some(outcome) => outcome.map(Some),
            None => Ok(None),
        }
    }

    fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Platform for FakePlatform {
    fn default_roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }

    fn start_metadata_query(&self) -> Result<Box<dyn MetadataQuery>, MetadataError> {
        self.starts.fetch_add(1, Ordering::SeqCst);

        let now = Instant::now();
        let (outcome, ready_at) = match self.metadata.lock().unwrap().clone() {
            FakeMetadata::Ready(paths) => (Some(Ok(paths)), Some(now)),
            FakeMetadata::Delayed(delay, paths) => (Some(Ok(paths)), Some(now + delay)),
            FakeMetadata::Hang => (None, None),
            FakeMetadata::Unavailable => {
                return Err(MetadataError::Unavailable("fake facility".to_string()))
            }
            FakeMetadata::Fail => (
                Some(Err(MetadataError::Failed("fake failure".to_string()))),
                Some(now),
            ),
        };

        Ok(Box::new(FakeQuery {
            outcome,
            ready_at,
            cancels: Arc::clone(&self.cancels),
            cancelled: false,
        }))
    }

    fn launch_artifact(&self, record: &ArtifactRecord) -> ScoutResult<()> {
        if self.fail_launch {
            return Err(ScoutError::Launch(format!(
                "Failed to launch {}: refused",
                record.name
            )));
        }
        self.launched.lock().unwrap().push(record.path.clone());
        Ok(())
    }
}
