//! Discovered launchable items and their identity rules.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// What kind of filesystem object an artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A directory treated as one application (e.g. `Foo.app`)
    Bundle,
    /// A regular file with an execute bit
    Executable,
}

/// Which discovery source produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoverySource {
    Walker,
    MetadataSearch,
}

/// Key used to decide whether two records describe the same artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    /// Declared bundle identifier
    Identity(String),
    /// Absolute path, used when no identifier is declared
    Path(PathBuf),
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Identity(id) => write!(f, "{}", id),
            IdentityKey::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One discovered launchable item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Display name (file name without extension)
    pub name: String,
    /// Absolute filesystem path
    pub path: PathBuf,
    /// Stable bundle identifier, `None` for bare executables
    pub identity: Option<String>,
    /// Declared version string
    pub version: Option<String>,
    pub kind: ArtifactKind,
    pub source: DiscoverySource,
    #[serde(skip)]
    icon: OnceLock<Option<PathBuf>>,
}

impl ArtifactRecord {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        kind: ArtifactKind,
        source: DiscoverySource,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            identity: None,
            version: None,
            kind,
            source,
            icon: OnceLock::new(),
        }
    }

    pub fn with_identity(mut self, identity: Option<String>) -> Self {
        self.identity = identity.filter(|id| !id.trim().is_empty());
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version.filter(|v| !v.trim().is_empty());
        self
    }

    /// Identity if declared, otherwise the path.
    pub fn identity_key(&self) -> IdentityKey {
        match &self.identity {
            Some(id) => IdentityKey::Identity(id.clone()),
            None => IdentityKey::Path(self.path.clone()),
        }
    }

    /// Same identity when both declare one, otherwise same path.
    pub fn is_same_artifact(&self, other: &ArtifactRecord) -> bool {
        match (&self.identity, &other.identity) {
            (Some(a), Some(b)) => a == b,
            _ => self.path == other.path,
        }
    }

    pub fn path_str(&self) -> String {
        self.path.display().to_string()
    }

    /// Icon for presentation, resolved on first use and cached.
    ///
    /// Resolution is best effort; `None` never makes the record invalid.
    pub fn icon(&self, platform: &dyn Platform) -> Option<&Path> {
        self.icon
            .get_or_init(|| platform.resolve_icon(self))
            .as_deref()
    }
}

impl PartialEq for ArtifactRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.identity == other.identity
            && self.version == other.version
            && self.kind == other.kind
            && self.source == other.source
    }
}

impl Eq for ArtifactRecord {}

/// Display name for a path: the file name without its extension.
pub fn display_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy().to_string();
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}
