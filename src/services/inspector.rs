//! Classifies walker entries and extracts identity metadata.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::DiscoveryConfig;
use crate::core::artifact::{ArtifactKind, ArtifactRecord, DiscoverySource};
use crate::services::walker::{self, WalkEntry};

/// Directory names that only ever appear inside bundles or as resource stores.
const INTERNAL_NAMES: &[&str] = &[
    "Contents",
    "MacOS",
    "Resources",
    "Frameworks",
    "PlugIns",
    "Helpers",
    "SharedSupport",
    "_CodeSignature",
];

/// Suffixes of loadable code and nested components that are not launchable.
const NON_ARTIFACT_SUFFIXES: &[&str] = &[
    ".framework",
    ".bundle",
    ".plugin",
    ".appex",
    ".xpc",
    ".dylib",
    ".so",
    ".dll",
];

/// Extensions stripped from executable names for display.
const EXECUTABLE_EXTENSIONS: &[&str] = &["exe", "bat", "cmd", "com", "sh", "command", "AppImage"];

static SHARED_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.so(\.\d+)+$").unwrap());

static PLIST_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<key>\s*([^<]+?)\s*</key>\s*<string>([^<]*)</string>").unwrap()
});

/// Why an entry was not turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotAnArtifact {
    #[error("{0} is an internal bundle or resource entry")]
    Excluded(PathBuf),

    #[error("{0} is a directory without bundle markers")]
    PlainDirectory(PathBuf),

    #[error("{0} is not an executable file")]
    NotExecutable(PathBuf),

    #[error("{0} could not be read")]
    Unreadable(PathBuf),

    #[error("{0} has no usable name")]
    Unnamed(PathBuf),
}

/// Identity fields read from a bundle's `Contents/Info.plist`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleDescriptor {
    pub identifier: Option<String>,
    pub version: Option<String>,
    pub icon_file: Option<String>,
}

impl BundleDescriptor {
    fn from_values(values: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            values
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            identifier: get("CFBundleIdentifier"),
            version: get("CFBundleShortVersionString").or_else(|| get("CFBundleVersion")),
            icon_file: get("CFBundleIconFile"),
        }
    }
}

/// Turns filesystem entries into [`ArtifactRecord`]s.
#[derive(Debug, Clone)]
pub struct ArtifactInspector {
    bundle_suffixes: Vec<String>,
}

impl ArtifactInspector {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            bundle_suffixes: config.bundle_suffixes.clone(),
        }
    }

    /// Inspect one walker entry.
    pub fn inspect(
        &self,
        entry: &WalkEntry,
        source: DiscoverySource,
    ) -> Result<ArtifactRecord, NotAnArtifact> {
        self.inspect_labeled(entry, source, None)
    }

    /// Inspect one walker entry, using `version_label` as the version of a
    /// bare executable. Bundles always take their declared version.
    pub fn inspect_labeled(
        &self,
        entry: &WalkEntry,
        source: DiscoverySource,
        version_label: Option<String>,
    ) -> Result<ArtifactRecord, NotAnArtifact> {
        let path = &entry.path;
        if is_excluded_name(path) {
            return Err(NotAnArtifact::Excluded(path.clone()));
        }

        match entry.kind {
            ArtifactKind::Bundle => self.inspect_bundle(path, source),
            ArtifactKind::Executable => inspect_executable(path, source, version_label),
        }
    }

    /// Classify an arbitrary path by stat and inspect it.
    pub fn inspect_path(
        &self,
        path: &Path,
        source: DiscoverySource,
    ) -> Result<ArtifactRecord, NotAnArtifact> {
        let metadata = fs::metadata(path).map_err(|_| NotAnArtifact::Unreadable(path.to_path_buf()))?;
        let kind = if metadata.is_dir() {
            ArtifactKind::Bundle
        } else {
            ArtifactKind::Executable
        };

        self.inspect(
            &WalkEntry {
                path: path.to_path_buf(),
                kind,
            },
            source,
        )
    }

    fn inspect_bundle(
        &self,
        path: &Path,
        source: DiscoverySource,
    ) -> Result<ArtifactRecord, NotAnArtifact> {
        if !path.is_dir() {
            return Err(NotAnArtifact::Unreadable(path.to_path_buf()));
        }
        if !walker::has_bundle_suffix(path, &self.bundle_suffixes) {
            return Err(NotAnArtifact::PlainDirectory(path.to_path_buf()));
        }

        let name = crate::core::artifact::display_name(path)
            .ok_or_else(|| NotAnArtifact::Unnamed(path.to_path_buf()))?;

        // A bundle without a readable descriptor is still a bundle
        let descriptor = read_bundle_descriptor(path).unwrap_or_default();

        Ok(ArtifactRecord::new(name, path, ArtifactKind::Bundle, source)
            .with_identity(descriptor.identifier)
            .with_version(descriptor.version))
    }
}

fn inspect_executable(
    path: &Path,
    source: DiscoverySource,
    version_label: Option<String>,
) -> Result<ArtifactRecord, NotAnArtifact> {
    let metadata = fs::metadata(path).map_err(|_| NotAnArtifact::Unreadable(path.to_path_buf()))?;
    if metadata.is_dir() {
        return Err(NotAnArtifact::PlainDirectory(path.to_path_buf()));
    }
    if !walker::is_executable(path, &metadata) {
        return Err(NotAnArtifact::NotExecutable(path.to_path_buf()));
    }

    let name = executable_name(path).ok_or_else(|| NotAnArtifact::Unnamed(path.to_path_buf()))?;

    Ok(ArtifactRecord::new(name, path, ArtifactKind::Executable, source).with_version(version_label))
}

/// `ffmpeg` stays `ffmpeg`, `python3.12` stays `python3.12`, `Setup.exe`
/// becomes `Setup`.
fn executable_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_string_lossy().to_string();
    let trimmed = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if EXECUTABLE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)) => {
            crate::core::artifact::display_name(path)?
        }
        _ => file_name,
    };
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Whether the entry name marks a bundle internal, a resource directory or
/// loadable code rather than something a user launches.
pub fn is_excluded_name(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return true;
    };

    if INTERNAL_NAMES.iter().any(|internal| *internal == name) {
        return true;
    }

    let lower = name.to_lowercase();
    NON_ARTIFACT_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
        || SHARED_OBJECT.is_match(&lower)
}

/// Read `Contents/Info.plist` of a bundle, if there is one.
pub fn read_bundle_descriptor(bundle: &Path) -> Option<BundleDescriptor> {
    let info_plist = bundle.join("Contents/Info.plist");
    let bytes = fs::read(&info_plist).ok()?;

    let values = if bytes.starts_with(b"bplist") {
        binary_plist_values(&info_plist)?
    } else {
        xml_plist_values(&String::from_utf8_lossy(&bytes))
    };

    Some(BundleDescriptor::from_values(&values))
}

/// String values of an XML property list, first occurrence of each key wins.
fn xml_plist_values(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for caps in PLIST_STRING.captures_iter(content) {
        values
            .entry(unescape_xml(&caps[1]))
            .or_insert_with(|| unescape_xml(&caps[2]));
    }
    values
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Binary plists need the system converter; `plutil` emits JSON we can read.
#[cfg(target_os = "macos")]
fn binary_plist_values(info_plist: &Path) -> Option<HashMap<String, String>> {
    let output = std::process::Command::new("plutil")
        .args(["-convert", "json", "-o", "-"])
        .arg(info_plist)
        .output()
        .ok()?;

    if !output.status.success() {
        tracing::trace!(
            event = "plist_convert_failed",
            path = %info_plist.display()
        );
        return None;
    }

    let plist: serde_json::Value = serde_json::from_slice(&output.stdout).ok()?;
    let object = plist.as_object()?;
    Some(
        object
            .iter()
            .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
            .collect(),
    )
}

#[cfg(not(target_os = "macos"))]
fn binary_plist_values(info_plist: &Path) -> Option<HashMap<String, String>> {
    tracing::trace!(
        event = "plist_binary_unsupported",
        path = %info_plist.display()
    );
    None
}
