//! Platform abstraction layer for cross-platform support.
//!
//! This module defines the `Platform` trait that abstracts every OS-specific
//! facility the catalog consumes, so discovery and ranking stay
//! platform-agnostic.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::artifact::{ArtifactKind, ArtifactRecord};
use crate::error::ScoutResult;
use crate::services::inspector;
use crate::services::metadata::{MetadataError, MetadataQuery};

/// Platform-specific operations trait.
///
/// Implementations provide:
/// - Default discovery roots and mounted volumes
/// - The OS indexed metadata search (Spotlight, XDG desktop entries)
/// - Process launching
/// - Icon resolution
/// - Configuration directory paths
pub trait Platform: Send + Sync {
    /// Directories walked when the config does not name any roots.
    fn default_roots(&self) -> Vec<PathBuf>;

    /// Mount points of removable or external volumes.
    fn mounted_volumes(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Start a query for every application-type item on the local machine.
    ///
    /// The returned query runs in the background; callers poll it and must
    /// cancel it before dropping.
    fn start_metadata_query(&self) -> Result<Box<dyn MetadataQuery>, MetadataError>;

    /// Hand the artifact to the OS process launcher.
    fn launch_artifact(&self, record: &ArtifactRecord) -> ScoutResult<()>;

    /// Best-effort icon lookup for presentation.
    fn resolve_icon(&self, record: &ArtifactRecord) -> Option<PathBuf> {
        match record.kind {
            ArtifactKind::Bundle => bundle_icon(&record.path),
            ArtifactKind::Executable => None,
        }
    }

    /// Get the platform-specific configuration directory.
    ///
    /// - Linux: `~/.config/appscout/`
    /// - macOS: `~/Library/Application Support/appscout/`
    /// - Windows: `%APPDATA%\appscout\`
    fn config_dir(&self) -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("appscout")
    }
}

/// Locate a bundle icon from its descriptor, falling back to the first
/// `.icns` file in `Contents/Resources`.
pub(crate) fn bundle_icon(bundle: &Path) -> Option<PathBuf> {
    let resources = bundle.join("Contents/Resources");

    if let Some(icon_name) = inspector::read_bundle_descriptor(bundle).and_then(|d| d.icon_file) {
        let icon_name = if icon_name.ends_with(".icns") {
            icon_name
        } else {
            format!("{}.icns", icon_name)
        };
        let icon_path = resources.join(icon_name);
        if icon_path.exists() {
            return Some(icon_path);
        }
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(&resources)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "icns"))
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Subdirectories of `parent` that are real directories (not symlinks).
pub(crate) fn child_dirs(parent: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(parent) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();
    dirs
}

/// Get the platform implementation for the current OS.
pub fn current() -> Box<dyn Platform> {
    #[cfg(target_os = "linux")]
    {
        Box::new(linux::LinuxPlatform::new())
    }

    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacOSPlatform::new())
    }

    #[cfg(target_os = "windows")]
    {
        Box::new(windows::WindowsPlatform::new())
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        compile_error!("Unsupported platform")
    }
}
