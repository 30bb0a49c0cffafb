//! Linux platform implementation.
//!
//! Implements the Platform trait for Linux systems using:
//! - The usual binary directories and /opt as walk roots
//! - The XDG desktop-entry database as the metadata search facility
//! - Direct spawning for executables, xdg-open for bundle directories

use super::{child_dirs, Platform};
use crate::core::artifact::{ArtifactKind, ArtifactRecord};
use crate::error::{ScoutError, ScoutResult};
use crate::services::metadata::{MetadataError, MetadataQuery, ThreadedQuery};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};

use freedesktop_desktop_entry::DesktopEntry;
use walkdir::WalkDir;

/// Linux platform implementation.
pub struct LinuxPlatform;

impl LinuxPlatform {
    /// Create a new Linux platform instance.
    pub fn new() -> Self {
        Self
    }

    /// Directories holding `.desktop` files, system first.
    fn application_dirs() -> Vec<PathBuf> {
        let mut dirs_to_scan: Vec<PathBuf> = vec![
            PathBuf::from("/usr/share/applications"),
            PathBuf::from("/usr/local/share/applications"),
            PathBuf::from("/var/lib/flatpak/exports/share/applications"),
        ];

        // User local applications
        if let Some(data_home) = dirs::data_local_dir() {
            dirs_to_scan.push(data_home.join("applications"));
        }

        // Flatpak applications
        if let Some(home) = dirs::home_dir() {
            dirs_to_scan.push(home.join(".local/share/flatpak/exports/share/applications"));
        }

        // Snap applications
        dirs_to_scan.push(PathBuf::from("/var/lib/snapd/desktop/applications"));
        dirs_to_scan
    }

    fn scan_desktop_entries(cancelled: &AtomicBool) -> Result<Vec<PathBuf>, MetadataError> {
        Self::scan_dirs(&Self::application_dirs(), cancelled)
    }

    /// Read every desktop entry under `dirs` and resolve its program to a
    /// path. Each program appears once, in first-seen order.
    fn scan_dirs(dirs: &[PathBuf], cancelled: &AtomicBool) -> Result<Vec<PathBuf>, MetadataError> {
        if !dirs.iter().any(|d| d.is_dir()) {
            return Err(MetadataError::Unavailable(
                "no XDG application directories".to_string(),
            ));
        }

        let mut programs = Vec::new();
        let mut seen = HashSet::new();
        for dir in dirs.iter().filter(|d| d.is_dir()) {
            for entry in WalkDir::new(dir)
                .max_depth(2)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if cancelled.load(Ordering::SeqCst) {
                    return Ok(programs);
                }

                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "desktop") {
                    if let Some(program) = Self::parse_desktop_file(path) {
                        if seen.insert(program.clone()) {
                            programs.push(program);
                        }
                    }
                }
            }
        }
        Ok(programs)
    }

    /// Parse a .desktop file into the path of the program it runs.
    fn parse_desktop_file(path: &Path) -> Option<PathBuf> {
        let content = std::fs::read_to_string(path).ok()?;
        let entry = DesktopEntry::from_str(path, &content, Some(&["en"])).ok()?;

        // Skip entries that shouldn't be shown
        if entry.no_display() || entry.hidden() {
            return None;
        }

        resolve_program(&strip_field_codes(entry.exec()?))
    }
}

/// Strip field codes from exec command (%f, %u, %F, %U, etc.)
fn strip_field_codes(exec: &str) -> String {
    exec.replace("%f", "")
        .replace("%F", "")
        .replace("%u", "")
        .replace("%U", "")
        .replace("%i", "")
        .replace("%c", "")
        .replace("%k", "")
}

/// The program an Exec line runs, skipping an `env VAR=value` prefix.
fn resolve_program(exec: &str) -> Option<PathBuf> {
    let mut parts = exec.split_whitespace().map(|p| p.trim_matches('"'));
    let mut program = parts.next()?;
    if program == "env" {
        program = parts.find(|p| !p.contains('='))?;
    }

    let candidate = Path::new(program);
    if candidate.is_absolute() {
        return candidate.exists().then(|| candidate.to_path_buf());
    }
    which::which(program).ok()
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for LinuxPlatform {
    fn default_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![
            PathBuf::from("/usr/bin"),
            PathBuf::from("/usr/local/bin"),
            PathBuf::from("/opt"),
            PathBuf::from("/var/lib/flatpak/exports/bin"),
            PathBuf::from("/snap/bin"),
        ];

        if let Some(home) = dirs::home_dir() {
            roots.push(home.join(".local/bin"));
            roots.push(home.join("Applications"));
        }
        roots
    }

    fn mounted_volumes(&self) -> Vec<PathBuf> {
        let mut volumes = Vec::new();
        if let Ok(user) = std::env::var("USER") {
            volumes.extend(child_dirs(&Path::new("/media").join(&user)));
            volumes.extend(child_dirs(&Path::new("/run/media").join(&user)));
        }
        volumes.extend(child_dirs(Path::new("/mnt")));
        volumes
    }

    fn start_metadata_query(&self) -> Result<Box<dyn MetadataQuery>, MetadataError> {
        let query = ThreadedQuery::spawn("desktop-entry-query", Self::scan_desktop_entries)?;
        Ok(Box::new(query))
    }

    fn launch_artifact(&self, record: &ArtifactRecord) -> ScoutResult<()> {
        let mut command = match record.kind {
            ArtifactKind::Bundle => {
                let mut open = Command::new("xdg-open");
                open.arg(&record.path);
                open
            }
            ArtifactKind::Executable => Command::new(&record.path),
        };

        command
            .spawn()
            .map_err(|e| ScoutError::Launch(format!("Failed to launch {}: {}", record.name, e)))?;
        Ok(())
    }

    fn config_dir(&self) -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("appscout")
    }
}
