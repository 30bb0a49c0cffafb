//! Bounded recursive filesystem traversal.
//!
//! A walk is a lazy, single-threaded, depth-first iterator over one root.
//! Bundles are yielded without descending into them; hidden and deny-listed
//! directories are pruned; unreadable subtrees are skipped and counted.

use std::ffi::OsStr;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::DiscoveryConfig;
use crate::core::artifact::ArtifactKind;

const SKIP_SAMPLE_LIMIT: usize = 5;

/// A candidate found by the walker, not yet inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    max_depth: usize,
    deny_list: Vec<String>,
    bundle_suffixes: Vec<String>,
    follow_symlinks: bool,
}

/// Counters for one walk, logged when the walk is exhausted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkStats {
    pub yielded: u64,
    pub pruned: u64,
    pub skipped: u64,
    pub skipped_samples: Vec<String>,
}

impl WalkStats {
    fn record_skip(&mut self, path: Option<&Path>) {
        self.skipped = self.skipped.saturating_add(1);
        if self.skipped_samples.len() < SKIP_SAMPLE_LIMIT {
            let text = path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            self.skipped_samples.push(text);
        }
    }
}

impl DirectoryWalker {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            deny_list: config.deny_list.clone(),
            bundle_suffixes: config.bundle_suffixes.clone(),
            follow_symlinks: config.follow_symlinks,
        }
    }

    /// Lazily walk `root`. A missing root yields nothing.
    pub fn walk(&self, root: &Path) -> Walk<'_> {
        let inner = WalkDir::new(root)
            .max_depth(self.max_depth)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter();

        Walk {
            walker: self,
            root: root.to_path_buf(),
            inner,
            stats: WalkStats::default(),
            finished: false,
        }
    }

    /// Hidden entries are always pruned; the deny-list names directories only.
    fn is_pruned(&self, name: &OsStr, is_dir: bool) -> bool {
        let name = name.to_string_lossy();
        name.starts_with('.') || (is_dir && self.deny_list.iter().any(|denied| *denied == name))
    }

    /// Classify a symlink that the walk does not follow by looking at its
    /// target. Linked directories are never entered.
    fn classify_link(&self, path: &Path) -> Option<ArtifactKind> {
        let metadata = fs::metadata(path).ok()?;
        if metadata.is_dir() {
            has_bundle_suffix(path, &self.bundle_suffixes).then_some(ArtifactKind::Bundle)
        } else {
            is_executable(path, &metadata).then_some(ArtifactKind::Executable)
        }
    }
}

/// Iterator returned by [`DirectoryWalker::walk`].
pub struct Walk<'a> {
    walker: &'a DirectoryWalker,
    root: PathBuf,
    inner: walkdir::IntoIter,
    stats: WalkStats,
    finished: bool,
}

impl Walk<'_> {
    pub fn stats(&self) -> &WalkStats {
        &self.stats
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        tracing::debug!(
            event = "walk_root_done",
            root = %self.root.display(),
            yielded = self.stats.yielded,
            pruned = self.stats.pruned,
            skipped = self.stats.skipped,
            skipped_samples = self.stats.skipped_samples.join(" | "),
        );
    }
}

impl Iterator for Walk<'_> {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<WalkEntry> {
        loop {
            let Some(next) = self.inner.next() else {
                self.finish();
                return None;
            };

            let entry = match next {
                Ok(entry) => entry,
                Err(err) => {
                    // Unreadable directory or symlink loop: drop the subtree
                    self.stats.record_skip(err.path());
                    continue;
                }
            };

            let file_type = entry.file_type();
            if entry.depth() == 0 {
                // A root that is itself a bundle is yielded, not entered
                if file_type.is_dir() && has_bundle_suffix(entry.path(), &self.walker.bundle_suffixes) {
                    self.inner.skip_current_dir();
                    self.stats.yielded += 1;
                    return Some(WalkEntry {
                        path: entry.into_path(),
                        kind: ArtifactKind::Bundle,
                    });
                }
                continue;
            }

            if self.walker.is_pruned(entry.file_name(), file_type.is_dir()) {
                if file_type.is_dir() {
                    self.inner.skip_current_dir();
                }
                self.stats.pruned += 1;
                continue;
            }

            let kind = if file_type.is_dir() {
                if !has_bundle_suffix(entry.path(), &self.walker.bundle_suffixes) {
                    continue;
                }
                // Bundle contents are opaque
                self.inner.skip_current_dir();
                Some(ArtifactKind::Bundle)
            } else if file_type.is_symlink() {
                self.walker.classify_link(entry.path())
            } else if file_type.is_file() {
                match entry.metadata() {
                    Ok(metadata) => {
                        is_executable(entry.path(), &metadata).then_some(ArtifactKind::Executable)
                    }
                    Err(_) => {
                        self.stats.record_skip(Some(entry.path()));
                        None
                    }
                }
            } else {
                None
            };

            if let Some(kind) = kind {
                self.stats.yielded += 1;
                return Some(WalkEntry {
                    path: entry.into_path(),
                    kind,
                });
            }
        }
    }
}

/// Whether the path's extension is one of the bundle suffixes.
pub fn has_bundle_suffix(path: &Path, suffixes: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| suffixes.iter().any(|s| s.eq_ignore_ascii_case(ext)))
}

/// Regular file with any execute bit set.
#[cfg(unix)]
pub fn is_executable(_path: &Path, metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
}

/// Regular file with an extension Windows will execute.
#[cfg(not(unix))]
pub fn is_executable(path: &Path, metadata: &Metadata) -> bool {
    metadata.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ["exe", "bat", "cmd", "com"]
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{make_bundle, make_executable};

    fn walker() -> DirectoryWalker {
        DirectoryWalker::new(&DiscoveryConfig::default())
    }

    fn names(entries: &[WalkEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_finds_bundles_and_executables() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        make_bundle(&root.join("Apps"), "Editor.app", Some("com.example.editor"), None);
        make_executable(&root.join("bin"), "tool");
        fs::write(root.join("bin").join("notes.txt"), "not a program").unwrap();

        let found: Vec<WalkEntry> = walker().walk(root).collect();

        assert_eq!(names(&found), vec!["Editor.app", "tool"]);
        assert_eq!(found[0].kind, ArtifactKind::Bundle);
        assert_eq!(found[1].kind, ArtifactKind::Executable);
    }

    #[test]
    fn test_does_not_descend_into_bundles() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = make_bundle(dir.path(), "Player.app", None, None);
        make_executable(&bundle.join("Contents/MacOS"), "Player");
        make_bundle(&bundle.join("Contents/Helpers"), "Helper.app", None, None);

        let found: Vec<WalkEntry> = walker().walk(dir.path()).collect();
        assert_eq!(names(&found), vec!["Player.app"]);
    }

    #[test]
    fn test_prunes_hidden_and_denied() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        make_executable(&root.join(".cache"), "hidden-tool");
        make_executable(&root.join("node_modules/.bin"), "eslint");
        make_executable(root, ".secret");
        make_executable(&root.join("bin"), "visible");

        let dir_walker = walker();
        let mut walk = dir_walker.walk(root);
        let found: Vec<WalkEntry> = walk.by_ref().collect();

        assert_eq!(names(&found), vec!["visible"]);
        assert_eq!(walk.stats().pruned, 3);
    }

    #[test]
    fn test_deny_list_only_prunes_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        make_executable(&root.join("bin"), "private");
        make_executable(&root.join("bin"), "dev");
        make_executable(&root.join("dev"), "inside-denied");

        let found: Vec<WalkEntry> = walker().walk(root).collect();

        assert_eq!(names(&found), vec!["dev", "private"]);
        assert!(found.iter().all(|e| e.path.parent() == Some(root.join("bin").as_path())));
    }

    #[test]
    fn test_root_that_is_a_bundle_is_yielded() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = make_bundle(dir.path(), "Foo.app", Some("com.example.foo"), None);
        make_executable(&bundle.join("Contents/MacOS"), "Foo");

        let found: Vec<WalkEntry> = walker().walk(&bundle).collect();

        assert_eq!(
            found,
            vec![WalkEntry {
                path: bundle,
                kind: ArtifactKind::Bundle,
            }]
        );
    }

    #[test]
    fn test_respects_max_depth() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        make_executable(&root.join("a"), "shallow");
        make_executable(&root.join("a/b/c"), "deep");

        let config = DiscoveryConfig {
            max_depth: 2,
            ..DiscoveryConfig::default()
        };
        let found: Vec<WalkEntry> = DirectoryWalker::new(&config).walk(root).collect();

        assert_eq!(names(&found), vec!["shallow"]);
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dir_walker = walker();
        let mut walk = dir_walker.walk(&dir.path().join("nope"));
        assert!(walk.next().is_none());
        assert_eq!(walk.stats().skipped, 1);
    }

    #[test]
    fn test_walk_order_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta", "alpha", "Mid", "beta"] {
            make_executable(dir.path(), name);
        }

        let first: Vec<WalkEntry> = walker().walk(dir.path()).collect();
        let second: Vec<WalkEntry> = walker().walk(dir.path()).collect();

        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subtree_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let locked = root.join("locked");
        make_executable(&locked, "hidden-away");
        make_executable(&root.join("open"), "reachable");

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let readable_anyway = fs::read_dir(&locked).is_ok();

        let dir_walker = walker();
        let mut walk = dir_walker.walk(root);
        let found: Vec<WalkEntry> = walk.by_ref().collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if readable_anyway {
            // Running with privileges that ignore permission bits
            return;
        }
        assert_eq!(names(&found), vec!["reachable"]);
        assert_eq!(walk.stats().skipped, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let real = make_executable(&root.join("real"), "tool");
        std::os::unix::fs::symlink(root, root.join("real").join("loop")).unwrap();
        std::os::unix::fs::symlink(&real, root.join("tool-link")).unwrap();

        let found: Vec<WalkEntry> = walker().walk(root).collect();

        assert_eq!(names(&found), vec!["tool", "tool-link"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loops_terminate_when_following() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        make_executable(&root.join("real"), "tool");
        std::os::unix::fs::symlink(root, root.join("real").join("loop")).unwrap();

        let config = DiscoveryConfig {
            follow_symlinks: true,
            ..DiscoveryConfig::default()
        };
        let walker = DirectoryWalker::new(&config);
        let mut walk = walker.walk(root);
        let found: Vec<WalkEntry> = walk.by_ref().collect();

        assert_eq!(names(&found), vec!["tool"]);
        assert!(walk.stats().skipped >= 1);
    }

    #[test]
    fn test_bundle_suffix_matching() {
        let suffixes = vec!["app".to_string()];
        assert!(has_bundle_suffix(Path::new("/A/Safari.app"), &suffixes));
        assert!(has_bundle_suffix(Path::new("/A/Old.APP"), &suffixes));
        assert!(!has_bundle_suffix(Path::new("/A/app"), &suffixes));
        assert!(!has_bundle_suffix(Path::new("/A/Thing.apps"), &suffixes));
    }
}
