use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ScoutError, ScoutResult};
use crate::platform::Platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub metadata: MetadataConfig,
    pub search: SearchConfig,
}

/// Filesystem walk settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Root paths to walk. Empty means the platform defaults.
    pub roots: Vec<String>,
    pub max_depth: usize,
    /// Directory names that are never traversed.
    pub deny_list: Vec<String>,
    /// Directory extensions that mark an application bundle.
    pub bundle_suffixes: Vec<String>,
    pub include_mounted_volumes: bool,
    pub follow_symlinks: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            max_depth: 8,
            deny_list: [
                "node_modules",
                "__pycache__",
                "Library",
                "Caches",
                "proc",
                "sys",
                "dev",
                "private",
                "lost+found",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            bundle_suffixes: vec!["app".to_string()],
            include_mounted_volumes: true,
            follow_symlinks: false,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_results: 20 }
    }
}

impl MetadataConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl DiscoveryConfig {
    /// Roots to walk, with `~` and environment variables expanded.
    ///
    /// Falls back to the platform defaults when no roots are configured and
    /// appends mounted volumes when enabled. Duplicates are dropped, first
    /// occurrence wins.
    pub fn resolved_roots(&self, platform: &dyn Platform) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = if self.roots.is_empty() {
            platform.default_roots()
        } else {
            self.roots.iter().map(|root| expand_path(root)).collect()
        };

        if self.include_mounted_volumes {
            roots.extend(platform.mounted_volumes());
        }

        let mut unique = Vec::with_capacity(roots.len());
        for root in roots {
            if !unique.contains(&root) {
                unique.push(root);
            }
        }
        unique
    }
}

/// Expand `~` and `$VARS` in a configured path, keeping it verbatim if
/// expansion fails.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            tracing::warn!(event = "config_path_expand_failed", path = raw, error = %e);
            PathBuf::from(raw)
        }
    }
}

impl Config {
    /// Default config file location for `platform`
    pub fn config_path(platform: &dyn Platform) -> PathBuf {
        platform.config_dir().join("config.toml")
    }

    /// Load config from `path`. A missing or broken file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut config = if path.exists() {
            match Self::read(path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        event = "config_load_failed",
                        path = %path.display(),
                        error = %e
                    );
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.validate();
        config
    }

    fn read(path: &Path) -> ScoutResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate and clamp config values to acceptable ranges
    fn validate(&mut self) {
        self.discovery.max_depth = self.discovery.max_depth.clamp(1, 32);
        self.metadata.timeout_ms = self.metadata.timeout_ms.clamp(100, 60_000);
        self.search.max_results = self.search.max_results.clamp(1, 500);

        // "app" and ".app" mean the same thing
        for suffix in &mut self.discovery.bundle_suffixes {
            *suffix = suffix.trim_start_matches('.').to_string();
        }
        self.discovery.bundle_suffixes.retain(|s| !s.is_empty());
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> ScoutResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ScoutError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)?;
        Ok(())
    }
}
