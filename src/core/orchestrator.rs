//! Rebuild coordination and snapshot publishing.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core::artifact::{ArtifactRecord, DiscoverySource};
use crate::core::catalog::{Catalog, Deduplicator};
use crate::core::search::{RankedSearchEngine, SearchHit};
use crate::error::ScoutResult;
use crate::platform::Platform;
use crate::services::inspector::ArtifactInspector;
use crate::services::metadata::MetadataSearchClient;
use crate::services::walker::DirectoryWalker;

/// Whether a rebuild is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildState {
    Idle,
    Rebuilding,
}

/// Clears the rebuilding flag however the rebuild ends, including when the
/// `refresh()` future is dropped mid-way.
struct RebuildingFlagReset<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RebuildingFlagReset<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Owns the current catalog and rebuilds it on demand.
pub struct CatalogOrchestrator {
    platform: Arc<dyn Platform>,
    roots: Vec<PathBuf>,
    walker: Arc<DirectoryWalker>,
    inspector: Arc<ArtifactInspector>,
    metadata: MetadataSearchClient,
    engine: RankedSearchEngine,
    current: ArcSwap<Catalog>,
    rebuild_lock: Mutex<()>,
    rebuilding: AtomicBool,
    generation: AtomicU64,
}

impl CatalogOrchestrator {
    pub fn new(config: &Config, platform: Arc<dyn Platform>) -> Self {
        let roots = config.discovery.resolved_roots(platform.as_ref());
        tracing::debug!(
            event = "orchestrator_roots",
            roots = ?roots,
            max_depth = config.discovery.max_depth
        );

        Self {
            roots,
            walker: Arc::new(DirectoryWalker::new(&config.discovery)),
            inspector: Arc::new(ArtifactInspector::new(&config.discovery)),
            metadata: MetadataSearchClient::new(&config.metadata),
            engine: RankedSearchEngine::new(),
            current: ArcSwap::from_pointee(Catalog::empty()),
            rebuild_lock: Mutex::new(()),
            rebuilding: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            platform,
        }
    }

    pub fn state(&self) -> RebuildState {
        if self.rebuilding.load(Ordering::SeqCst) {
            RebuildState::Rebuilding
        } else {
            RebuildState::Idle
        }
    }

    /// The most recently published catalog.
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.current.load_full()
    }

    /// Rebuild the catalog from both discovery sources and publish it.
    ///
    /// Calls that arrive while a rebuild is running wait for it and return
    /// without starting another. Never fails; the worst outcome is an empty
    /// catalog.
    pub async fn refresh(&self) {
        let seen_generation = self.generation.load(Ordering::SeqCst);
        let _guard = self.rebuild_lock.lock().await;

        if self.generation.load(Ordering::SeqCst) != seen_generation {
            tracing::debug!(event = "catalog_refresh_coalesced");
            return;
        }

        self.rebuilding.store(true, Ordering::SeqCst);
        let _rebuilding_reset = RebuildingFlagReset {
            flag: &self.rebuilding,
        };
        let started = Instant::now();

        let (walked, indexed) = tokio::join!(
            self.walk_roots(),
            self.metadata.fetch(self.platform.as_ref(), &self.inspector)
        );

        let (catalog, stats) = Deduplicator::merge(walked, indexed);
        let generation = self.generation.load(Ordering::SeqCst) + 1;
        let catalog = catalog.stamped(generation, started.elapsed());

        tracing::info!(
            event = "catalog_published",
            generation,
            entries = catalog.len(),
            walker_kept = stats.walker_kept,
            walker_discarded = stats.walker_discarded,
            metadata_kept = stats.metadata_kept,
            metadata_discarded = stats.metadata_discarded,
            elapsed_ms = catalog.build_time().as_millis() as u64,
        );

        self.current.store(Arc::new(catalog));
        self.generation.store(generation, Ordering::SeqCst);
    }

    /// Walk every root on its own blocking task; results keep root order.
    async fn walk_roots(&self) -> Vec<ArtifactRecord> {
        let tasks: Vec<_> = self
            .roots
            .iter()
            .cloned()
            .map(|root| {
                let label = root.clone();
                let walker = Arc::clone(&self.walker);
                let inspector = Arc::clone(&self.inspector);
                let task = tokio::task::spawn_blocking(move || {
                    walker
                        .walk(&root)
                        .filter_map(|entry| match inspector.inspect(&entry, DiscoverySource::Walker) {
                            Ok(record) => Some(record),
                            Err(reason) => {
                                tracing::trace!(event = "artifact_rejected", reason = %reason);
                                None
                            }
                        })
                        .collect::<Vec<_>>()
                });
                (label, task)
            })
            .collect();

        let mut records = Vec::new();
        for (root, task) in tasks {
            match task.await {
                Ok(found) => records.extend(found),
                Err(e) => {
                    tracing::warn!(
                        event = "walk_root_failed",
                        root = %root.display(),
                        error = %e
                    );
                }
            }
        }
        records
    }

    /// Ranked matches from the current snapshot.
    pub fn search(&self, query: &str) -> Vec<Arc<ArtifactRecord>> {
        self.engine.search(&self.current.load(), query)
    }

    pub fn search_limited(&self, query: &str, limit: usize) -> Vec<Arc<ArtifactRecord>> {
        self.engine.search_limited(&self.current.load(), query, limit)
    }

    pub fn search_hits(&self, query: &str) -> Vec<SearchHit> {
        self.engine.search_hits(&self.current.load(), query)
    }

    /// Forward the artifact to the OS launcher.
    pub fn launch(&self, record: &ArtifactRecord) -> ScoutResult<()> {
        tracing::info!(event = "artifact_launch", name = %record.name, path = %record.path.display());
        self.platform.launch_artifact(record).inspect_err(|e| {
            tracing::warn!(event = "artifact_launch_failed", path = %record.path.display(), error = %e);
        })
    }
}
