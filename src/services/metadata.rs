//! Second discovery source: the OS indexed metadata search.
//!
//! The results are strictly additive. Any failure, including the query
//! running past its deadline, produces an empty result so the filesystem
//! walk is never degraded by it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::config::MetadataConfig;
use crate::core::artifact::{ArtifactRecord, DiscoverySource};
use crate::platform::Platform;
use crate::services::inspector::ArtifactInspector;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata search unavailable: {0}")]
    Unavailable(String),

    #[error("metadata search timed out after {0:?}")]
    Timeout(Duration),

    #[error("metadata search failed: {0}")]
    Failed(String),
}

/// A running metadata query.
pub trait MetadataQuery: Send {
    /// Poll without blocking. `Ok(None)` means the query is still gathering.
    fn try_collect(&mut self) -> Result<Option<Vec<PathBuf>>, MetadataError>;

    /// Stop the query and release everything it holds. Safe to call twice.
    fn cancel(&mut self);
}

/// Cancels the wrapped query when dropped, whatever path the caller took.
struct QueryGuard(Box<dyn MetadataQuery>);

impl Drop for QueryGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// A query whose work runs on a dedicated thread.
///
/// The work closure receives a cancellation flag it is expected to check
/// between units of work; `cancel` raises the flag and joins the thread.
pub struct ThreadedQuery {
    cancelled: Arc<AtomicBool>,
    results: Receiver<Result<Vec<PathBuf>, MetadataError>>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadedQuery {
    pub fn spawn<F>(name: &str, work: F) -> Result<Self, MetadataError>
    where
        F: FnOnce(&AtomicBool) -> Result<Vec<PathBuf>, MetadataError> + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, results) = mpsc::channel();

        let flag = Arc::clone(&cancelled);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let outcome = work(&flag);
                // Receiver is gone once the query was cancelled and dropped
                let _ = tx.send(outcome);
            })
            .map_err(|e| MetadataError::Failed(format!("failed to spawn {}: {}", name, e)))?;

        Ok(Self {
            cancelled,
            results,
            handle: Some(handle),
        })
    }
}

impl MetadataQuery for ThreadedQuery {
    fn try_collect(&mut self) -> Result<Option<Vec<PathBuf>>, MetadataError> {
        match self.results.try_recv() {
            Ok(outcome) => outcome.map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(MetadataError::Failed(
                "query worker exited without a result".to_string(),
            )),
        }
    }

    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(event = "metadata_query_worker_panicked");
            }
        }
    }
}

/// Client for the OS metadata search facility.
#[derive(Debug, Clone)]
pub struct MetadataSearchClient {
    enabled: bool,
    timeout: Duration,
}

impl MetadataSearchClient {
    pub fn new(config: &MetadataConfig) -> Self {
        Self {
            enabled: config.enabled,
            timeout: config.timeout(),
        }
    }

    /// Run one query and turn its matches into records.
    ///
    /// Never fails: timeouts and unavailable facilities give an empty list.
    /// Querying and inspecting share one deadline; records inspected before
    /// it passes are kept.
    pub async fn fetch(
        &self,
        platform: &dyn Platform,
        inspector: &ArtifactInspector,
    ) -> Vec<ArtifactRecord> {
        let inspector = inspector.clone();
        self.fetch_with(platform, move |path| {
            inspector
                .inspect_path(path, DiscoverySource::MetadataSearch)
                .ok()
        })
        .await
    }

    async fn fetch_with<F>(&self, platform: &dyn Platform, inspect: F) -> Vec<ArtifactRecord>
    where
        F: Fn(&Path) -> Option<ArtifactRecord> + Send + 'static,
    {
        let deadline = Instant::now() + self.timeout;

        let paths = match self.collect_paths(platform, deadline).await {
            Ok(paths) => paths,
            Err(e @ MetadataError::Timeout(_)) => {
                tracing::warn!(event = "metadata_search_timeout", error = %e);
                return Vec::new();
            }
            Err(e) => {
                tracing::debug!(event = "metadata_search_skipped", error = %e);
                return Vec::new();
            }
        };

        let matched = paths.len();
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, inspected) = mpsc::channel();
        let worker = {
            let stop = Arc::clone(&stop);
            tokio::task::spawn_blocking(move || {
                for path in &paths {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Some(record) = inspect(path.as_path()) {
                        if tx.send(record).is_err() {
                            break;
                        }
                    }
                }
            })
        };

        match tokio::time::timeout_at(deadline, worker).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(event = "metadata_inspect_failed", error = %e),
            Err(_) => {
                stop.store(true, Ordering::SeqCst);
                tracing::warn!(
                    event = "metadata_inspect_timeout",
                    timeout_ms = self.timeout.as_millis() as u64
                );
            }
        }

        let records: Vec<ArtifactRecord> = inspected.try_iter().collect();
        tracing::debug!(
            event = "metadata_search_done",
            matched,
            records = records.len()
        );
        records
    }

    /// Raw paths reported by the facility. The query is cancelled before
    /// this returns, on every path.
    pub async fn fetch_paths(&self, platform: &dyn Platform) -> Result<Vec<PathBuf>, MetadataError> {
        self.collect_paths(platform, Instant::now() + self.timeout)
            .await
    }

    async fn collect_paths(
        &self,
        platform: &dyn Platform,
        deadline: Instant,
    ) -> Result<Vec<PathBuf>, MetadataError> {
        if !self.enabled {
            return Err(MetadataError::Unavailable("disabled by config".to_string()));
        }

        let mut guard = QueryGuard(platform.start_metadata_query()?);
        let outcome =
            match tokio::time::timeout_at(deadline, poll_until_done(guard.0.as_mut())).await {
                Ok(outcome) => outcome,
                Err(_) => Err(MetadataError::Timeout(self.timeout)),
            };
        drop(guard);
        outcome
    }
}

async fn poll_until_done(query: &mut dyn MetadataQuery) -> Result<Vec<PathBuf>, MetadataError> {
    loop {
        if let Some(paths) = query.try_collect()? {
            return Ok(paths);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
