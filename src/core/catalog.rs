//! Immutable catalog snapshots and the merge that builds them.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::core::artifact::{ArtifactRecord, IdentityKey};

/// An identity-unique, name-sorted set of artifacts.
///
/// Never mutated after construction; a rebuild produces a new one.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<Arc<ArtifactRecord>>,
    index: HashMap<IdentityKey, usize>,
    generation: u64,
    build_time: Duration,
}

impl Catalog {
    /// The catalog readers see before the first rebuild.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Arc<ArtifactRecord>] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ArtifactRecord>> {
        self.entries.iter()
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&Arc<ArtifactRecord>> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Rebuild counter; 0 for the initial empty catalog.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn build_time(&self) -> Duration {
        self.build_time
    }

    pub(crate) fn stamped(mut self, generation: u64, build_time: Duration) -> Self {
        self.generation = generation;
        self.build_time = build_time;
        self
    }
}

/// Counts from one merge, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub walker_kept: usize,
    pub walker_discarded: usize,
    pub metadata_kept: usize,
    pub metadata_discarded: usize,
}

/// Merges the two discovery streams, first seen wins.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen_keys: HashSet<IdentityKey>,
    seen_paths: HashSet<PathBuf>,
    kept: Vec<ArtifactRecord>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` unless an artifact with the same identity-key or path
    /// is already present. Returns whether it was kept.
    pub fn offer(&mut self, record: ArtifactRecord) -> bool {
        let key = record.identity_key();
        if self.seen_keys.contains(&key) || self.seen_paths.contains(&record.path) {
            return false;
        }

        self.seen_keys.insert(key);
        self.seen_paths.insert(record.path.clone());
        self.kept.push(record);
        true
    }

    /// Build a catalog from walker records (authoritative, in discovery
    /// order) followed by metadata-search records.
    pub fn merge(
        walked: impl IntoIterator<Item = ArtifactRecord>,
        indexed: impl IntoIterator<Item = ArtifactRecord>,
    ) -> (Catalog, MergeStats) {
        let mut dedup = Self::new();
        let mut stats = MergeStats::default();

        for record in walked {
            if dedup.offer(record) {
                stats.walker_kept += 1;
            } else {
                stats.walker_discarded += 1;
            }
        }
        for record in indexed {
            if dedup.offer(record) {
                stats.metadata_kept += 1;
            } else {
                stats.metadata_discarded += 1;
            }
        }

        (dedup.finish(), stats)
    }

    /// Sort what was kept and freeze it.
    pub fn finish(self) -> Catalog {
        let mut entries = self.kept;
        entries.sort_by_cached_key(|record| (record.name.to_lowercase(), record.path.clone()));

        let entries: Vec<Arc<ArtifactRecord>> = entries.into_iter().map(Arc::new).collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, record)| (record.identity_key(), i))
            .collect();

        Catalog {
            entries,
            index,
            generation: 0,
            build_time: Duration::ZERO,
        }
    }
}
