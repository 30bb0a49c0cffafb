//! Core engine module - platform-agnostic catalog logic.
//!
//! - Artifact records and identity rules
//! - Catalog snapshots and the deduplicating merge
//! - Ranked search
//! - Rebuild orchestration

pub mod artifact;
pub mod catalog;
pub mod orchestrator;
pub mod search;

pub use artifact::{ArtifactKind, ArtifactRecord, DiscoverySource, IdentityKey};
pub use catalog::{Catalog, Deduplicator, MergeStats};
pub use orchestrator::{CatalogOrchestrator, RebuildState};
pub use search::{MatchTier, RankedSearchEngine, SearchHit};
