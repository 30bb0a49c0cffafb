//! appscout - executable discovery and ranked search for launchers.
//!
//! appscout walks the filesystem for application bundles and executables,
//! merges what it finds with the OS metadata search, and answers ranked name
//! queries against an immutable catalog snapshot.
//!
//! # Architecture
//!
//! - [`config`] - Configuration loading and management
//! - [`core`] - Records, catalog snapshots, ranked search, rebuild orchestration
//! - [`services`] - Discovery sources (filesystem walk, bundle inspection, metadata search)
//! - [`platform`] - Platform abstraction layer (Linux, macOS, Windows)
//! - [`cli`] - Command-line front end
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use appscout::{CatalogOrchestrator, Config};
//!
//! let platform: Arc<dyn appscout::Platform> = Arc::from(appscout::platform::current());
//! let config = Config::load_from(&Config::config_path(platform.as_ref()));
//! let orchestrator = CatalogOrchestrator::new(&config, platform);
//! orchestrator.refresh().await;
//! for record in orchestrator.search("xcode") {
//!     println!("{} {}", record.name, record.path.display());
//! }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod platform;
pub mod services;

mod error;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use core::{ArtifactRecord, Catalog, CatalogOrchestrator, RankedSearchEngine, SearchHit};
pub use error::{ScoutError, ScoutResult};
pub use platform::Platform;
