//! CLI commands for appscout.
//!
//! Every command builds a fresh catalog, then answers from it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::core::{ArtifactRecord, CatalogOrchestrator};
use crate::platform::{self, Platform};

#[derive(Parser)]
#[command(name = "appscout")]
#[command(about = "Find and launch installed applications and executables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank catalog entries against a query
    Search {
        query: String,

        /// Maximum number of results (default from config)
        #[arg(long, short)]
        limit: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the whole catalog
    List {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Launch the best match for a query
    Launch { query: String },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration back to the config file
        #[arg(long)]
        write: bool,
    },
}

/// Run the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let platform: Arc<dyn Platform> = Arc::from(platform::current());
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| Config::config_path(platform.as_ref()));
    let config = Config::load_from(&config_path);

    if let Commands::Config { write } = cli.command {
        if write {
            config
                .save_to(&config_path)
                .with_context(|| format!("failed to write {}", config_path.display()))?;
        }
        let rendered = toml::to_string_pretty(&config).context("failed to render config")?;
        println!("# {}", config_path.display());
        print!("{}", rendered);
        return Ok(());
    }

    let orchestrator = CatalogOrchestrator::new(&config, platform);
    orchestrator.refresh().await;

    match cli.command {
        Commands::Search { query, limit, json } => {
            let limit = limit.unwrap_or(config.search.max_results);
            let results = orchestrator.search_limited(&query, limit);
            print_records(results.iter().map(|r| r.as_ref()), json)?;
        }
        Commands::List { json } => {
            let snapshot = orchestrator.snapshot();
            print_records(snapshot.iter().map(|r| r.as_ref()), json)?;
        }
        Commands::Launch { query } => {
            let best = orchestrator
                .search_limited(&query, 1)
                .into_iter()
                .next()
                .with_context(|| format!("no application matches '{}'", query))?;
            orchestrator.launch(&best)?;
            println!("Launched {} ({})", best.name, best.path.display());
        }
        Commands::Config { .. } => unreachable!("handled before the catalog is built"),
    }

    Ok(())
}

fn print_records<'a>(
    records: impl Iterator<Item = &'a ArtifactRecord>,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        let records: Vec<&ArtifactRecord> = records.collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for record in records {
        println!(
            "{}\t{}\t{}",
            record.name,
            record.version.as_deref().unwrap_or("-"),
            record.path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::parse_from(["appscout", "search", "xcode", "--limit", "3", "--json"]);
        match cli.command {
            Commands::Search { query, limit, json } => {
                assert_eq!(query, "xcode");
                assert_eq!(limit, Some(3));
                assert!(json);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_parse_global_config() {
        let cli = Cli::parse_from(["appscout", "list", "--config", "/tmp/x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));
        assert!(matches!(cli.command, Commands::List { json: false }));
    }

    #[test]
    fn test_parse_config_write() {
        let cli = Cli::parse_from(["appscout", "config", "--write"]);
        assert!(matches!(cli.command, Commands::Config { write: true }));
    }
}
