//! CLI mode implementation
//!
//! Provides command-line interface for the school registry tools

use crate::config::{ConfigOverrides, ENV_API_KEY, ENV_STORE_URL};
use clap::{Parser, Subcommand};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// School registry search CLI
#[derive(Parser)]
#[command(name = "school-finder")]
#[command(about = "Search the school registry by name, CUE or predio", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output (no short flag to avoid conflicts)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Record store base URL
    #[arg(long, global = true, env = ENV_STORE_URL)]
    pub store_url: Option<String>,

    /// Record store API key
    #[arg(long, global = true, env = ENV_API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Serve lookups from a local JSON dump instead of the remote store
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Per-request store timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Store settings given on the command line or through the environment
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            store_url: self.store_url.clone(),
            api_key: self.api_key.clone(),
            timeout_secs: self.timeout,
            fixture: self.fixture.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search schools by name, CUE, predio or "<type> <number>"
    Search(SearchArgs),
    /// Show one school in detail
    School(SchoolArgs),
    /// Registry-wide statistics
    Stats(StatsArgs),
}

/// Search tool arguments
#[derive(Parser, JsonSchema, Deserialize, Serialize, Clone, Debug)]
pub struct SearchArgs {
    /// School name, 8-digit CUE, 6-digit predio or "<type> <number>"
    #[arg(short = 'q', long)]
    #[schemars(description = "School name, 8-digit CUE, 6-digit predio or shorthand such as 'tecnica 4'")]
    pub query: String,

    /// Maximum number of results (default: all matches)
    #[arg(short = 'l', long)]
    #[schemars(description = "Maximum number of results (default: all matches)")]
    pub limit: Option<usize>,
}

/// School detail arguments
#[derive(Parser, JsonSchema, Deserialize, Serialize, Clone, Debug)]
pub struct SchoolArgs {
    /// 8-digit CUE
    #[arg(short = 'c', long)]
    #[schemars(description = "8-digit CUE (Clave Única de Establecimiento)")]
    pub cue: String,
}

/// Statistics takes no arguments
#[derive(Parser, JsonSchema, Deserialize, Serialize, Clone, Debug, Default)]
pub struct StatsArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_command() {
        let cli = Cli::try_parse_from(["school-finder", "search", "-q", "tecnica 4", "-l", "5"]).unwrap();
        match cli.command {
            Some(Commands::Search(args)) => {
                assert_eq!(args.query, "tecnica 4");
                assert_eq!(args.limit, Some(5));
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "school-finder",
            "school",
            "--cue",
            "10234567",
            "--fixture",
            "registry.json",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.fixture, Some(PathBuf::from("registry.json")));

        let overrides = cli.overrides();
        assert_eq!(overrides.fixture, Some(PathBuf::from("registry.json")));
    }

    #[test]
    fn test_search_requires_query() {
        assert!(Cli::try_parse_from(["school-finder", "search"]).is_err());
    }

    #[test]
    fn test_stats_args_from_empty_object() {
        let args: StatsArgs = serde_json::from_value(serde_json::json!({})).unwrap();
        let _ = args;
    }
}
