//! school-finder MCP Server & CLI (Rust)
//!
//! Dual-mode application:
//! - MCP Server Mode (default): Model Context Protocol server using stdio
//! - CLI Mode: Command-line utility for direct tool execution
//!
//! Implements three tools:
//! - `search(query, limit?)` - Find schools by name, CUE, predio or "<type> <number>"
//! - `school(cue)` - Full detail of one school
//! - `stats()` - Registry-wide statistics

mod cli;
mod config;
mod enrich;
mod error;
mod http;
mod mcp;
mod records;
mod search;
mod stats;
mod store;
mod tools;

#[cfg(test)]
mod tests_tool_schemas;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::{ConfigOverrides, StoreConfig};
use error::AppError;
use mcp::ToolResult;
use search::SearchEngine;
use std::future::Future;
use std::sync::Arc;
use store::{MemoryStore, PostgrestStore, RecordStore};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Detect mode: CLI if args present, MCP server otherwise
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        run_cli_mode().await
    } else {
        run_mcp_mode().await
    }
}

/// Build the search engine over the configured store
fn build_engine(config: &StoreConfig) -> Result<Arc<SearchEngine>> {
    let store: Arc<dyn RecordStore> = match &config.fixture {
        Some(path) => {
            info!("Using fixture {}", path.display());
            Arc::new(MemoryStore::load(path)?)
        }
        None => Arc::new(PostgrestStore::new(config).context(
            "Set SCHOOL_FINDER_STORE_URL, pass --store-url or --fixture, or add store_url to the config file",
        )?),
    };

    Ok(Arc::new(SearchEngine::new(store)?))
}

/// Run in CLI mode
async fn run_cli_mode() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity flags
    let log_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr) // Log to stderr to keep stdout clean
        .init();

    let overrides = cli.overrides();
    let Some(command) = cli.command else {
        eprintln!("Error: No command specified. Use --help for usage information.");
        std::process::exit(1);
    };

    let result = match prepare_engine(overrides) {
        Ok(engine) => execute_command(command, &engine).await,
        Err(e) => Err(e),
    };

    // Handle result and exit with appropriate code
    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(get_exit_code(&e));
        }
    }
}

fn prepare_engine(overrides: ConfigOverrides) -> Result<Arc<SearchEngine>, AppError> {
    config::resolve(overrides)
        .and_then(|config| build_engine(&config))
        .map_err(|e| AppError::Config(format!("{:#}", e)))
}

async fn execute_command(command: Commands, engine: &SearchEngine) -> Result<String, AppError> {
    match command {
        Commands::Search(args) => with_timeout(tools::search::execute_search(args, engine)).await,
        Commands::School(args) => with_timeout(tools::school::execute_school(args, engine)).await,
        Commands::Stats(args) => with_timeout(tools::stats::execute_stats(args, engine)).await,
    }
}

/// Run a tool under the shared time budget and extract its markdown text
async fn with_timeout<F>(call: F) -> Result<String, AppError>
where
    F: Future<Output = Result<ToolResult, AppError>>,
{
    match tokio::time::timeout(tools::TOOL_TIMEOUT, call).await {
        Ok(Ok(tool_result)) => Ok(tool_result.into_text()),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(AppError::Timeout(
            "Request exceeded 120 second timeout".to_string(),
        )),
    }
}

/// Map AppError to exit code
fn get_exit_code(err: &AppError) -> i32 {
    match err {
        AppError::EmptyQuery | AppError::InvalidInput(_) | AppError::Config(_) => 1,
        AppError::StoreUnavailable(_) => 2,
        AppError::NotFound(_) => 3,
        AppError::Timeout(_) => 4,
        AppError::Enrichment(_) | AppError::Internal(_) => 5,
    }
}

/// Run in MCP server mode
async fn run_mcp_mode() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    info!("Starting school-finder MCP Server");

    let engine = match config::resolve(ConfigOverrides::from_env()).and_then(|c| build_engine(&c)) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Cannot start: {:#}", e);
            return Err(e);
        }
    };

    mcp::handle_stdio(engine).await?;

    Ok(())
}
