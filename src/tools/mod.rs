//! MCP tools implementation
//!
//! Each tool has an MCP handler (`handle_*`) and a shared `execute_*`
//! implementation that the CLI calls directly.

pub mod school;
pub mod search;
pub mod stats;

use std::time::Duration;

/// Total time budget for one tool call
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(120);
