//! Statistics tool implementation
//!
//! Implements the `stats()` MCP tool

use super::TOOL_TIMEOUT;
use crate::cli::StatsArgs;
use crate::error::AppError;
use crate::mcp::{McpResponse, ToolResult};
use crate::search::SearchEngine;
use crate::stats::load_stats;
use serde_json::Value;
use tokio::time::timeout;

/// Handle stats tool call
pub async fn handle_stats(id: Option<Value>, args: Value, engine: &SearchEngine) -> McpResponse {
    // Clients may send null or omit arguments entirely
    let args = if args.is_null() { Value::Object(Default::default()) } else { args };

    let call = async {
        let stats_args: StatsArgs = serde_json::from_value(args)
            .map_err(|e| AppError::InvalidInput(format!("Invalid arguments: {}", e)))?;
        execute_stats(stats_args, engine).await
    };

    match timeout(TOOL_TIMEOUT, call).await {
        Ok(Ok(content)) => McpResponse::tool_result(id, content),
        Ok(Err(e)) => McpResponse::error(id, e.error_code(), &e.message()),
        Err(_) => McpResponse::error(id, "timeout", "Stats request exceeded 120 second timeout"),
    }
}

/// Execute stats tool (shared implementation for MCP and CLI)
pub async fn execute_stats(_args: StatsArgs, engine: &SearchEngine) -> Result<ToolResult, AppError> {
    let stats = load_stats(engine.store()).await?;
    Ok(ToolResult::text(stats.to_markdown()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Table};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stats_tool_accepts_null_arguments() {
        let store = MemoryStore::new().with_rows(
            Table::Establecimientos,
            vec![json!({"id": "1", "cue": 10000001, "nombre": "A", "distrito": "Ensenada"})],
        );
        let engine = SearchEngine::new(Arc::new(store)).unwrap();

        let resp = handle_stats(Some(json!(3)), Value::Null, &engine).await;
        assert!(resp.error.is_none());
        let text = resp.result.expect("result")["content"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        assert!(text.contains("- Ensenada: 1"));
    }
}
