//! School detail tool implementation
//!
//! Implements the `school(cue)` MCP tool

use super::TOOL_TIMEOUT;
use crate::cli::SchoolArgs;
use crate::error::AppError;
use crate::mcp::{McpResponse, ToolResult};
use crate::records::Cue;
use crate::search::SearchEngine;
use serde_json::Value;
use tokio::time::timeout;
use tracing::info;

/// Handle school tool call
pub async fn handle_school(id: Option<Value>, args: Value, engine: &SearchEngine) -> McpResponse {
    match timeout(TOOL_TIMEOUT, handle_school_impl(args, engine)).await {
        Ok(Ok(content)) => McpResponse::tool_result(id, content),
        Ok(Err(e)) => McpResponse::error(id, e.error_code(), &e.message()),
        Err(_) => McpResponse::error(id, "timeout", "School request exceeded 120 second timeout"),
    }
}

async fn handle_school_impl(args: Value, engine: &SearchEngine) -> Result<ToolResult, AppError> {
    let school_args: SchoolArgs = serde_json::from_value(args)
        .map_err(|e| AppError::InvalidInput(format!("Invalid arguments: {}", e)))?;

    execute_school(school_args, engine).await
}

/// Execute school tool (shared implementation for MCP and CLI)
pub async fn execute_school(args: SchoolArgs, engine: &SearchEngine) -> Result<ToolResult, AppError> {
    let cue = Cue::parse(args.cue.trim()).ok_or_else(|| {
        AppError::InvalidInput(format!("CUE must be exactly 8 digits, got '{}'", args.cue.trim()))
    })?;

    let record = engine.get_by_cue(cue).await?;
    info!("School detail served for CUE {}", cue);

    Ok(ToolResult::text(record.to_markdown()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Table};
    use serde_json::json;
    use std::sync::Arc;

    fn engine() -> SearchEngine {
        let store = MemoryStore::new()
            .with_rows(
                Table::Establecimientos,
                vec![json!({"id": "1", "cue": 10234567, "nombre": "Escuela Técnica N° 4"})],
            )
            .with_rows(
                Table::ProgramasPorCue,
                vec![json!({"cue": 10234567, "programa": "Conectar Igualdad"})],
            );
        SearchEngine::new(Arc::new(store)).unwrap()
    }

    #[tokio::test]
    async fn test_school_detail() {
        let result = execute_school(SchoolArgs { cue: "10234567".into() }, &engine())
            .await
            .unwrap();
        let text = &result.content[0].text;
        assert!(text.starts_with("# Escuela Técnica N° 4"));
        assert!(text.contains("Conectar Igualdad"));
    }

    #[tokio::test]
    async fn test_malformed_cue() {
        let err = execute_school(SchoolArgs { cue: "1234".into() }, &engine())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid_input");
    }

    #[tokio::test]
    async fn test_unknown_cue() {
        let resp = handle_school(Some(json!(7)), json!({"cue": "99999999"}), &engine()).await;
        assert_eq!(resp.error.expect("error present").code, "not_found");
    }
}
