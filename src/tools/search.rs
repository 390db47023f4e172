//! Search tool implementation
//!
//! Implements the `search(query, limit?)` MCP tool

use super::TOOL_TIMEOUT;
use crate::cli::SearchArgs;
use crate::error::AppError;
use crate::mcp::{McpResponse, ToolResult};
use crate::records::SchoolRecord;
use crate::search::SearchEngine;
use serde_json::Value;
use tokio::time::timeout;
use tracing::info;

/// Handle search tool call
pub async fn handle_search(id: Option<Value>, args: Value, engine: &SearchEngine) -> McpResponse {
    match timeout(TOOL_TIMEOUT, handle_search_impl(args, engine)).await {
        Ok(Ok(content)) => McpResponse::tool_result(id, content),
        Ok(Err(e)) => McpResponse::error(id, e.error_code(), &e.message()),
        Err(_) => McpResponse::error(id, "timeout", "Search request exceeded 120 second timeout"),
    }
}

async fn handle_search_impl(args: Value, engine: &SearchEngine) -> Result<ToolResult, AppError> {
    let search_args: SearchArgs = serde_json::from_value(args)
        .map_err(|e| AppError::InvalidInput(format!("Invalid arguments: {}", e)))?;

    execute_search(search_args, engine).await
}

/// Execute search tool (shared implementation for MCP and CLI)
pub async fn execute_search(args: SearchArgs, engine: &SearchEngine) -> Result<ToolResult, AppError> {
    if args.limit == Some(0) {
        return Err(AppError::InvalidInput("limit must be at least 1".to_string()));
    }

    let records = engine.search_limited(&args.query, args.limit).await?;
    info!("Search '{}' produced {} results", args.query.trim(), records.len());

    Ok(ToolResult::text(format_results(args.query.trim(), &records)))
}

/// Render a result list as markdown
pub fn format_results(query: &str, records: &[SchoolRecord]) -> String {
    let mut md = format!("# Search results for \"{}\"\n\n", query);

    if records.is_empty() {
        md.push_str("No schools found.\n");
        return md;
    }

    let noun = if records.len() == 1 { "school" } else { "schools" };
    md.push_str(&format!("Found {} {}.\n\n", records.len(), noun));

    for (i, record) in records.iter().enumerate() {
        md.push_str(&format!("{}. {}\n", i + 1, record.summary_line()));
        if !record.shared_predio_schools.is_empty() {
            let siblings: Vec<String> = record
                .shared_predio_schools
                .iter()
                .map(|s| format!("{} (CUE {})", s.nombre, s.cue))
                .collect();
            md.push_str(&format!("   - Shares predio with: {}\n", siblings.join(", ")));
        }
        if !record.programas_educativos.is_empty() {
            let programs: Vec<&str> = record
                .programas_educativos
                .iter()
                .map(|p| p.programa.as_str())
                .collect();
            md.push_str(&format!("   - Programs: {}\n", programs.join(", ")));
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Table};
    use serde_json::json;
    use std::sync::Arc;

    fn engine() -> SearchEngine {
        let store = MemoryStore::new().with_rows(
            Table::Establecimientos,
            vec![
                json!({"id": "1", "cue": 10234567, "predio": 900123, "nombre": "EP N°4", "distrito": "La Plata"}),
                json!({"id": "2", "cue": 10234999, "predio": 900123, "nombre": "EP N°14"}),
            ],
        );
        SearchEngine::new(Arc::new(store)).unwrap()
    }

    #[tokio::test]
    async fn test_search_args_parsing() {
        let parsed: SearchArgs = serde_json::from_value(json!({"query": "tecnica 4"})).unwrap();
        assert_eq!(parsed.query, "tecnica 4");
        assert_eq!(parsed.limit, None);
    }

    #[tokio::test]
    async fn test_execute_search_markdown() {
        let result = execute_search(
            SearchArgs {
                query: " 4 ".into(),
                limit: None,
            },
            &engine(),
        )
        .await
        .unwrap();

        let text = &result.content[0].text;
        assert!(text.starts_with("# Search results for \"4\""));
        assert!(text.contains("Found 1 school."));
        assert!(text.contains("EP N°4"));
        assert!(text.contains("Shares predio with: EP N°14 (CUE 10234999)"));
        assert!(!text.contains("1. **EP N°14**"));
    }

    #[tokio::test]
    async fn test_empty_query_message() {
        let err = execute_search(
            SearchArgs {
                query: "  ".into(),
                limit: None,
            },
            &engine(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.message(), "Invalid input: Please enter a search term");
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let err = execute_search(
            SearchArgs {
                query: "EP".into(),
                limit: Some(0),
            },
            &engine(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "invalid_input");
    }

    #[tokio::test]
    async fn test_handle_search_invalid_arguments() {
        let resp = handle_search(Some(json!(1)), json!({"limit": 3}), &engine()).await;
        let error = resp.error.expect("error present");
        assert_eq!(error.code, "invalid_input");
    }

    #[test]
    fn test_no_results() {
        assert!(format_results("xyz", &[]).contains("No schools found."));
    }
}
