#[cfg(test)]
mod tests {
    fn schema_of(name: &str) -> serde_json::Value {
        let tools = crate::mcp::build_tools_array();
        tools
            .as_array()
            .expect("tools array")
            .iter()
            .find(|t| t.get("name").and_then(|n| n.as_str()) == Some(name))
            .and_then(|t| t.get("inputSchema"))
            .cloned()
            .unwrap_or_else(|| panic!("{} tool present", name))
    }

    fn required(schema: &serde_json::Value) -> Vec<String> {
        schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|r| {
                r.iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn search_schema_requires_query_only() {
        let schema = schema_of("search");
        assert_eq!(required(&schema), vec!["query".to_string()]);
        assert!(schema["properties"].get("limit").is_some());
    }

    #[test]
    fn school_schema_requires_cue() {
        let schema = schema_of("school");
        assert_eq!(required(&schema), vec!["cue".to_string()]);
        let description = schema["properties"]["cue"]["description"]
            .as_str()
            .unwrap_or_default();
        assert!(description.contains("8-digit"));
    }

    #[test]
    fn stats_schema_has_no_required_fields() {
        assert!(required(&schema_of("stats")).is_empty());
    }

    #[test]
    fn schemas_do_not_leak_cli_only_flags() {
        for name in ["search", "school", "stats"] {
            let text = serde_json::to_string(&schema_of(name)).unwrap();
            assert!(!text.contains("api_key"), "{} schema exposes api_key", name);
            assert!(!text.contains("fixture"), "{} schema exposes fixture", name);
        }
    }
}
