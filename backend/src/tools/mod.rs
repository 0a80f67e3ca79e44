//! Board tools and resources.
//!
//! [`BoardTools`] is the operation surface exposed over HTTP and the CLI.
//! Every call returns JSON: failures come back as
//! `{"success": false, ...}` instead of errors, so the transport can always
//! answer with a well-formed body.
//!
//! - [`items`] - Item reads and mutations, column validation
//! - [`resources`] - Cached read-only board resources

pub mod items;
pub mod resources;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::cache::{LocationCache, ResourceCache};
use crate::client::{BoardApi, MondayClient};
use crate::config::Config;
use crate::error::SchemaError;
use crate::handlers::HandlerRegistry;
use crate::schema::{BoardSchema, ColumnFailure};
use crate::validation::NominatimGeocoder;

/// Name and argument description of one tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: &'static [&'static str],
}

pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "get_board_data",
        description: "Get all data from the board including columns and items",
        parameters: &[],
    },
    ToolSpec {
        name: "search_board_items",
        description: "Search for items in the board by field and value",
        parameters: &["field", "value"],
    },
    ToolSpec {
        name: "delete_board_items",
        description: "Delete items from the board by field and value match",
        parameters: &["field", "value"],
    },
    ToolSpec {
        name: "create_board_item",
        description: "Create a new item in the board",
        parameters: &["item_name", "column_values", "group_id?"],
    },
    ToolSpec {
        name: "update_board_item",
        description: "Update an existing item in the board",
        parameters: &["item_id", "column_values"],
    },
    ToolSpec {
        name: "validate_column_value",
        description: "Check a value against a column without writing it",
        parameters: &["column", "value"],
    },
    ToolSpec {
        name: "get_column_format",
        description: "Get the type, settings and validation rules of a column",
        parameters: &["column"],
    },
];

pub struct BoardTools {
    api: Arc<dyn BoardApi>,
    schema: Arc<BoardSchema>,
    resources: ResourceCache,
}

impl BoardTools {
    pub fn new(api: Arc<dyn BoardApi>, schema: Arc<BoardSchema>, resources: ResourceCache) -> Self {
        Self { api, schema, resources }
    }

    /// Wire the HTTP client, geocoder, registry and schema from `config`.
    pub fn from_config(config: &Config) -> Self {
        let client = Arc::new(
            MondayClient::new(config.api_key.clone())
                .with_api_url(&config.api_url)
                .with_timeout(config.api_timeout),
        );
        let geocoder = Arc::new(NominatimGeocoder::new(
            config.geocoder_url.clone(),
            config.geocoder_user_agent.clone(),
            config.geocode_timeout,
        ));
        let registry = Arc::new(HandlerRegistry::with_location_cache(
            geocoder,
            Arc::new(LocationCache::with_capacity(config.location_cache_capacity)),
        ));
        let schema = Arc::new(
            BoardSchema::new(config.board_id.clone(), client.clone(), registry).with_ttl(config.schema_ttl),
        );
        Self::new(client, schema, ResourceCache::new(config.schema_ttl))
    }

    pub fn schema(&self) -> &Arc<BoardSchema> {
        &self.schema
    }

    pub fn list_tools(&self) -> &'static [ToolSpec] {
        TOOLS
    }

    /// Dispatch a tool by name with a JSON object of arguments.
    pub async fn call(&self, name: &str, args: &Value) -> Value {
        info!(tool = name, "tool call");
        let outcome = match name {
            "get_board_data" => Ok(self.get_board_data().await),
            "search_board_items" => match (str_arg(args, "field"), str_arg(args, "value")) {
                (Ok(field), Ok(value)) => Ok(self.search_board_items(&field, &value).await),
                (Err(e), _) | (_, Err(e)) => Err(e),
            },
            "delete_board_items" => match (str_arg(args, "field"), str_arg(args, "value")) {
                (Ok(field), Ok(value)) => Ok(self.delete_board_items(&field, &value).await),
                (Err(e), _) | (_, Err(e)) => Err(e),
            },
            "create_board_item" => match (str_arg(args, "item_name"), map_arg(args, "column_values")) {
                (Ok(item_name), Ok(values)) => {
                    let group_id = args.get("group_id").and_then(Value::as_str).filter(|g| !g.is_empty());
                    Ok(self.create_board_item(&item_name, &values, group_id).await)
                }
                (Err(e), _) | (_, Err(e)) => Err(e),
            },
            "update_board_item" => match (str_arg(args, "item_id"), map_arg(args, "column_values")) {
                (Ok(item_id), Ok(values)) => Ok(self.update_board_item(&item_id, &values).await),
                (Err(e), _) | (_, Err(e)) => Err(e),
            },
            "validate_column_value" => match str_arg(args, "column") {
                Ok(column) => {
                    let value = args.get("value").cloned().unwrap_or(Value::Null);
                    Ok(self.validate_column_value(&column, &value).await)
                }
                Err(e) => Err(e),
            },
            "get_column_format" => match str_arg(args, "column") {
                Ok(column) => Ok(self.get_column_format(&column).await),
                Err(e) => Err(e),
            },
            _ => Err(format!("Unknown tool: {}", name)),
        };

        outcome.unwrap_or_else(|message| {
            warn!(tool = name, %message, "tool call rejected");
            json!({ "success": false, "message": message })
        })
    }
}

// =============================================================================
// Argument and response helpers
// =============================================================================

/// String argument; numbers are accepted and printed (item ids are often numeric).
fn str_arg(args: &Value, key: &str) -> Result<String, String> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(format!("Missing argument: {}", key)),
    }
}

/// Object argument; a JSON string holding an object is decoded.
fn map_arg(args: &Value, key: &str) -> Result<Map<String, Value>, String> {
    match args.get(key) {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(format!("Argument {} must be a JSON object", key)),
        },
        None | Some(Value::Null) => Ok(Map::new()),
        Some(_) => Err(format!("Argument {} must be a JSON object", key)),
    }
}

/// JSON shape of one schema failure.
pub(crate) fn error_json(column: Option<&str>, error: &SchemaError) -> Value {
    let mut body = json!({
        "code": error.code(),
        "message": error.to_string(),
    });
    if let Some(column) = column {
        body["column"] = json!(column);
    }
    if let SchemaError::InvalidValue { result, .. } = error {
        if let Some(message) = &result.message {
            body["message"] = json!(message);
        }
        if let Some(suggestions) = &result.suggested_values {
            body["suggested_values"] = json!(suggestions);
        }
    }
    body
}

pub(crate) fn failure(error: &SchemaError) -> Value {
    json!({ "success": false, "errors": [error_json(None, error)] })
}

pub(crate) fn column_failures(failures: &[ColumnFailure]) -> Value {
    let errors: Vec<Value> = failures
        .iter()
        .map(|f| error_json(Some(&f.column), &f.error))
        .collect();
    json!({ "success": false, "errors": errors })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::client::testing::StubBoardApi;
    use crate::handlers::testing::StubGeocoder;
    use crate::handlers::HandlerRegistry;
    use crate::schema::testing::sample_board;

    pub fn sample_items() -> Vec<Value> {
        vec![
            json!({"id": "11", "name": "Acme", "column_values": [
                {"id": "status", "text": "Done", "value": "{\"index\":1}", "type": "status"},
                {"id": "rating_1", "text": "", "value": null, "type": "rating"}
            ]}),
            json!({"id": "12", "name": "Globex", "column_values": [
                {"id": "status", "text": "Working on it", "value": "{\"index\":2}", "type": "status"}
            ]}),
        ]
    }

    pub fn tools_with(api: Arc<StubBoardApi>) -> BoardTools {
        let registry = Arc::new(HandlerRegistry::new(Arc::new(StubGeocoder::found())));
        let schema = Arc::new(BoardSchema::new(Some("123".into()), api.clone(), registry));
        BoardTools::new(api, schema, ResourceCache::default())
    }

    pub fn stub_api() -> Arc<StubBoardApi> {
        Arc::new(StubBoardApi::new(sample_board()).with_items(sample_items()))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{stub_api, tools_with};
    use super::*;
    use crate::models::ValidationResult;

    #[tokio::test]
    async fn test_unknown_tool_and_missing_arguments() {
        let tools = tools_with(stub_api());
        let out = tools.call("drop_board", &json!({})).await;
        assert_eq!(out, json!({"success": false, "message": "Unknown tool: drop_board"}));

        let out = tools.call("search_board_items", &json!({"field": "status"})).await;
        assert_eq!(out["message"], "Missing argument: value");
    }

    #[test]
    fn test_argument_coercion() {
        let args = json!({"item_id": 42, "column_values": "{\"status\": \"Done\"}"});
        assert_eq!(str_arg(&args, "item_id").unwrap(), "42");
        assert_eq!(map_arg(&args, "column_values").unwrap()["status"], "Done");
        assert!(map_arg(&json!({"column_values": [1]}), "column_values").is_err());
        assert!(map_arg(&json!({}), "column_values").unwrap().is_empty());
    }

    #[test]
    fn test_error_json_keeps_suggestions() {
        let error = SchemaError::InvalidValue {
            column_id: "status".into(),
            result: ValidationResult::invalid("Invalid value. Did you mean one of these? Done")
                .with_suggestions(vec!["Done".into()]),
        };
        let body = error_json(Some("Status"), &error);
        assert_eq!(body["code"], "invalid_value");
        assert_eq!(body["column"], "Status");
        assert_eq!(body["message"], "Invalid value. Did you mean one of these? Done");
        assert_eq!(body["suggested_values"], json!(["Done"]));
    }

    #[tokio::test]
    async fn test_from_config_without_board() {
        let tools = BoardTools::from_config(&Config::default());
        let out = tools.call("get_board_data", &json!({})).await;
        assert_eq!(out["success"], false);
        assert_eq!(out["errors"][0]["code"], "configuration_error");
        assert_eq!(tools.schema().registry().location_cache().capacity(), 1000);
    }

    #[test]
    fn test_tool_list() {
        let names: Vec<&str> = TOOLS.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"create_board_item"));
    }
}
