//! REST API response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::tools::ToolSpec;

/// Envelope around one tool call result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResponse {
    /// Unique id for correlating with the log stream
    pub request_id: String,

    pub tool: String,

    /// Tool output as returned by the tool, success or not
    pub result: Value,
}

impl ToolCallResponse {
    pub fn new(tool: &str, result: Value) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            tool: tool.to_string(),
            result,
        }
    }

    /// Tools report failure in-band with `"success": false`.
    pub fn succeeded(&self) -> bool {
        self.result.get("success").and_then(Value::as_bool).unwrap_or(true)
    }
}

/// `GET /api/tools` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolListResponse {
    pub tools: Vec<ToolSpec>,
    pub supported_column_types: Vec<&'static str>,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "requestId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_envelope() {
        let response = ToolCallResponse::new("search_board_items", json!({"success": true, "matches_found": 0}));
        assert!(response.succeeded());
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["tool"], "search_board_items");
        assert_eq!(body["requestId"].as_str().unwrap().len(), 36);

        let failed = ToolCallResponse::new("create_board_item", json!({"success": false, "errors": []}));
        assert!(!failed.succeeded());
        // resources carry no success flag
        assert!(ToolCallResponse::new("schema", json!({"columns": []})).succeeded());
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("Unknown resource");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "Unknown resource");
    }
}
