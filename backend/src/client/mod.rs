//! Board API client.
//!
//! Talks GraphQL to the monday.com API. [`BoardApi`] is the seam the tools
//! use; [`MondayClient`] is the HTTP implementation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use boardsync::client::{BoardApi, MondayClient};
//!
//! let client = MondayClient::new(Some(api_key)).with_timeout(Duration::from_secs(10));
//! let groups = client.fetch_groups("123456").await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::schema::SchemaProvider;

pub const DEFAULT_API_URL: &str = "https://api.monday.com/v2";

/// Items fetched per page by [`BoardApi::fetch_items`].
pub const DEFAULT_ITEM_LIMIT: u32 = 100;

// =============================================================================
// GraphQL documents
// =============================================================================

const BOARD_SCHEMA_QUERY: &str = r#"
query ($boardIds: [ID!]) {
  boards(ids: $boardIds) {
    name
    board_folder_id
    board_kind
    columns { id title type settings_str width archived description }
    groups { id title color position }
    tags { id name color }
    owner { id name }
    permissions
    state
    workspace_id
  }
}"#;

const BOARD_METADATA_QUERY: &str = r#"
query ($boardIds: [ID!]) {
  boards(ids: $boardIds) {
    name
    board_folder_id
    board_kind
    description
    state
    workspace { id name kind }
    groups { id title color position }
    tags { id name color }
    subscribers { id name }
    owner { id name email }
    updates { id body created_at creator { id name } }
    views { id name type settings_str }
    permissions
  }
}"#;

const COLUMN_TYPES_QUERY: &str = r#"
query ($boardIds: [ID!]) {
  column_types: boards(ids: $boardIds) {
    columns { id title type settings_str width archived description }
    board_kind
    permissions
    state
  }
}"#;

const ITEMS_QUERY: &str = r#"
query ($boardIds: [ID!], $limit: Int!) {
  boards(ids: $boardIds) {
    items_page(limit: $limit) {
      items { id name group { id title } column_values { id text value type } }
    }
  }
}"#;

const ITEMS_BY_COLUMN_VALUE_QUERY: &str = r#"
query ($boardId: ID!, $columns: [ItemsPageByColumnValuesQuery!]) {
  items_page_by_column_values(board_id: $boardId, limit: 100, columns: $columns) {
    items { id name column_values { id text value type } }
  }
}"#;

const GROUPS_QUERY: &str = r#"
query ($boardIds: [ID!]) {
  boards(ids: $boardIds) { groups { id title color position } }
}"#;

const CREATE_ITEM_MUTATION: &str = r#"
mutation ($boardId: ID!, $groupId: String, $itemName: String!, $columnValues: JSON) {
  create_item(board_id: $boardId, group_id: $groupId, item_name: $itemName, column_values: $columnValues) {
    id
    name
  }
}"#;

const CHANGE_VALUES_MUTATION: &str = r#"
mutation ($boardId: ID!, $itemId: ID!, $columnValues: JSON!) {
  change_multiple_column_values(board_id: $boardId, item_id: $itemId, column_values: $columnValues) {
    id
    name
  }
}"#;

const DELETE_ITEM_MUTATION: &str = r#"
mutation ($itemId: ID!) {
  delete_item(item_id: $itemId) { id }
}"#;

// =============================================================================
// Trait
// =============================================================================

/// Board reads and item mutations.
///
/// Item lists come back as the raw GraphQL item objects. Mutations return
/// the mutated item (`{id, name}`).
#[async_trait]
pub trait BoardApi: SchemaProvider {
    /// Full board object (workspace, views, updates, subscribers, ...).
    async fn fetch_board_metadata(&self, board_id: &str) -> ClientResult<Value>;

    /// Board columns with raw settings, plus board kind and state.
    async fn fetch_column_types(&self, board_id: &str) -> ClientResult<Value>;

    async fn fetch_items(&self, board_id: &str, limit: u32) -> ClientResult<Vec<Value>>;

    async fn fetch_items_by_column_value(&self, board_id: &str, column_id: &str, value: &str) -> ClientResult<Vec<Value>>;

    async fn fetch_groups(&self, board_id: &str) -> ClientResult<Vec<Value>>;

    /// `column_values` is the column id → wire value mapping.
    async fn create_item(
        &self,
        board_id: &str,
        group_id: &str,
        item_name: &str,
        column_values: &Map<String, Value>,
    ) -> ClientResult<Value>;

    async fn change_multiple_column_values(
        &self,
        board_id: &str,
        item_id: &str,
        column_values: &Map<String, Value>,
    ) -> ClientResult<Value>;

    async fn delete_item(&self, item_id: &str) -> ClientResult<Value>;
}

// =============================================================================
// HTTP client
// =============================================================================

#[derive(Clone)]
pub struct MondayClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    timeout: Duration,
}

impl MondayClient {
    /// Client for the public API. A missing key only fails when a request is made.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Run one GraphQL document and return its `data` object.
    pub async fn execute(&self, query: &str, variables: Value) -> ClientResult<Value> {
        let api_key = self.api_key.as_deref().ok_or(ClientError::MissingApiKey)?;

        debug!(url = %self.api_url, "sending GraphQL request");
        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", api_key)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|parsed| error_message(&parsed))
                .unwrap_or_else(|| format!("HTTP {}: {}", status, truncate(&body, 500)));
            warn!(%status, %message, "board API returned an error status");
            return Err(ClientError::Api(message));
        }

        let parsed: Value = serde_json::from_str(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        extract_data(parsed)
    }

    fn board_ids(board_id: &str) -> Value {
        json!({ "boardIds": [board_id] })
    }
}

/// Pull `data` out of a GraphQL response, turning `errors` into
/// [`ClientError::Api`].
fn extract_data(mut response: Value) -> ClientResult<Value> {
    if let Some(message) = error_message(&response) {
        return Err(ClientError::Api(message));
    }
    match response.get_mut("data").map(Value::take) {
        Some(data @ Value::Object(_)) => Ok(data),
        _ => Err(ClientError::InvalidResponse("response has no data object".into())),
    }
}

/// Error text of a GraphQL or REST-style error body.
fn error_message(body: &Value) -> Option<String> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array).filter(|e| !e.is_empty()) {
        let messages: Vec<String> = errors
            .iter()
            .map(|e| match e.get("message").and_then(Value::as_str) {
                Some(m) => m.to_string(),
                None => e.to_string(),
            })
            .collect();
        return Some(messages.join("; "));
    }
    body.get("error_message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// `data.<root>[0]`, or an invalid-response error naming the path.
fn first_board(data: &Value, root: &str) -> ClientResult<Value> {
    data.get(root)
        .and_then(Value::as_array)
        .and_then(|boards| boards.first())
        .cloned()
        .ok_or_else(|| ClientError::InvalidResponse(format!("response has no {}[0]", root)))
}

fn items_at(value: &Value, pointer: &str) -> Vec<Value> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// GraphQL `JSON` arguments travel as a serialized string.
fn json_argument(column_values: &Map<String, Value>) -> String {
    Value::Object(column_values.clone()).to_string()
}

#[async_trait]
impl SchemaProvider for MondayClient {
    async fn fetch_board_schema(&self, board_id: &str) -> ClientResult<Value> {
        self.execute(BOARD_SCHEMA_QUERY, Self::board_ids(board_id)).await
    }
}

#[async_trait]
impl BoardApi for MondayClient {
    async fn fetch_board_metadata(&self, board_id: &str) -> ClientResult<Value> {
        let data = self.execute(BOARD_METADATA_QUERY, Self::board_ids(board_id)).await?;
        first_board(&data, "boards")
    }

    async fn fetch_column_types(&self, board_id: &str) -> ClientResult<Value> {
        let data = self.execute(COLUMN_TYPES_QUERY, Self::board_ids(board_id)).await?;
        first_board(&data, "column_types")
    }

    async fn fetch_items(&self, board_id: &str, limit: u32) -> ClientResult<Vec<Value>> {
        let variables = json!({ "boardIds": [board_id], "limit": limit });
        let data = self.execute(ITEMS_QUERY, variables).await?;
        Ok(items_at(&data, "/boards/0/items_page/items"))
    }

    async fn fetch_items_by_column_value(&self, board_id: &str, column_id: &str, value: &str) -> ClientResult<Vec<Value>> {
        let variables = json!({
            "boardId": board_id,
            "columns": [{ "column_id": column_id, "column_values": [value] }],
        });
        let data = self.execute(ITEMS_BY_COLUMN_VALUE_QUERY, variables).await?;
        Ok(items_at(&data, "/items_page_by_column_values/items"))
    }

    async fn fetch_groups(&self, board_id: &str) -> ClientResult<Vec<Value>> {
        let data = self.execute(GROUPS_QUERY, Self::board_ids(board_id)).await?;
        Ok(items_at(&data, "/boards/0/groups"))
    }

    async fn create_item(
        &self,
        board_id: &str,
        group_id: &str,
        item_name: &str,
        column_values: &Map<String, Value>,
    ) -> ClientResult<Value> {
        let variables = json!({
            "boardId": board_id,
            "groupId": group_id,
            "itemName": item_name,
            "columnValues": json_argument(column_values),
        });
        let data = self.execute(CREATE_ITEM_MUTATION, variables).await?;
        mutated(data, "create_item")
    }

    async fn change_multiple_column_values(
        &self,
        board_id: &str,
        item_id: &str,
        column_values: &Map<String, Value>,
    ) -> ClientResult<Value> {
        let variables = json!({
            "boardId": board_id,
            "itemId": item_id,
            "columnValues": json_argument(column_values),
        });
        let data = self.execute(CHANGE_VALUES_MUTATION, variables).await?;
        mutated(data, "change_multiple_column_values")
    }

    async fn delete_item(&self, item_id: &str) -> ClientResult<Value> {
        let data = self.execute(DELETE_ITEM_MUTATION, json!({ "itemId": item_id })).await?;
        mutated(data, "delete_item")
    }
}

fn mutated(mut data: Value, field: &str) -> ClientResult<Value> {
    match data.get_mut(field).map(Value::take) {
        Some(item @ Value::Object(_)) => Ok(item),
        _ => Err(ClientError::InvalidResponse(format!("mutation returned no {}", field))),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_fails_before_request() {
        let client = MondayClient::new(Some("   ".into()));
        assert!(!client.has_api_key());
        let err = client.fetch_board_schema("1").await.unwrap_err();
        assert!(matches!(err, ClientError::MissingApiKey));
    }

    #[test]
    fn test_graphql_errors_become_api_errors() {
        let response = json!({
            "data": null,
            "errors": [{"message": "Board not found"}, {"message": "Rate limited"}]
        });
        match extract_data(response) {
            Err(ClientError::Api(message)) => assert_eq!(message, "Board not found; Rate limited"),
            other => panic!("expected API error, got {:?}", other),
        }

        let rest_style = json!({"error_message": "Not Authenticated", "status_code": 401});
        assert_eq!(error_message(&rest_style).as_deref(), Some("Not Authenticated"));
    }

    #[test]
    fn test_extract_data_requires_object() {
        let data = extract_data(json!({"data": {"boards": []}})).unwrap();
        assert_eq!(data, json!({"boards": []}));
        assert!(matches!(extract_data(json!({})), Err(ClientError::InvalidResponse(_))));
    }

    #[test]
    fn test_response_helpers() {
        let data = json!({"boards": [{"items_page": {"items": [{"id": "1"}]}, "groups": []}]});
        assert_eq!(items_at(&data, "/boards/0/items_page/items").len(), 1);
        assert!(items_at(&data, "/boards/1/groups").is_empty());
        assert!(first_board(&json!({"boards": []}), "boards").is_err());

        let mut values = Map::new();
        values.insert("status".into(), json!({"index": "1"}));
        assert_eq!(json_argument(&values), r#"{"status":{"index":"1"}}"#);

        assert!(mutated(json!({"delete_item": null}), "delete_item").is_err());
        assert_eq!(truncate("héllo", 2), "hé");
    }
}
