//! Item tools: read, search, create, update and delete board items, plus
//! column checks that never touch the board.

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use tracing::{error, warn};

use super::{column_failures, error_json, failure, BoardTools};
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::client::DEFAULT_ITEM_LIMIT;
use crate::error::{SchemaError, SchemaResult};
use crate::models::ValidationResult;

impl BoardTools {
    /// Load the schema if needed and return the board id.
    pub(super) async fn ready_board(&self) -> SchemaResult<String> {
        self.schema.ensure_fresh().await?;
        self.schema
            .board_id()
            .map(str::to_string)
            .ok_or_else(|| SchemaError::Config("Missing MONDAY_BOARD_ID".into()))
    }

    pub async fn get_board_data(&self) -> Value {
        let board_id = match self.ready_board().await {
            Ok(id) => id,
            Err(e) => return failure(&e),
        };
        let snapshot = match self.schema.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => return failure(&e),
        };
        let items = match self.api.fetch_items(&board_id, DEFAULT_ITEM_LIMIT).await {
            Ok(items) => items,
            Err(e) => {
                error!(error = %e, "fetching items failed");
                return failure(&e.into());
            }
        };

        let columns = snapshot.board().get("columns").cloned().unwrap_or_else(|| json!([]));
        json!({
            "board": {
                "id": board_id,
                "name": snapshot.board().get("name").cloned().unwrap_or_else(|| json!("")),
                "columns_count": snapshot.columns().len(),
                "items_count": items.len(),
            },
            "columns": columns,
            "items": items,
        })
    }

    /// Items whose `field` (column id or title) equals `value`.
    ///
    /// Each hit lists its non-empty column values with column titles.
    pub async fn search_board_items(&self, field: &str, value: &str) -> Value {
        let board_id = match self.ready_board().await {
            Ok(id) => id,
            Err(e) => return failure(&e),
        };
        let column_id = self.schema.resolve_column_id(field).unwrap_or_else(|_| field.to_string());

        log_info(format!("Searching items where {} = {}", column_id, value));
        let found = match self.api.fetch_items_by_column_value(&board_id, &column_id, value).await {
            Ok(items) => items,
            Err(e) => {
                log_error(format!("Search failed: {}", e));
                return failure(&e.into());
            }
        };

        let titles: HashMap<String, String> = self
            .schema
            .snapshot()
            .map(|s| s.columns().iter().map(|c| (c.id.clone(), c.title().to_string())).collect())
            .unwrap_or_default();

        let items: Vec<Value> = found.iter().map(|item| summarize_item(item, &titles)).collect();
        log_success(format!("Found {} matching items", items.len()));

        json!({
            "success": true,
            "matches_found": items.len(),
            "items": items,
        })
    }

    /// Delete every item matched by [`search_board_items`](Self::search_board_items).
    /// One failed deletion does not stop the others.
    pub async fn delete_board_items(&self, field: &str, value: &str) -> Value {
        let search = self.search_board_items(field, value).await;
        let matches = match search.get("items").and_then(Value::as_array) {
            Some(items) if !items.is_empty() => items.clone(),
            _ => {
                return json!({
                    "success": false,
                    "message": "No items found to delete",
                    "deleted_count": 0,
                })
            }
        };

        let mut deleted = Vec::new();
        let mut errors = Vec::new();
        for item in &matches {
            let id = item.get("id").and_then(Value::as_str).unwrap_or_default();
            match self.api.delete_item(id).await {
                Ok(_) => {
                    log_info_indent(format!("Deleted item {}", id), 1);
                    deleted.push(item.clone());
                }
                Err(e) => {
                    log_warning(format!("Error deleting item {}: {}", id, e));
                    errors.push(format!("Error deleting item {}: {}", id, e));
                }
            }
        }

        json!({
            "success": !deleted.is_empty(),
            "message": format!("Deleted {} of {} items", deleted.len(), matches.len()),
            "deleted_count": deleted.len(),
            "deleted_items": deleted,
            "errors": if errors.is_empty() { Value::Null } else { json!(errors) },
        })
    }

    /// Validate and format every column value, then create the item.
    /// Without `group_id` the board's first group is used.
    pub async fn create_board_item(&self, item_name: &str, column_values: &Map<String, Value>, group_id: Option<&str>) -> Value {
        let board_id = match self.ready_board().await {
            Ok(id) => id,
            Err(e) => return failure(&e),
        };

        log_info(format!("Creating item '{}' with {} column values", item_name, column_values.len()));
        let formatted = match self.schema.format_column_values(column_values).await {
            Ok(formatted) => formatted,
            Err(failures) => {
                log_warning(format!("{} column values rejected, nothing written", failures.len()));
                return column_failures(&failures);
            }
        };

        let group_id = match group_id {
            Some(group) => group.to_string(),
            None => match self.default_group(&board_id).await {
                Some(group) => group,
                None => {
                    return json!({
                        "success": false,
                        "message": "No group ID provided and no default group found",
                    })
                }
            },
        };

        match self.api.create_item(&board_id, &group_id, item_name, &formatted).await {
            Ok(created) => {
                log_success(format!("Item '{}' created", item_name));
                json!({
                    "success": true,
                    "message": "Item created successfully",
                    "item": {
                        "id": created.get("id").cloned().unwrap_or(Value::Null),
                        "name": item_name,
                        "board_id": board_id,
                        "group_id": group_id,
                    },
                })
            }
            Err(e) => {
                log_error(format!("Failed to create item: {}", e));
                json!({ "success": false, "message": format!("Failed to create item: {}", e) })
            }
        }
    }

    async fn default_group(&self, board_id: &str) -> Option<String> {
        let groups = match self.schema.snapshot() {
            Ok(snapshot) if !snapshot.groups().is_empty() => snapshot.groups(),
            _ => self.api.fetch_groups(board_id).await.ok()?,
        };
        groups
            .first()
            .and_then(|g| g.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Validate and format every column value, then update the item.
    pub async fn update_board_item(&self, item_id: &str, column_values: &Map<String, Value>) -> Value {
        let board_id = match self.ready_board().await {
            Ok(id) => id,
            Err(e) => return failure(&e),
        };

        let formatted = match self.schema.format_column_values(column_values).await {
            Ok(formatted) => formatted,
            Err(failures) => {
                log_warning(format!("{} column values rejected, item {} unchanged", failures.len(), item_id));
                return column_failures(&failures);
            }
        };

        match self.api.change_multiple_column_values(&board_id, item_id, &formatted).await {
            Ok(updated) => {
                log_success(format!("Item {} updated", item_id));
                json!({
                    "success": true,
                    "message": "Item updated successfully",
                    "item": {
                        "id": updated.get("id").cloned().unwrap_or_else(|| json!(item_id)),
                        "name": updated.get("name").cloned().unwrap_or(Value::Null),
                        "board_id": board_id,
                    },
                })
            }
            Err(e) => {
                log_error(format!("Failed to update item {}: {}", item_id, e));
                json!({ "success": false, "message": format!("Failed to update item: {}", e) })
            }
        }
    }

    /// Validation result for `value` in `column` (id or title), plus the
    /// wire value it would be written as.
    pub async fn validate_column_value(&self, column: &str, value: &Value) -> Value {
        if let Err(e) = self.schema.ensure_fresh().await {
            return failure(&e);
        }
        let column_id = match self.schema.resolve_column_id(column) {
            Ok(id) => id,
            Err(e) => return failure(&e),
        };
        let result = match self.schema.validate_column_value(&column_id, value).await {
            Ok(result) => result,
            Err(e) => return failure(&e),
        };

        let formatted = if result.is_valid {
            Some(self.schema.format_value(&column_id, value).await)
        } else {
            None
        };
        validation_body(&column_id, &result, formatted)
    }

    pub async fn get_column_format(&self, column: &str) -> Value {
        if let Err(e) = self.schema.ensure_fresh().await {
            return failure(&e);
        }
        match self
            .schema
            .resolve_column_id(column)
            .and_then(|id| self.schema.get_column_format(&id).map(|format| (id, format)))
        {
            Ok((column_id, format)) => json!({ "success": true, "column_id": column_id, "format": format }),
            Err(e) => failure(&e),
        }
    }
}

fn summarize_item(item: &Value, titles: &HashMap<String, String>) -> Value {
    let column_values: Vec<Value> = item
        .get("column_values")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|cv| {
                    let text = cv.get("text").and_then(Value::as_str).filter(|t| !t.is_empty())?;
                    let id = cv.get("id").and_then(Value::as_str).unwrap_or_default();
                    let title = titles.get(id).map(String::as_str).unwrap_or(id);
                    Some(json!({ "column_id": id, "title": title, "value": text }))
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "id": item.get("id").cloned().unwrap_or(Value::Null),
        "name": item.get("name").cloned().unwrap_or(Value::Null),
        "column_values": column_values,
    })
}

/// A transform that fails after validation passed is reported under
/// `format_error`.
fn validation_body(
    column_id: &str,
    result: &ValidationResult,
    formatted: Option<SchemaResult<Value>>,
) -> Value {
    let mut body = json!({
        "success": true,
        "column_id": column_id,
        "validation": result,
    });
    match formatted {
        Some(Ok(wire)) => body["formatted_value"] = wire,
        Some(Err(e)) => {
            warn!(column = column_id, error = %e, "value validated but could not be formatted");
            body["format_error"] = error_json(None, &e);
        }
        None => {}
    }
    body
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::testing::{sample_items, stub_api, tools_with};
    use super::{validation_body, SchemaError, ValidationResult};
    use crate::client::testing::StubBoardApi;
    use crate::schema::testing::sample_board;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_board_data_counts() {
        let tools = tools_with(stub_api());
        let out = tools.get_board_data().await;
        assert_eq!(out["board"]["id"], "123");
        assert_eq!(out["board"]["name"], "Leads");
        assert_eq!(out["board"]["columns_count"], 4);
        assert_eq!(out["board"]["items_count"], 2);
        assert_eq!(out["items"][1]["name"], "Globex");
    }

    #[tokio::test]
    async fn test_search_by_column_title() {
        let tools = tools_with(stub_api());
        let out = tools.search_board_items("Status", "Done").await;
        assert_eq!(out["success"], true);
        assert_eq!(out["matches_found"], 1);
        let item = &out["items"][0];
        assert_eq!(item["id"], "11");
        // empty rating text is left out
        assert_eq!(item["column_values"], json!([{"column_id": "status", "title": "Status", "value": "Done"}]));
    }

    #[tokio::test]
    async fn test_delete_matching_items() {
        let api = stub_api();
        let tools = tools_with(api.clone());
        let out = tools.delete_board_items("status", "Working on it").await;
        assert_eq!(out["success"], true);
        assert_eq!(out["deleted_count"], 1);
        assert_eq!(out["errors"], json!(null));
        assert_eq!(api.mutations()[0].1, json!({"item_id": "12"}));

        let out = tools.delete_board_items("status", "Stuck").await;
        assert_eq!(out["message"], "No items found to delete");
    }

    #[tokio::test]
    async fn test_delete_reports_partial_failure() {
        let mut items = sample_items();
        items[0]["id"] = json!("locked");
        let api = Arc::new(StubBoardApi::new(sample_board()).with_items(items));
        let tools = tools_with(api);
        let out = tools.delete_board_items("name", "Acme").await;
        assert_eq!(out["success"], false);
        assert_eq!(out["deleted_count"], 0);
        assert_eq!(out["errors"][0], "Error deleting item locked: API error: permission denied");
    }

    #[tokio::test]
    async fn test_create_formats_values_into_first_group() {
        let api = stub_api();
        let tools = tools_with(api.clone());
        let values = json!({"Status": "done", "rating_1": 4});
        let out = tools.create_board_item("New lead", values.as_object().unwrap(), None).await;
        assert_eq!(out["success"], true);
        assert_eq!(out["item"]["group_id"], "topics");

        let (kind, payload) = api.mutations().remove(0);
        assert_eq!(kind, "create");
        assert_eq!(
            payload["column_values"],
            json!({"status": {"index": "1"}, "rating_1": {"rating": 4}})
        );
    }

    #[tokio::test]
    async fn test_create_rejects_before_writing() {
        let api = stub_api();
        let tools = tools_with(api.clone());
        let values = json!({"status": "don", "missing": "x"});
        let out = tools.create_board_item("Bad", values.as_object().unwrap(), Some("topics")).await;
        assert_eq!(out["success"], false);
        let errors = out["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0]["suggested_values"], json!(["Done"]));
        assert_eq!(errors[1]["code"], "unknown_column");
        assert!(api.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_create_without_any_group() {
        let mut board = sample_board();
        board["boards"][0]["groups"] = json!([]);
        let api = Arc::new(StubBoardApi::new(board));
        let tools = tools_with(api.clone());
        let out = tools.create_board_item("Orphan", &serde_json::Map::new(), None).await;
        assert_eq!(out["message"], "No group ID provided and no default group found");
        assert!(api.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_update_item() {
        let api = stub_api();
        let tools = tools_with(api.clone());
        let values = json!({"rating_1": "5"});
        let out = tools.update_board_item("11", values.as_object().unwrap()).await;
        assert_eq!(out["success"], true);
        assert_eq!(out["item"]["id"], "11");
        assert_eq!(api.mutations()[0].1["column_values"], json!({"rating_1": {"rating": 5}}));
    }

    #[tokio::test]
    async fn test_validate_and_format_tools() {
        let tools = tools_with(stub_api());
        let out = tools.validate_column_value("status", &json!("working on it")).await;
        assert_eq!(out["validation"]["is_valid"], true);
        assert_eq!(out["formatted_value"], json!({"index": "2"}));

        let out = tools.validate_column_value("Score", &json!(7)).await;
        assert_eq!(out["validation"]["is_valid"], false);
        assert!(out.get("formatted_value").is_none());

        let out = tools.validate_column_value("subitems", &json!("x")).await;
        assert_eq!(out["errors"][0]["code"], "unsupported_column_type");

        let out = tools.get_column_format("Score").await;
        assert_eq!(out["column_id"], "rating_1");
        assert_eq!(out["format"]["validation_rules"]["max_rating"], 5);
    }

    #[test]
    fn test_format_failure_after_validation_is_reported() {
        let error = SchemaError::InvalidValue {
            column_id: "location".into(),
            result: ValidationResult::invalid("Location not found"),
        };
        let body = validation_body("location", &ValidationResult::valid(), Some(Err(error)));
        assert_eq!(body["success"], true);
        assert!(body.get("formatted_value").is_none());
        assert_eq!(body["format_error"]["code"], "invalid_value");
        assert_eq!(body["format_error"]["message"], "Location not found");

        let body = validation_body("status", &ValidationResult::valid(), Some(Ok(json!({"index": "1"}))));
        assert_eq!(body["formatted_value"], json!({"index": "1"}));
        assert!(body.get("format_error").is_none());
    }
}
