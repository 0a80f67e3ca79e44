//! Read-only board resources.
//!
//! Board metadata and raw column types are fetched once per TTL and kept in
//! the tools' [`ResourceCache`](crate::cache::ResourceCache). The column
//! views are rendered from the schema snapshot, which has its own TTL.

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{failure, BoardTools};
use crate::error::{SchemaError, SchemaResult};
use crate::models::ColumnDefinition;

const METADATA_KEY: &str = "board_metadata";
const COLUMN_TYPES_KEY: &str = "column_types";

/// Metadata fields merged into the schema resource.
const METADATA_FIELDS: &[&str] = &["workspace", "description", "subscribers", "updates", "views"];

fn metadata_default(field: &str) -> Value {
    match field {
        "workspace" => json!({}),
        "description" => json!(""),
        _ => json!([]),
    }
}

impl BoardTools {
    async fn cached_board_value(&self, key: &str) -> SchemaResult<Value> {
        if let Some(value) = self.resources.get(key) {
            debug!(resource = key, "resource cache hit");
            return Ok(value);
        }

        let board_id = self.ready_board().await?;
        let value = match key {
            METADATA_KEY => self.api.fetch_board_metadata(&board_id).await?,
            _ => self.api.fetch_column_types(&board_id).await?,
        };
        self.resources.insert(key, value.clone());
        debug!(resource = key, "resource cache refreshed");
        Ok(value)
    }

    /// Columns info merged with workspace, description, subscribers,
    /// updates and views from the board metadata.
    pub async fn board_schema_resource(&self) -> Value {
        if let Err(e) = self.schema.ensure_fresh().await {
            return failure(&e);
        }
        let mut info = match self.schema.get_columns_info() {
            Ok(info) => info,
            Err(e) => return failure(&e),
        };

        match self.cached_board_value(METADATA_KEY).await {
            Ok(metadata) => {
                for field in METADATA_FIELDS {
                    info[*field] = metadata.get(*field).cloned().unwrap_or_else(|| metadata_default(field));
                }
            }
            Err(e) => warn!(error = %e, "board metadata unavailable, serving columns only"),
        }
        info
    }

    /// Full description of one column, including its format and rules.
    pub async fn column_resource(&self, column_id: &str) -> Value {
        if let Err(e) = self.schema.ensure_fresh().await {
            return failure(&e);
        }
        let column = match self.schema.column(column_id) {
            Ok(column) => column,
            Err(e) => return failure(&e),
        };
        let format = self.schema.get_column_format(column_id).unwrap_or(Value::Null);

        json!({
            "id": column.id,
            "title": column.title(),
            "type": column.column_type(),
            "settings": column.settings(),
            "format": format,
            "validation_rules": self.schema.rules_for(&column),
            "width": column.width,
            "archived": column.archived,
            "description": column.description,
        })
    }

    /// Raw board columns, each annotated with its validation rules.
    pub async fn column_types_resource(&self) -> Value {
        let mut data = match self.cached_board_value(COLUMN_TYPES_KEY).await {
            Ok(data) => data,
            Err(e) => return failure(&e),
        };

        if let Some(columns) = data.get_mut("columns").and_then(Value::as_array_mut) {
            for column in columns.iter_mut() {
                let rules = match ColumnDefinition::from_upstream(column) {
                    Some(definition) => self.schema.rules_for(&definition),
                    None => json!({}),
                };
                column["validation_rules"] = rules;
            }
        }
        data
    }

    pub async fn metadata_resource(&self) -> Value {
        match self.cached_board_value(METADATA_KEY).await {
            Ok(metadata) => metadata,
            Err(e) => failure(&e),
        }
    }

    /// Serve a resource by its path under `/api/resources/`.
    pub async fn read_resource(&self, path: &str) -> Value {
        match path.trim_matches('/') {
            "schema" => self.board_schema_resource().await,
            "column-types" => self.column_types_resource().await,
            "metadata" => self.metadata_resource().await,
            other => match other.strip_prefix("columns/") {
                Some(column_id) if !column_id.is_empty() => self.column_resource(column_id).await,
                _ => failure(&SchemaError::Data(format!("Unknown resource: {}", other))),
            },
        }
    }
}
