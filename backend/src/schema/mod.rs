//! Board schema cache.
//!
//! [`BoardSchema`] holds the latest column definitions fetched from the board
//! API and dispatches validation and formatting to the
//! [`HandlerRegistry`].
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──initialize()──▶ Initializing ──ok──▶ Ready
//!                                      ▲                 │
//!                                      └───refresh()─────┘
//! ```
//!
//! A refresh builds a complete [`BoardSnapshot`] before swapping it in, so
//! readers see either the old columns or the new ones, never a mix. A failed
//! refresh keeps the previous snapshot.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{ClientResult, SchemaError, SchemaResult};
use crate::handlers::HandlerRegistry;
use crate::models::{ColumnDefinition, ValidationResult};

/// Default snapshot lifetime before [`BoardSchema::ensure_fresh`] refetches.
pub const DEFAULT_SCHEMA_TTL: Duration = Duration::from_secs(300);

// =============================================================================
// Provider
// =============================================================================

/// Source of raw board schemas.
///
/// Implementations return the GraphQL `data` object, which must hold
/// `boards[0]` with a `columns` list.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn fetch_board_schema(&self, board_id: &str) -> ClientResult<Value>;
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaState {
    Uninitialized,
    Initializing,
    Ready,
}

/// One complete, immutable fetch of a board.
#[derive(Debug)]
pub struct BoardSnapshot {
    board: Value,
    columns: Vec<ColumnDefinition>,
    index: HashMap<String, usize>,
    fetched_at: Instant,
}

impl BoardSnapshot {
    /// Build a snapshot from the GraphQL `data` object.
    pub fn from_response(data: &Value) -> SchemaResult<Self> {
        let board = data
            .get("boards")
            .and_then(Value::as_array)
            .and_then(|boards| boards.first())
            .ok_or_else(|| SchemaError::Data("response has no boards[0]".into()))?;

        let raw_columns = board
            .get("columns")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::Data("board has no columns list".into()))?;

        let columns: Vec<ColumnDefinition> = raw_columns
            .iter()
            .filter_map(|raw| {
                let column = ColumnDefinition::from_upstream(raw);
                if column.is_none() {
                    warn!(column = %raw, "skipping column without id");
                }
                column
            })
            .collect();

        let index = columns
            .iter()
            .enumerate()
            .map(|(pos, column)| (column.id.clone(), pos))
            .collect();

        Ok(Self {
            board: board.clone(),
            columns,
            index,
            fetched_at: Instant::now(),
        })
    }

    pub fn column(&self, column_id: &str) -> Option<&ColumnDefinition> {
        self.index.get(column_id).map(|&pos| &self.columns[pos])
    }

    /// Columns in board order.
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Raw board object as returned upstream.
    pub fn board(&self) -> &Value {
        &self.board
    }

    pub fn groups(&self) -> Vec<Value> {
        self.list_field("groups")
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    fn list_field(&self, key: &str) -> Vec<Value> {
        self.board
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    fn field(&self, key: &str) -> Value {
        self.board.get(key).cloned().unwrap_or(Value::Null)
    }
}

/// A column whose value could not be formatted.
#[derive(Debug)]
pub struct ColumnFailure {
    pub column: String,
    pub error: SchemaError,
}

// =============================================================================
// BoardSchema
// =============================================================================

pub struct BoardSchema {
    board_id: Option<String>,
    provider: Arc<dyn SchemaProvider>,
    registry: Arc<HandlerRegistry>,
    ttl: Duration,
    state: RwLock<SchemaState>,
    snapshot: RwLock<Option<Arc<BoardSnapshot>>>,
    refresh_lock: Mutex<()>,
}

impl BoardSchema {
    pub fn new(
        board_id: Option<String>,
        provider: Arc<dyn SchemaProvider>,
        registry: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            board_id: board_id.filter(|id| !id.trim().is_empty()),
            provider,
            registry,
            ttl: DEFAULT_SCHEMA_TTL,
            state: RwLock::new(SchemaState::Uninitialized),
            snapshot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Set how long a snapshot stays fresh.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn board_id(&self) -> Option<&str> {
        self.board_id.as_deref()
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn status(&self) -> SchemaState {
        *self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, state: SchemaState) {
        *self.state.write().unwrap_or_else(|p| p.into_inner()) = state;
    }

    /// Current snapshot, or [`SchemaError::NotInitialized`].
    pub fn snapshot(&self) -> SchemaResult<Arc<BoardSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or(SchemaError::NotInitialized)
    }

    /// Fetch the board schema for the first time. Same as [`refresh`](Self::refresh).
    pub async fn initialize(&self) -> SchemaResult<()> {
        self.refresh().await
    }

    /// Refetch the board and swap the new snapshot in.
    ///
    /// Concurrent refreshes are serialized. On failure the previous snapshot
    /// (if any) stays in place.
    pub async fn refresh(&self) -> SchemaResult<()> {
        let _guard = self.refresh_lock.lock().await;
        let previous = self.status();
        self.set_state(SchemaState::Initializing);

        match self.fetch_snapshot().await {
            Ok(snapshot) => {
                info!(
                    board_id = self.board_id.as_deref().unwrap_or_default(),
                    columns = snapshot.columns.len(),
                    "board schema loaded"
                );
                *self.snapshot.write().unwrap_or_else(|p| p.into_inner()) = Some(Arc::new(snapshot));
                self.set_state(SchemaState::Ready);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "board schema refresh failed");
                let restored = if previous == SchemaState::Ready {
                    SchemaState::Ready
                } else {
                    SchemaState::Uninitialized
                };
                self.set_state(restored);
                Err(e)
            }
        }
    }

    async fn fetch_snapshot(&self) -> SchemaResult<BoardSnapshot> {
        let board_id = self
            .board_id
            .as_deref()
            .ok_or_else(|| SchemaError::Config("Missing MONDAY_BOARD_ID".into()))?;
        let data = self.provider.fetch_board_schema(board_id).await?;
        BoardSnapshot::from_response(&data)
    }

    /// Refresh when there is no snapshot or it is older than the TTL.
    pub async fn ensure_fresh(&self) -> SchemaResult<()> {
        match self.snapshot() {
            Ok(snapshot) if snapshot.age() < self.ttl => Ok(()),
            _ => {
                debug!("board schema stale, refreshing");
                self.refresh().await
            }
        }
    }

    // -------------------------------------------------------------------------
    // Column lookups
    // -------------------------------------------------------------------------

    pub fn column(&self, column_id: &str) -> SchemaResult<ColumnDefinition> {
        self.snapshot()?
            .column(column_id)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownColumn(column_id.to_string()))
    }

    /// Accept a column id or a column title (case-insensitive).
    pub fn resolve_column_id(&self, field: &str) -> SchemaResult<String> {
        let snapshot = self.snapshot()?;
        if snapshot.column(field).is_some() {
            return Ok(field.to_string());
        }
        let wanted = field.trim().to_lowercase();
        snapshot
            .columns()
            .iter()
            .find(|column| column.title().to_lowercase() == wanted)
            .map(|column| column.id.clone())
            .ok_or_else(|| SchemaError::UnknownColumn(field.to_string()))
    }

    /// Validation rules of `column`'s handler, `{}` for unsupported types.
    pub fn rules_for(&self, column: &ColumnDefinition) -> Value {
        match self.registry.get(column.column_type()) {
            Some(handler) => handler.validation_rules(column.settings()),
            None => {
                warn!(column_type = column.column_type(), "no handler for column type");
                json!({})
            }
        }
    }

    /// `{"type", "settings", "validation_rules"}` for one column.
    pub fn get_column_format(&self, column_id: &str) -> SchemaResult<Value> {
        let column = self.column(column_id)?;
        if !self.registry.supports(column.column_type()) {
            return Err(SchemaError::NoHandler(column.column_type().to_string()));
        }
        Ok(json!({
            "type": column.column_type(),
            "settings": column.settings(),
            "validation_rules": self.rules_for(&column),
        }))
    }

    /// Validate `value` for a column. Lookup failures are errors; a bad value
    /// is an invalid [`ValidationResult`].
    pub async fn validate_column_value(&self, column_id: &str, value: &Value) -> SchemaResult<ValidationResult> {
        let column = self.column(column_id)?;
        let handler = self
            .registry
            .get(column.column_type())
            .ok_or_else(|| SchemaError::NoHandler(column.column_type().to_string()))?;
        Ok(handler.validate_value(value, column.settings()).await)
    }

    /// Wire value for one column.
    ///
    /// A rejected value comes back as [`SchemaError::InvalidValue`] carrying
    /// the validation result as-is. A transform failure is reported the same
    /// way, with the transform message.
    pub async fn format_value(&self, column_id: &str, value: &Value) -> SchemaResult<Value> {
        let column = self.column(column_id)?;
        let handler = self
            .registry
            .get(column.column_type())
            .ok_or_else(|| SchemaError::NoHandler(column.column_type().to_string()))?;

        let formatted = handler.format_value(value, column.settings()).await.map_err(|e| {
            error!(column_id, error = %e, "transform failed after validation");
            SchemaError::InvalidValue {
                column_id: column_id.to_string(),
                result: ValidationResult::invalid(e.to_string()),
            }
        })?;

        match formatted.formatted_value {
            Some(wire) if formatted.validation_result.is_valid => Ok(wire),
            _ => Err(SchemaError::InvalidValue {
                column_id: column_id.to_string(),
                result: formatted.validation_result,
            }),
        }
    }

    /// Format every entry of a `column → value` mapping. Keys may be column
    /// ids or titles; the output is keyed by column id.
    ///
    /// Returns the complete mapping, or every failure when any column fails.
    pub async fn format_column_values(&self, values: &Map<String, Value>) -> Result<Map<String, Value>, Vec<ColumnFailure>> {
        let mut formatted = Map::new();
        let mut failures = Vec::new();

        for (field, value) in values {
            let outcome = match self.resolve_column_id(field) {
                Ok(column_id) => self.format_value(&column_id, value).await.map(|wire| (column_id, wire)),
                Err(e) => Err(e),
            };
            match outcome {
                Ok((column_id, wire)) => {
                    formatted.insert(column_id, wire);
                }
                Err(error) => failures.push(ColumnFailure {
                    column: field.clone(),
                    error,
                }),
            }
        }

        if failures.is_empty() {
            Ok(formatted)
        } else {
            debug!(failed = failures.len(), "column values rejected");
            Err(failures)
        }
    }

    /// Board info, groups, tags, owner and every column with its rules.
    pub fn get_columns_info(&self) -> SchemaResult<Value> {
        let snapshot = self.snapshot()?;
        let columns: Vec<Value> = snapshot
            .columns()
            .iter()
            .map(|column| {
                json!({
                    "id": column.id,
                    "title": column.title(),
                    "type": column.column_type(),
                    "settings": column.settings(),
                    "width": column.width,
                    "archived": column.archived,
                    "description": column.description,
                    "validation_rules": self.rules_for(column),
                })
            })
            .collect();

        let permissions = match snapshot.field("permissions") {
            Value::Null => json!([]),
            other => other,
        };
        let owner = match snapshot.field("owner") {
            Value::Null => json!({}),
            other => other,
        };

        Ok(json!({
            "board_info": {
                "name": snapshot.field("name"),
                "board_kind": snapshot.field("board_kind"),
                "workspace_id": snapshot.field("workspace_id"),
                "state": snapshot.field("state"),
                "permissions": permissions,
            },
            "groups": snapshot.groups(),
            "tags": snapshot.list_field("tags"),
            "owner": owner,
            "columns": columns,
        }))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::ClientError;

    /// Provider returning a fixed board, or an error when `data` is `None`.
    pub struct StubProvider {
        data: std::sync::Mutex<Option<Value>>,
        fetches: AtomicUsize,
    }

    impl StubProvider {
        pub fn new(data: Value) -> Self {
            Self {
                data: std::sync::Mutex::new(Some(data)),
                fetches: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                data: std::sync::Mutex::new(None),
                fetches: AtomicUsize::new(0),
            }
        }

        pub fn set(&self, data: Option<Value>) {
            *self.data.lock().unwrap() = data;
        }

        pub fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SchemaProvider for StubProvider {
        async fn fetch_board_schema(&self, _board_id: &str) -> ClientResult<Value> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.data
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ClientError::Api("board not found".into()))
        }
    }

    pub fn sample_board() -> Value {
        json!({
            "boards": [{
                "name": "Leads",
                "board_kind": "public",
                "workspace_id": 42,
                "state": "active",
                "permissions": "everyone",
                "groups": [{"id": "topics", "title": "Group One", "color": "#579bfc", "position": "1"}],
                "tags": [],
                "owner": {"id": 7, "name": "Ada"},
                "columns": [
                    {"id": "name", "title": "Name", "type": "name", "settings_str": "{}"},
                    {"id": "status", "title": "Status", "type": "status",
                     "settings_str": "{\"labels\":{\"1\":\"Done\",\"2\":\"Working on it\"}}"},
                    {"id": "rating_1", "title": "Score", "type": "rating", "settings_str": "{\"max_rating\":5}"},
                    {"id": "subitems", "title": "Subitems", "type": "subtasks", "settings_str": "{}"}
                ]
            }]
        })
    }
}
