//! Handlers for object-shaped column types.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{expect_object, require_valid, rules_with, ColumnHandler};
use crate::error::{TransformError, TransformResult};
use crate::models::{is_truthy, value_to_text, ColumnKind, Settings, ValidationResult};
use crate::validation::{
    formula_result_type, parse_iso_timestamp, validate_color_picker, validate_connect_boards,
    validate_dependency, validate_formula, validate_progress, validate_time_tracking,
};
use crate::validation::structured::DEFAULT_MAX_DEPENDENCIES;

/// Mirror sources a mirror column may reference.
const MIRROR_TYPES: [&str; 2] = ["items", "subitems"];

// =============================================================================
// Validator-backed handlers
// =============================================================================

// Handlers whose wire value is the validator's canonical output. The
// transform re-runs the validator as a guard.
macro_rules! validator_handler {
    ($name:ident, $kind:expr, |$value:ident, $settings:ident| $validate:expr) => {
        pub struct $name;

        impl $name {
            fn check($value: &Value, $settings: &Settings) -> ValidationResult {
                let _ = &$settings;
                $validate
            }
        }

        #[async_trait]
        impl ColumnHandler for $name {
            fn kind(&self) -> ColumnKind {
                $kind
            }

            async fn validate_value(&self, value: &Value, settings: &Settings) -> ValidationResult {
                Self::check(value, settings)
            }

            async fn transform_value(&self, value: &Value, settings: &Settings) -> TransformResult<Value> {
                require_valid(self.kind(), Self::check(value, settings))
            }

            fn validation_rules(&self, settings: &Settings) -> Value {
                rules_with(self.kind(), settings, extra_rules(self.kind(), settings))
            }
        }
    };
}

validator_handler!(FormulaHandler, ColumnKind::Formula, |value, settings| validate_formula(value, settings));
validator_handler!(ConnectBoardsHandler, ColumnKind::ConnectBoards, |value, settings| {
    validate_connect_boards(value, settings)
});
validator_handler!(TimeTrackingHandler, ColumnKind::TimeTracking, |value, settings| {
    validate_time_tracking(value)
});
validator_handler!(ColorPickerHandler, ColumnKind::ColorPicker, |value, settings| {
    validate_color_picker(value)
});
validator_handler!(DependencyHandler, ColumnKind::Dependency, |value, settings| {
    validate_dependency(value, settings)
});
validator_handler!(ProgressHandler, ColumnKind::Progress, |value, settings| validate_progress(value));

/// Type-specific rule keys for the validator-backed handlers.
fn extra_rules(kind: ColumnKind, settings: &Settings) -> Value {
    match kind {
        ColumnKind::Formula => json!({ "result_type": formula_result_type(settings) }),
        ColumnKind::ConnectBoards => json!({ "allowed_boards": settings.get_string_list("allowed_boards") }),
        ColumnKind::Dependency => {
            json!({ "max_dependencies": settings.get_i64_or("max_dependencies", DEFAULT_MAX_DEPENDENCIES) })
        }
        ColumnKind::Progress => json!({ "min": 0, "max": 100 }),
        _ => json!({}),
    }
}

// =============================================================================
// Shape-checked handlers
// =============================================================================

fn get_or_null(map: &Map<String, Value>, key: &str) -> Value {
    map.get(key).cloned().unwrap_or(Value::Null)
}

fn truthy_field(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).is_some_and(is_truthy)
}

pub struct ButtonHandler;

impl ButtonHandler {
    fn check(value: &Value) -> Result<&Map<String, Value>, &'static str> {
        let map = value.as_object().ok_or("Button value must be a dictionary")?;
        if !truthy_field(map, "label") {
            return Err("Button must have a label");
        }
        if !truthy_field(map, "action_id") {
            return Err("Button must have an action_id");
        }
        Ok(map)
    }
}

#[async_trait]
impl ColumnHandler for ButtonHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Button
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        match Self::check(value) {
            Ok(_) => ValidationResult::valid_with(value.clone()),
            Err(message) => ValidationResult::invalid(message),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let map = Self::check(value).map_err(|m| TransformError::invalid("button", m))?;
        Ok(json!({
            "label": get_or_null(map, "label"),
            "action_id": get_or_null(map, "action_id"),
            "target_type": get_or_null(map, "target_type"),
            "target_id": get_or_null(map, "target_id"),
        }))
    }
}

/// Creation and last-update stamps share a `{<who>_by, <who>_at}` shape.
pub struct AuditStampHandler {
    kind: ColumnKind,
    actor_key: &'static str,
    time_key: &'static str,
    label: &'static str,
}

impl AuditStampHandler {
    pub fn creation_log() -> Self {
        Self {
            kind: ColumnKind::CreationLog,
            actor_key: "created_by",
            time_key: "created_at",
            label: "Creation log",
        }
    }

    pub fn last_updated() -> Self {
        Self {
            kind: ColumnKind::LastUpdated,
            actor_key: "updated_by",
            time_key: "updated_at",
            label: "Last updated",
        }
    }

    fn check<'a>(&self, value: &'a Value) -> Result<&'a Map<String, Value>, String> {
        let map = value
            .as_object()
            .ok_or_else(|| format!("{} value must be a dictionary", self.label))?;
        if !truthy_field(map, self.actor_key) || !truthy_field(map, self.time_key) {
            return Err(format!("{} must have {} and {}", self.label, self.actor_key, self.time_key));
        }
        let stamp = map.get(self.time_key).map(value_to_text).unwrap_or_default();
        if parse_iso_timestamp(&stamp).is_none() {
            return Err(format!("Invalid {} date format", self.time_key));
        }
        Ok(map)
    }
}

#[async_trait]
impl ColumnHandler for AuditStampHandler {
    fn kind(&self) -> ColumnKind {
        self.kind
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        match self.check(value) {
            Ok(_) => ValidationResult::valid_with(value.clone()),
            Err(message) => ValidationResult::invalid(message),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let map = self
            .check(value)
            .map_err(|m| TransformError::invalid(self.kind.as_str(), m))?;
        let mut out = Map::new();
        out.insert(self.actor_key.to_string(), get_or_null(map, self.actor_key));
        out.insert(self.time_key.to_string(), get_or_null(map, self.time_key));
        out.insert("account_id".to_string(), get_or_null(map, "account_id"));
        Ok(Value::Object(out))
    }
}

pub struct MirrorHandler;

impl MirrorHandler {
    fn check(value: &Value) -> Result<&Map<String, Value>, String> {
        let map = value.as_object().ok_or("Mirror value must be a dictionary")?;
        if !truthy_field(map, "source_board_id") {
            return Err("Mirror must have a source_board_id".to_string());
        }
        let mirror_type = map.get("mirror_type").and_then(Value::as_str).unwrap_or_default();
        if !MIRROR_TYPES.contains(&mirror_type) {
            return Err(format!("Invalid mirror_type. Valid types: {}", MIRROR_TYPES.join(", ")));
        }
        Ok(map)
    }
}

#[async_trait]
impl ColumnHandler for MirrorHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Mirror
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        match Self::check(value) {
            Ok(_) => ValidationResult::valid_with(value.clone()),
            Err(message) => ValidationResult::invalid(message),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let map = Self::check(value).map_err(|m| TransformError::invalid("mirror", m))?;
        Ok(json!({
            "source_board_id": get_or_null(map, "source_board_id"),
            "mirror_type": get_or_null(map, "mirror_type"),
            "filters": map.get("filters").cloned().unwrap_or_else(|| json!({})),
        }))
    }
}

pub struct VoteHandler;

impl VoteHandler {
    fn check(value: &Value) -> Result<Value, &'static str> {
        let map = value.as_object().ok_or("Vote value must be a dictionary")?;
        let votes_count = match map.get("votes_count") {
            None => 0,
            Some(Value::Number(n)) => n.as_i64().ok_or("Invalid votes_count value")?,
            Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| "Invalid votes_count value")?,
            Some(_) => return Err("Invalid votes_count value"),
        };
        if votes_count < 0 {
            return Err("votes_count cannot be negative");
        }
        let voters = map.get("voters").cloned().unwrap_or_else(|| json!([]));
        if !voters.is_array() {
            return Err("Voters must be a list");
        }
        Ok(json!({
            "votes_count": votes_count,
            "voters": voters,
            "voted_by_me": truthy_field(map, "voted_by_me"),
        }))
    }
}

#[async_trait]
impl ColumnHandler for VoteHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Vote
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        match Self::check(value) {
            Ok(canonical) => ValidationResult::valid_with(canonical),
            Err(message) => ValidationResult::invalid(message),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        Self::check(value).map_err(|m| TransformError::invalid("vote", m))
    }
}

pub struct TimelineHandler;

impl TimelineHandler {
    fn check(value: &Value) -> Result<&Map<String, Value>, &'static str> {
        let map = value.as_object().ok_or("Timeline value must be a dictionary")?;
        let bound = |key: &str| map.get(key).map(value_to_text).and_then(|s| parse_iso_timestamp(&s));
        let (Some(from), Some(to)) = (bound("from"), bound("to")) else {
            return Err("Invalid date format in timeline");
        };
        if to < from {
            return Err("End date cannot be before start date");
        }
        Ok(map)
    }
}

#[async_trait]
impl ColumnHandler for TimelineHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Timeline
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        match Self::check(value) {
            Ok(_) => ValidationResult::valid_with(value.clone()),
            Err(message) => ValidationResult::invalid(message),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let map = Self::check(value).map_err(|m| TransformError::invalid("timeline", m))?;
        Ok(json!({
            "from": get_or_null(map, "from"),
            "to": get_or_null(map, "to"),
        }))
    }
}

pub struct DocHandler;

#[async_trait]
impl ColumnHandler for DocHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Doc
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        match value.as_object() {
            None => ValidationResult::invalid("Document value must be a dictionary"),
            Some(map) if !truthy_field(map, "url") => ValidationResult::invalid("Document must have a URL"),
            Some(_) => ValidationResult::valid_with(value.clone()),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let map = expect_object(self.kind(), value, "Document value")?;
        if !truthy_field(map, "url") {
            return Err(TransformError::invalid("doc", "Document must have a URL"));
        }
        Ok(json!({
            "url": get_or_null(map, "url"),
            "title": map.get("title").cloned().unwrap_or_else(|| json!("")),
            "file_id": map.get("file_id").cloned().unwrap_or_else(|| json!("")),
        }))
    }
}
