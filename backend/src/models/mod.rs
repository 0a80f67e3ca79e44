//! Domain models for board columns.
//!
//! This module contains the data structures shared by validators, handlers
//! and the schema cache:
//!
//! - [`ValidationResult`] - Uniform outcome of any validation
//! - [`ColumnValue`] - Raw value, wire value and validation outcome of one call
//! - [`ColumnKind`] - Closed set of column type tags known to the registry
//! - [`ColumnSettings`] / [`ColumnDefinition`] - Column metadata from the board
//! - [`Settings`] - Loosely typed settings with typed views

pub mod settings;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub use settings::{DateSettings, LabelSet, PhoneSettings, Settings};

// =============================================================================
// Validation Result
// =============================================================================

/// Outcome of validating one raw value.
///
/// When `is_valid` is true, `transformed_value` holds the canonical value fed
/// to the handler's transform step (`None` for pass-through types).
/// `suggested_values` is only filled by label matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: Option<String>,
    pub transformed_value: Option<Value>,
    pub suggested_values: Option<Vec<String>>,
}

impl ValidationResult {
    /// A successful validation with no canonical value.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            ..Self::default()
        }
    }

    /// A successful validation carrying the canonical value.
    pub fn valid_with(value: Value) -> Self {
        Self {
            is_valid: true,
            transformed_value: Some(value),
            ..Self::default()
        }
    }

    /// A failed validation with a human-readable message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggested_values = Some(suggestions);
        self
    }
}

// =============================================================================
// Column Value
// =============================================================================

/// Result of one `format_value` call. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnValue {
    pub raw_value: Value,
    pub formatted_value: Option<Value>,
    pub validation_result: ValidationResult,
}

impl ColumnValue {
    pub fn rejected(raw_value: Value, validation_result: ValidationResult) -> Self {
        Self {
            raw_value,
            formatted_value: None,
            validation_result,
        }
    }
}

// =============================================================================
// Column Kind
// =============================================================================

/// Column type tags understood by the handler registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Name,
    Text,
    LongText,
    Numeric,
    Date,
    Email,
    Location,
    Checkbox,
    Status,
    Dropdown,
    Tags,
    Link,
    WorldClock,
    Country,
    Phone,
    Rating,
    File,
    Formula,
    ConnectBoards,
    CreationLog,
    Dependency,
    TimeTracking,
    ColorPicker,
    Button,
    LastUpdated,
    Mirror,
    Progress,
    Vote,
    ItemId,
    AutoNumber,
    Timeline,
    Hour,
    Week,
    Doc,
}

impl ColumnKind {
    /// Every tag, in registry order.
    pub const ALL: [ColumnKind; 34] = [
        ColumnKind::Name,
        ColumnKind::Text,
        ColumnKind::LongText,
        ColumnKind::Numeric,
        ColumnKind::Date,
        ColumnKind::Email,
        ColumnKind::Location,
        ColumnKind::Checkbox,
        ColumnKind::Status,
        ColumnKind::Dropdown,
        ColumnKind::Tags,
        ColumnKind::Link,
        ColumnKind::WorldClock,
        ColumnKind::Country,
        ColumnKind::Phone,
        ColumnKind::Rating,
        ColumnKind::File,
        ColumnKind::Formula,
        ColumnKind::ConnectBoards,
        ColumnKind::CreationLog,
        ColumnKind::Dependency,
        ColumnKind::TimeTracking,
        ColumnKind::ColorPicker,
        ColumnKind::Button,
        ColumnKind::LastUpdated,
        ColumnKind::Mirror,
        ColumnKind::Progress,
        ColumnKind::Vote,
        ColumnKind::ItemId,
        ColumnKind::AutoNumber,
        ColumnKind::Timeline,
        ColumnKind::Hour,
        ColumnKind::Week,
        ColumnKind::Doc,
    ];

    /// The canonical tag as returned by the upstream schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Text => "text",
            Self::LongText => "long_text",
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::Email => "email",
            Self::Location => "location",
            Self::Checkbox => "checkbox",
            Self::Status => "status",
            Self::Dropdown => "dropdown",
            Self::Tags => "tags",
            Self::Link => "link",
            Self::WorldClock => "world_clock",
            Self::Country => "country",
            Self::Phone => "phone",
            Self::Rating => "rating",
            Self::File => "file",
            Self::Formula => "formula",
            Self::ConnectBoards => "connect_boards",
            Self::CreationLog => "creation_log",
            Self::Dependency => "dependency",
            Self::TimeTracking => "time_tracking",
            Self::ColorPicker => "color_picker",
            Self::Button => "button",
            Self::LastUpdated => "last_updated",
            Self::Mirror => "mirror",
            Self::Progress => "progress",
            Self::Vote => "vote",
            Self::ItemId => "item_id",
            Self::AutoNumber => "auto_number",
            Self::Timeline => "timeline",
            Self::Hour => "hour",
            Self::Week => "week",
            Self::Doc => "doc",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_lowercase();
        if let Some(kind) = Self::ALL.iter().find(|k| k.as_str() == tag) {
            return Ok(*kind);
        }
        // Upstream aliases
        match tag.as_str() {
            "numbers" => Ok(Self::Numeric),
            "color" => Ok(Self::Status),
            "board_relation" => Ok(Self::ConnectBoards),
            "lookup" => Ok(Self::Mirror),
            "long-text" => Ok(Self::LongText),
            _ => Err(format!("Unknown column type: {}", s)),
        }
    }
}

// =============================================================================
// Column Metadata
// =============================================================================

/// Declared type, title and settings of one column.
///
/// Immutable after fetch; replaced wholesale on schema refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSettings {
    #[serde(rename = "type")]
    pub column_type: String,
    pub title: String,
    pub settings: Settings,
}

/// Full column definition as held by the schema cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDefinition {
    pub id: String,
    #[serde(flatten)]
    pub column: ColumnSettings,
    pub width: Option<Value>,
    pub archived: bool,
    pub description: String,
}

impl ColumnDefinition {
    /// Build a definition from one upstream column object.
    ///
    /// `settings_str` is a JSON string upstream; an already-decoded `settings`
    /// object is accepted too. Unparseable settings are treated as empty.
    pub fn from_upstream(column: &Value) -> Option<Self> {
        let id = column.get("id")?.as_str()?.to_string();
        let title = column
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let column_type = column
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let settings = match column.get("settings_str") {
            Some(Value::String(raw)) if !raw.trim().is_empty() => {
                Settings::from_json_str(raw).unwrap_or_default()
            }
            _ => column
                .get("settings")
                .map(Settings::from_value)
                .unwrap_or_default(),
        };

        Some(Self {
            id,
            column: ColumnSettings {
                column_type,
                title,
                settings,
            },
            width: column.get("width").cloned().filter(|w| !w.is_null()),
            archived: column
                .get("archived")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            description: column
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    pub fn column_type(&self) -> &str {
        &self.column.column_type
    }

    pub fn title(&self) -> &str {
        &self.column.title
    }

    pub fn settings(&self) -> &Settings {
        &self.column.settings
    }
}

// =============================================================================
// Value helpers
// =============================================================================

/// Render a JSON value the way a user typed it: strings unquoted, scalars
/// printed, containers as compact JSON, null as empty.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Truthiness of a loosely typed flag.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_kind_roundtrip_and_aliases() {
        for kind in ColumnKind::ALL {
            assert_eq!(kind.as_str().parse::<ColumnKind>().unwrap(), kind);
        }
        assert_eq!("numbers".parse::<ColumnKind>().unwrap(), ColumnKind::Numeric);
        assert_eq!("board_relation".parse::<ColumnKind>().unwrap(), ColumnKind::ConnectBoards);
        assert!("mystery".parse::<ColumnKind>().is_err());
    }

    #[test]
    fn test_column_definition_from_upstream() {
        let column = json!({
            "id": "status",
            "title": "Status",
            "type": "status",
            "settings_str": "{\"labels\": {\"1\": \"Done\", \"2\": \"Working on it\"}}",
            "width": null,
            "archived": false,
            "description": null
        });
        let def = ColumnDefinition::from_upstream(&column).unwrap();
        assert_eq!(def.id, "status");
        assert_eq!(def.column_type(), "status");
        assert_eq!(def.settings().labels().unwrap().len(), 2);
        assert_eq!(def.description, "");
    }

    #[test]
    fn test_column_definition_bad_settings_str() {
        let column = json!({"id": "c1", "title": "C", "type": "text", "settings_str": "{not json"});
        let def = ColumnDefinition::from_upstream(&column).unwrap();
        assert!(def.settings().is_empty());
    }

    #[test]
    fn test_validation_result_serialization() {
        let result = ValidationResult::invalid("Invalid value")
            .with_suggestions(vec!["Done".to_string()]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["is_valid"], false);
        assert_eq!(json["suggested_values"][0], "Done");
        assert!(json["transformed_value"].is_null());
    }

    #[test]
    fn test_value_helpers() {
        assert_eq!(value_to_text(&json!("abc")), "abc");
        assert_eq!(value_to_text(&json!(3.5)), "3.5");
        assert_eq!(value_to_text(&Value::Null), "");
        assert!(is_truthy(&json!(1)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
    }
}
