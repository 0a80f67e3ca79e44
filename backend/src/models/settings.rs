//! Column settings as delivered by the board schema.
//!
//! Settings are arbitrary nested JSON. [`Settings`] keeps the raw mapping and
//! offers typed views for the column types where the shape matters:
//! [`LabelSet`] for status and dropdown, [`DateSettings`] and
//! [`PhoneSettings`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::value_to_text;

/// Loosely typed settings mapping of one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(Map<String, Value>);

impl Settings {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Settings from any JSON value; non-objects yield empty settings.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self(map.clone()),
            _ => Self::default(),
        }
    }

    /// Decode the upstream `settings_str`.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::from_value(&value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Integer setting; numeric strings are accepted, anything else falls
    /// back to `default`.
    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// List of strings setting; non-string entries are rendered as text.
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items.iter().map(value_to_text).collect(),
            _ => Vec::new(),
        }
    }

    /// Whether the column is marked mandatory.
    pub fn mandatory(&self) -> bool {
        self.get_bool_or("mandatory", false)
    }

    /// Label view, present only when the settings define `labels`.
    pub fn labels(&self) -> Option<LabelSet> {
        self.0.get("labels").map(LabelSet::from_value)
    }

    pub fn date(&self) -> DateSettings {
        DateSettings {
            timezone: self
                .get_str("timezone")
                .filter(|tz| !tz.trim().is_empty())
                .unwrap_or("UTC")
                .to_string(),
            includes_time: self.get_bool_or("time", false),
        }
    }

    pub fn phone(&self) -> PhoneSettings {
        PhoneSettings {
            country_code: self.get_str("country_code").map(str::to_string),
        }
    }
}

impl From<Value> for Settings {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

// =============================================================================
// Labels
// =============================================================================

/// Ordered label id → text mapping of a status or dropdown column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSet {
    labels: Vec<(String, String)>,
}

impl LabelSet {
    /// Accepts `{"id": "text"}` mappings and `[{"id": .., "name": ..}]` lists.
    pub fn from_value(value: &Value) -> Self {
        let labels = match value {
            Value::Object(map) => map
                .iter()
                .map(|(id, text)| (id.clone(), value_to_text(text)))
                .collect(),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| {
                    let id = item.get("id").map(value_to_text)?;
                    let text = item
                        .get("name")
                        .or_else(|| item.get("label"))
                        .map(value_to_text)?;
                    Some((id, text))
                })
                .collect(),
            _ => Vec::new(),
        };
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(id, text)| (id.as_str(), text.as_str()))
    }

    pub fn texts(&self) -> Vec<&str> {
        self.labels.iter().map(|(_, text)| text.as_str()).collect()
    }

    /// Case-insensitive exact match on label text.
    pub fn find_by_text(&self, value: &str) -> Option<(&str, &str)> {
        let needle = value.to_lowercase();
        self.iter().find(|(_, text)| text.to_lowercase() == needle)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.labels.iter().any(|(label_id, _)| label_id == id)
    }
}

// =============================================================================
// Typed views
// =============================================================================

/// Date column settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DateSettings {
    /// IANA timezone name, `UTC` when absent.
    pub timezone: String,
    pub includes_time: bool,
}

/// Phone column settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PhoneSettings {
    /// Default region (ISO 3166 alpha-2) for numbers without a prefix.
    pub country_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_labels_from_mapping() {
        let settings = Settings::from_value(&json!({"labels": {"1": "Done", "2": "Working on it"}}));
        let labels = settings.labels().unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.find_by_text("DONE"), Some(("1", "Done")));
        assert!(labels.find_by_text("don").is_none());
    }

    #[test]
    fn test_labels_from_list() {
        let settings = Settings::from_value(&json!({
            "labels": [{"id": 1, "name": "Red"}, {"id": 2, "name": "Blue"}]
        }));
        let labels = settings.labels().unwrap();
        assert_eq!(labels.texts(), vec!["Red", "Blue"]);
        assert!(labels.contains_id("2"));
    }

    #[test]
    fn test_missing_labels() {
        assert!(Settings::default().labels().is_none());
    }

    #[test]
    fn test_numeric_accessors() {
        let settings = Settings::from_value(&json!({"max_rating": "10", "limit": 3.0}));
        assert_eq!(settings.get_i64_or("max_rating", 5), 10);
        assert_eq!(settings.get_i64_or("limit", 5), 3);
        assert_eq!(settings.get_i64_or("missing", 5), 5);
    }

    #[test]
    fn test_date_defaults() {
        let date = Settings::default().date();
        assert_eq!(date.timezone, "UTC");
        assert!(!date.includes_time);
    }
}
