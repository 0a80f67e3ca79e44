//! Status and dropdown columns.
//!
//! Both match the input against the column's label texts, case-insensitive.
//! On a miss, close label texts are offered as suggestions.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{rules_with, ColumnHandler};
use crate::error::{TransformError, TransformResult};
use crate::models::{value_to_text, ColumnKind, LabelSet, Settings, ValidationResult};
use crate::validation::{close_matches, MAX_SUGGESTIONS, SUGGESTION_CUTOFF};

fn non_empty_labels(settings: &Settings) -> Option<LabelSet> {
    settings.labels().filter(|labels| !labels.is_empty())
}

/// Match `value` against the label texts of `settings`.
///
/// A hit yields `{"label_id", "text"}` as the canonical value.
pub fn match_label(kind: ColumnKind, value: &Value, settings: &Settings) -> ValidationResult {
    let Some(labels) = non_empty_labels(settings) else {
        return ValidationResult::invalid(format!("No labels defined for {} column", kind));
    };

    let wanted = value_to_text(value);
    if let Some((id, text)) = labels.find_by_text(&wanted) {
        debug!(column_type = %kind, label_id = id, "exact label match");
        return ValidationResult::valid_with(json!({ "label_id": id, "text": text }))
            .with_message(format!("Valid {} value", kind));
    }

    let texts = labels.texts();
    let lowered: Vec<String> = texts.iter().map(|t| t.to_lowercase()).collect();
    let candidates: Vec<&str> = lowered.iter().map(String::as_str).collect();
    let suggestions: Vec<String> = close_matches(&wanted.to_lowercase(), &candidates, MAX_SUGGESTIONS, SUGGESTION_CUTOFF)
        .into_iter()
        .map(|idx| texts[idx].to_string())
        .collect();

    if suggestions.is_empty() {
        return ValidationResult::invalid(format!("Invalid value. Valid options are: {}", texts.join(", ")));
    }

    debug!(column_type = %kind, ?suggestions, "no exact label match");
    ValidationResult::invalid(format!(
        "Invalid value. Did you mean one of these? {}",
        suggestions.join(", ")
    ))
    .with_suggestions(suggestions)
}

/// Resolve the label id for a transform input: either the canonical
/// `{"label_id", ..}` object or a label text.
fn resolve_label_id(kind: ColumnKind, value: &Value, settings: &Settings) -> TransformResult<String> {
    let labels = non_empty_labels(settings)
        .ok_or_else(|| TransformError::invalid(kind.as_str(), "No labels defined in settings"))?;

    if let Some(id) = value.get("label_id").map(value_to_text) {
        if labels.contains_id(&id) {
            return Ok(id);
        }
        return Err(TransformError::invalid(kind.as_str(), format!("Unknown label id: {}", id)));
    }

    labels
        .find_by_text(&value_to_text(value))
        .map(|(id, _)| id.to_string())
        .ok_or_else(|| {
            TransformError::invalid(kind.as_str(), format!("Invalid {} value: {}", kind, value_to_text(value)))
        })
}

fn label_rules(kind: ColumnKind, settings: &Settings) -> Value {
    let allowed: Vec<String> = settings
        .labels()
        .map(|labels| labels.texts().into_iter().map(str::to_string).collect())
        .unwrap_or_default();
    rules_with(kind, settings, json!({ "allowed_values": allowed }))
}

pub struct StatusHandler;

#[async_trait]
impl ColumnHandler for StatusHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Status
    }

    async fn validate_value(&self, value: &Value, settings: &Settings) -> ValidationResult {
        match_label(self.kind(), value, settings)
    }

    async fn transform_value(&self, value: &Value, settings: &Settings) -> TransformResult<Value> {
        let id = resolve_label_id(self.kind(), value, settings)?;
        Ok(json!({ "index": id }))
    }

    fn validation_rules(&self, settings: &Settings) -> Value {
        label_rules(self.kind(), settings)
    }
}

pub struct DropdownHandler;

#[async_trait]
impl ColumnHandler for DropdownHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Dropdown
    }

    async fn validate_value(&self, value: &Value, settings: &Settings) -> ValidationResult {
        match_label(self.kind(), value, settings)
    }

    async fn transform_value(&self, value: &Value, settings: &Settings) -> TransformResult<Value> {
        let id = resolve_label_id(self.kind(), value, settings)?;
        Ok(json!({ "ids": [id] }))
    }

    fn validation_rules(&self, settings: &Settings) -> Value {
        label_rules(self.kind(), settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_status() -> Settings {
        Settings::from_value(&json!({"labels": {"1": "Done", "2": "Working on it"}}))
    }

    #[tokio::test]
    async fn test_status_exact_match_any_case() {
        let out = StatusHandler.format_value(&json!("done"), &board_status()).await.unwrap();
        assert_eq!(out.formatted_value, Some(json!({"index": "1"})));
        assert_eq!(out.validation_result.message.as_deref(), Some("Valid status value"));

        let out = StatusHandler.format_value(&json!("WORKING ON IT"), &board_status()).await.unwrap();
        assert_eq!(out.formatted_value, Some(json!({"index": "2"})));
    }

    #[tokio::test]
    async fn test_status_suggests_close_label() {
        let out = StatusHandler.format_value(&json!("don"), &board_status()).await.unwrap();
        assert!(out.formatted_value.is_none());
        let result = out.validation_result;
        assert!(!result.is_valid);
        assert_eq!(result.suggested_values, Some(vec!["Done".to_string()]));
        assert_eq!(
            result.message.as_deref(),
            Some("Invalid value. Did you mean one of these? Done")
        );
    }

    #[tokio::test]
    async fn test_status_lists_options_when_nothing_close() {
        let result = StatusHandler.validate_value(&json!("xyz"), &board_status()).await;
        assert!(!result.is_valid);
        assert!(result.suggested_values.is_none());
        assert_eq!(
            result.message.as_deref(),
            Some("Invalid value. Valid options are: Done, Working on it")
        );
    }

    #[tokio::test]
    async fn test_status_without_labels() {
        let result = StatusHandler.validate_value(&json!("Done"), &Settings::default()).await;
        assert_eq!(result.message.as_deref(), Some("No labels defined for status column"));
    }

    #[tokio::test]
    async fn test_transform_revalidates_membership() {
        assert!(StatusHandler.transform_value(&json!("Stuck"), &board_status()).await.is_err());
        assert!(StatusHandler
            .transform_value(&json!({"label_id": "9", "text": "Done"}), &board_status())
            .await
            .is_err());
        assert!(DropdownHandler.transform_value(&json!("Done"), &Settings::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_dropdown_ids() {
        let settings = Settings::from_value(&json!({"labels": [{"id": 3, "name": "Red"}, {"id": 4, "name": "Blue"}]}));
        let out = DropdownHandler.format_value(&json!("blue"), &settings).await.unwrap();
        assert_eq!(out.formatted_value, Some(json!({"ids": ["4"]})));
        assert_eq!(
            DropdownHandler.validation_rules(&settings)["allowed_values"],
            json!(["Red", "Blue"])
        );
    }
}
