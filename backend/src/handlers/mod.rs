//! Column type handlers.
//!
//! One [`ColumnHandler`] per column type pairs a validator with the transform
//! that produces the JSON shape the board API expects. Handlers hold no
//! per-call state; the location handler is the only one owning data (its
//! geocoding cache).
//!
//! ## Modules
//!
//! - [`basic`] - Scalar types (text, numbers, dates, contact fields, ...)
//! - [`labels`] - Status and dropdown label matching
//! - [`location`] - Geocoded addresses
//! - [`advanced`] - Object-shaped types (formula, dependency, timeline, ...)
//! - [`registry`] - Tag → handler lookup table

pub mod advanced;
pub mod basic;
pub mod labels;
pub mod location;
pub mod registry;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{TransformError, TransformResult};
use crate::models::{ColumnKind, ColumnValue, Settings, ValidationResult};

pub use registry::HandlerRegistry;

/// Validation and wire formatting for one column type.
#[async_trait]
pub trait ColumnHandler: Send + Sync {
    /// The tag this handler serves.
    fn kind(&self) -> ColumnKind;

    /// Check a raw value. Never fails: every problem becomes an invalid
    /// result.
    async fn validate_value(&self, value: &Value, settings: &Settings) -> ValidationResult;

    /// Produce the wire value. Expects the canonical value from
    /// [`validate_value`](Self::validate_value) (or the raw value when
    /// validation yields none) and rejects anything else.
    async fn transform_value(&self, value: &Value, settings: &Settings) -> TransformResult<Value>;

    /// Descriptive rules for this column, `{"type", "required"}` plus
    /// type-specific keys.
    fn validation_rules(&self, settings: &Settings) -> Value {
        base_rules(self.kind(), settings)
    }

    /// Validate, then transform. An invalid value comes back as a
    /// [`ColumnValue`] without a formatted value, and the transform step is
    /// skipped.
    async fn format_value(&self, value: &Value, settings: &Settings) -> TransformResult<ColumnValue> {
        let validation = self.validate_value(value, settings).await;
        if !validation.is_valid {
            debug!(column_type = %self.kind(), message = ?validation.message, "value rejected");
            return Ok(ColumnValue::rejected(value.clone(), validation));
        }

        let canonical = validation.transformed_value.as_ref().unwrap_or(value);
        let formatted = self.transform_value(canonical, settings).await?;
        Ok(ColumnValue {
            raw_value: value.clone(),
            formatted_value: Some(formatted),
            validation_result: validation,
        })
    }
}

/// `{"type": tag, "required": mandatory}`.
pub fn base_rules(kind: ColumnKind, settings: &Settings) -> Value {
    json!({
        "type": kind.as_str(),
        "required": settings.mandatory(),
    })
}

/// Base rules extended with `extra`'s keys.
pub(crate) fn rules_with(kind: ColumnKind, settings: &Settings, extra: Value) -> Value {
    let mut rules = base_rules(kind, settings);
    if let (Some(target), Value::Object(extra)) = (rules.as_object_mut(), extra) {
        target.extend(extra);
    }
    rules
}

/// Transform guard: re-run a validator and convert a rejection into a
/// [`TransformError`].
pub(crate) fn require_valid(kind: ColumnKind, result: ValidationResult) -> TransformResult<Value> {
    if result.is_valid {
        Ok(result.transformed_value.unwrap_or(Value::Null))
    } else {
        Err(TransformError::invalid(
            kind.as_str(),
            result.message.unwrap_or_else(|| "validation failed".to_string()),
        ))
    }
}

/// The value as an object, or a transform error naming `what`.
pub(crate) fn expect_object<'a>(
    kind: ColumnKind,
    value: &'a Value,
    what: &str,
) -> TransformResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| TransformError::invalid(kind.as_str(), format!("{} must be a dictionary", what)))
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Rejects everything and records whether transform ran.
    struct Strict {
        transformed: AtomicBool,
    }

    #[async_trait]
    impl ColumnHandler for Strict {
        fn kind(&self) -> ColumnKind {
            ColumnKind::Text
        }

        async fn validate_value(&self, _value: &Value, _settings: &Settings) -> ValidationResult {
            ValidationResult::invalid("nope")
        }

        async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
            self.transformed.store(true, Ordering::SeqCst);
            Ok(value.clone())
        }
    }

    #[tokio::test]
    async fn test_format_value_skips_transform_when_invalid() {
        let handler = Strict {
            transformed: AtomicBool::new(false),
        };
        let out = handler.format_value(&json!("x"), &Settings::default()).await.unwrap();
        assert!(out.formatted_value.is_none());
        assert_eq!(out.validation_result.message.as_deref(), Some("nope"));
        assert!(!handler.transformed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_rules_with_merges() {
        let settings = Settings::from_value(&json!({"mandatory": true}));
        let rules = rules_with(ColumnKind::Rating, &settings, json!({"max_rating": 5}));
        assert_eq!(rules, json!({"type": "rating", "required": true, "max_rating": 5}));
    }
}
