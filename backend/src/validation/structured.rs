//! Validators for object-shaped column values.
//!
//! Each validator accepts its own canonical output, so handlers can re-run
//! it as a guard inside `transform_value`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::models::{is_truthy, value_to_text, Settings, ValidationResult};

static FUNCTION_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*\(.*\)$").expect("static regex"));

/// Default cap on `depends_on` + `required_for` entries.
pub const DEFAULT_MAX_DEPENDENCIES: i64 = 50;

// =============================================================================
// Enumerations
// =============================================================================

/// Result type declared by a formula column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaType {
    Number,
    Text,
    Date,
    Time,
    Boolean,
}

impl FormulaType {
    pub const ALL: [FormulaType; 5] = [
        FormulaType::Number,
        FormulaType::Text,
        FormulaType::Date,
        FormulaType::Time,
        FormulaType::Boolean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Text => "text",
            Self::Date => "date",
            Self::Time => "time",
            Self::Boolean => "boolean",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }
}

/// State of a time tracking column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeTrackingStatus {
    Running,
    Stopped,
    Completed,
}

impl TimeTrackingStatus {
    pub const ALL: [TimeTrackingStatus; 3] = [
        TimeTrackingStatus::Running,
        TimeTrackingStatus::Stopped,
        TimeTrackingStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

fn object<'a>(value: &'a Value, message: &str) -> Result<&'a Map<String, Value>, ValidationResult> {
    value
        .as_object()
        .ok_or_else(|| ValidationResult::invalid(message))
}

// =============================================================================
// Formula
// =============================================================================

/// The formula's declared result type, `text` when unset.
pub fn formula_result_type(settings: &Settings) -> String {
    settings
        .get_str("result_type")
        .unwrap_or(FormulaType::Text.as_str())
        .to_string()
}

pub fn validate_formula(value: &Value, settings: &Settings) -> ValidationResult {
    let formula = match value {
        Value::Object(map) => map.get("formula").map(value_to_text).unwrap_or_default(),
        other => value_to_text(other),
    };
    if formula.trim().is_empty() {
        return ValidationResult::invalid("Formula cannot be empty");
    }

    let result_type = formula_result_type(settings);
    if FormulaType::parse(&result_type).is_none() {
        let valid: Vec<&str> = FormulaType::ALL.iter().map(FormulaType::as_str).collect();
        return ValidationResult::invalid(format!(
            "Invalid result_type '{}'. Valid types: {}",
            result_type,
            valid.join(", ")
        ));
    }

    for func in settings.get_string_list("allowed_functions") {
        if !formula.contains(&func) {
            continue;
        }
        if !FUNCTION_CALL.is_match(&func) {
            return ValidationResult::invalid(format!("Invalid function syntax: {}", func));
        }
    }

    ValidationResult::valid_with(json!({
        "formula": formula,
        "result_type": result_type,
    }))
}

// =============================================================================
// Connect boards
// =============================================================================

pub fn validate_connect_boards(value: &Value, settings: &Settings) -> ValidationResult {
    let map = match object(value, "Value must be a dictionary with board_id and item_ids") {
        Ok(map) => map,
        Err(result) => return result,
    };

    let board_id = map.get("board_id").cloned().unwrap_or(Value::Null);
    if !is_truthy(&board_id) {
        return ValidationResult::invalid("board_id is required");
    }

    let item_ids = map.get("item_ids").cloned().unwrap_or_else(|| json!([]));
    if !item_ids.is_array() {
        return ValidationResult::invalid("item_ids must be a list");
    }

    let allowed = settings.get_string_list("allowed_boards");
    let board_text = value_to_text(&board_id);
    if !allowed.is_empty() && !allowed.contains(&board_text) {
        return ValidationResult::invalid(format!(
            "Board {} not allowed. Valid boards: {}",
            board_text,
            allowed.join(", ")
        ));
    }

    ValidationResult::valid_with(json!({
        "board_id": board_id,
        "item_ids": item_ids,
    }))
}

// =============================================================================
// Time tracking
// =============================================================================

pub fn validate_time_tracking(value: &Value) -> ValidationResult {
    let map = match object(value, "Value must be a dictionary with status and duration") {
        Ok(map) => map,
        Err(result) => return result,
    };

    let status = map.get("status").and_then(Value::as_str).and_then(TimeTrackingStatus::parse);
    let Some(status) = status else {
        let valid: Vec<&str> = TimeTrackingStatus::ALL.iter().map(TimeTrackingStatus::as_str).collect();
        return ValidationResult::invalid(format!("Invalid status. Valid values: {}", valid.join(", ")));
    };

    let duration = match map.get("duration") {
        None => Some(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(_) => None,
    };
    let duration = match duration {
        Some(d) if d.is_finite() && d >= 0.0 => d,
        _ => return ValidationResult::invalid("Duration must be a non-negative number"),
    };

    ValidationResult::valid_with(json!({
        "status": status.as_str(),
        "duration": duration.trunc() as i64,
    }))
}

// =============================================================================
// Dependency
// =============================================================================

pub fn validate_dependency(value: &Value, settings: &Settings) -> ValidationResult {
    let map = match object(value, "Value must be a dictionary with depends_on and required_for lists") {
        Ok(map) => map,
        Err(result) => return result,
    };

    let depends_on = map.get("depends_on").cloned().unwrap_or_else(|| json!([]));
    let required_for = map.get("required_for").cloned().unwrap_or_else(|| json!([]));
    let (Some(deps), Some(reqs)) = (depends_on.as_array(), required_for.as_array()) else {
        return ValidationResult::invalid("depends_on and required_for must be lists");
    };

    let max = settings.get_i64_or("max_dependencies", DEFAULT_MAX_DEPENDENCIES);
    if (deps.len() + reqs.len()) as i64 > max {
        return ValidationResult::invalid(format!("Total dependencies cannot exceed {}", max));
    }

    let blocking = map.get("blocking").is_some_and(is_truthy);
    ValidationResult::valid_with(json!({
        "depends_on": depends_on,
        "required_for": required_for,
        "blocking": blocking,
    }))
}

// =============================================================================
// Progress
// =============================================================================

/// Progress as a number, numeric string or `{progress, auto_progress}`.
pub fn validate_progress(value: &Value) -> ValidationResult {
    let (progress, auto_progress) = match value {
        Value::Object(map) => {
            let progress = match map.get("progress") {
                None => Some(0.0),
                Some(Value::Number(n)) => n.as_f64(),
                Some(_) => None,
            };
            (progress, map.get("auto_progress").is_some_and(is_truthy))
        }
        Value::Number(n) => (n.as_f64(), false),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(p) => (Some(p), false),
            Err(_) => return ValidationResult::invalid("Progress must be a number between 0 and 100"),
        },
        _ => return ValidationResult::invalid("Progress must be a number between 0 and 100"),
    };

    match progress {
        Some(p) if (0.0..=100.0).contains(&p) => ValidationResult::valid_with(json!({
            "progress": p,
            "auto_progress": auto_progress,
        })),
        _ => ValidationResult::invalid("Progress must be between 0 and 100"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(value: Value) -> Settings {
        Settings::from_value(&value)
    }

    #[test]
    fn test_formula_defaults_and_idempotence() {
        let result = validate_formula(&json!("SUM({a}, {b})"), &Settings::default());
        assert!(result.is_valid);
        let canonical = result.transformed_value.unwrap();
        assert_eq!(canonical["result_type"], "text");

        let again = validate_formula(&canonical, &Settings::default());
        assert_eq!(again.transformed_value.unwrap(), canonical);
    }

    #[test]
    fn test_formula_rejections() {
        assert!(!validate_formula(&json!("   "), &Settings::default()).is_valid);
        assert!(!validate_formula(&json!("x"), &settings(json!({"result_type": "blob"}))).is_valid);

        let s = settings(json!({"allowed_functions": ["SUM"]}));
        let result = validate_formula(&json!("SUM(1)"), &s);
        assert_eq!(result.message.as_deref(), Some("Invalid function syntax: SUM"));
    }

    #[test]
    fn test_connect_boards() {
        let s = settings(json!({"allowed_boards": ["100", "200"]}));
        assert!(validate_connect_boards(&json!({"board_id": "100", "item_ids": [1, 2]}), &s).is_valid);
        assert!(validate_connect_boards(&json!({"board_id": 100}), &s).is_valid);
        assert!(!validate_connect_boards(&json!({"board_id": "300"}), &s).is_valid);
        assert!(!validate_connect_boards(&json!({"item_ids": []}), &s).is_valid);
        assert!(!validate_connect_boards(&json!({"board_id": "100", "item_ids": "1"}), &s).is_valid);
        assert!(!validate_connect_boards(&json!("100"), &s).is_valid);
    }

    #[test]
    fn test_time_tracking() {
        let result = validate_time_tracking(&json!({"status": "running", "duration": 90.7}));
        assert_eq!(result.transformed_value.unwrap(), json!({"status": "running", "duration": 90}));
        assert!(!validate_time_tracking(&json!({"status": "paused"})).is_valid);
        assert!(!validate_time_tracking(&json!({"status": "stopped", "duration": -1})).is_valid);
        assert!(!validate_time_tracking(&json!({"status": "stopped", "duration": "5"})).is_valid);
    }

    #[test]
    fn test_dependency_limits() {
        let s = settings(json!({"max_dependencies": 2}));
        let ok = validate_dependency(&json!({"depends_on": ["1"], "required_for": ["2"], "blocking": 1}), &s);
        assert_eq!(ok.transformed_value.unwrap()["blocking"], true);

        let too_many = validate_dependency(&json!({"depends_on": ["1", "2", "3"]}), &s);
        assert_eq!(too_many.message.as_deref(), Some("Total dependencies cannot exceed 2"));

        assert!(!validate_dependency(&json!({"depends_on": "1"}), &s).is_valid);
    }

    #[test]
    fn test_progress_boundaries() {
        assert!(validate_progress(&json!(0)).is_valid);
        assert!(validate_progress(&json!(100)).is_valid);
        assert!(!validate_progress(&json!(-0.01)).is_valid);
        assert!(!validate_progress(&json!(100.01)).is_valid);
        assert!(validate_progress(&json!("42.5")).is_valid);
        assert!(!validate_progress(&json!("lots")).is_valid);

        let result = validate_progress(&json!({"progress": 50, "auto_progress": true}));
        assert_eq!(
            result.transformed_value.unwrap(),
            json!({"progress": 50.0, "auto_progress": true})
        );
    }
}
