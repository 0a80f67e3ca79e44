//! Handlers for scalar column types.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};

use super::{require_valid, rules_with, ColumnHandler};
use crate::error::{TransformError, TransformResult};
use crate::models::{value_to_text, ColumnKind, Settings, ValidationResult};
use crate::validation::{normalize_text, validate_date, validate_email, validate_phone, validate_url};

/// Strings a checkbox reads as checked.
const CHECKED_WORDS: [&str; 6] = ["true", "1", "yes", "y", "on", "checked"];

/// Default upper bound of a rating column.
pub const DEFAULT_MAX_RATING: i64 = 5;

/// A finite number given as a JSON number or numeric string.
pub(crate) fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// An integer given as a JSON number (truncated) or integer string.
fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

// =============================================================================
// Text
// =============================================================================

/// Short text, also used for the item name column.
pub struct TextHandler {
    kind: ColumnKind,
}

impl TextHandler {
    pub fn new(kind: ColumnKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl ColumnHandler for TextHandler {
    fn kind(&self) -> ColumnKind {
        self.kind
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        let normalized = normalize_text(&value_to_text(value));
        if normalized.is_empty() {
            return ValidationResult::invalid("Text cannot be empty after normalization");
        }
        ValidationResult::valid_with(json!(normalized))
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let normalized = normalize_text(&value_to_text(value));
        if normalized.is_empty() {
            return Err(TransformError::invalid(self.kind.as_str(), "Text cannot be empty after normalization"));
        }
        Ok(json!({ "text": normalized }))
    }
}

pub struct LongTextHandler;

#[async_trait]
impl ColumnHandler for LongTextHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::LongText
    }

    async fn validate_value(&self, _value: &Value, _settings: &Settings) -> ValidationResult {
        ValidationResult::valid()
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        Ok(json!({ "text": value_to_text(value) }))
    }
}

// =============================================================================
// Numbers
// =============================================================================

pub struct NumberHandler;

#[async_trait]
impl ColumnHandler for NumberHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Numeric
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        match parse_number(value) {
            Some(n) => ValidationResult::valid_with(json!(n)),
            None => ValidationResult::invalid(format!("Invalid number value: {}", value_to_text(value))),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let number = parse_number(value).ok_or_else(|| {
            TransformError::invalid("numeric", format!("Invalid number value: {}", value_to_text(value)))
        })?;
        Ok(json!({ "number": number }))
    }
}

pub struct RatingHandler;

impl RatingHandler {
    fn check(value: &Value, settings: &Settings) -> Result<i64, String> {
        let max = settings.get_i64_or("max_rating", DEFAULT_MAX_RATING);
        let rating = parse_number(value)
            .map(|n| n.trunc() as i64)
            .ok_or_else(|| format!("Invalid rating value: {}", value_to_text(value)))?;
        if (0..=max).contains(&rating) {
            Ok(rating)
        } else {
            Err(format!("Rating must be between 0 and {}", max))
        }
    }
}

#[async_trait]
impl ColumnHandler for RatingHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Rating
    }

    async fn validate_value(&self, value: &Value, settings: &Settings) -> ValidationResult {
        match Self::check(value, settings) {
            Ok(rating) => ValidationResult::valid_with(json!(rating)),
            Err(message) => ValidationResult::invalid(message),
        }
    }

    async fn transform_value(&self, value: &Value, settings: &Settings) -> TransformResult<Value> {
        let rating = Self::check(value, settings).map_err(|m| TransformError::invalid("rating", m))?;
        Ok(json!({ "rating": rating }))
    }

    fn validation_rules(&self, settings: &Settings) -> Value {
        rules_with(
            self.kind(),
            settings,
            json!({ "max_rating": settings.get_i64_or("max_rating", DEFAULT_MAX_RATING) }),
        )
    }
}

pub struct AutoNumberHandler;

#[async_trait]
impl ColumnHandler for AutoNumberHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::AutoNumber
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        match parse_integer(value) {
            Some(n) if n < 0 => ValidationResult::invalid("Auto number must be positive"),
            Some(n) => ValidationResult::valid_with(json!(n)),
            None => ValidationResult::invalid("Invalid auto number format"),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        match parse_integer(value) {
            Some(n) if n >= 0 => Ok(json!({ "number": n })),
            _ => Err(TransformError::invalid("auto_number", "Auto number must be a non-negative integer")),
        }
    }
}

// =============================================================================
// Dates and times
// =============================================================================

pub struct DateHandler;

#[async_trait]
impl ColumnHandler for DateHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Date
    }

    async fn validate_value(&self, value: &Value, settings: &Settings) -> ValidationResult {
        validate_date(&value_to_text(value), &settings.date())
    }

    /// Keeps the date part of an already normalized value; the timezone is
    /// applied during validation only.
    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let text = value_to_text(value);
        let date = text.split('T').next().unwrap_or_default().trim();
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| TransformError::invalid("date", format!("Invalid date format: {}", e)))?;
        Ok(json!({ "date": date }))
    }

    fn validation_rules(&self, settings: &Settings) -> Value {
        let date = settings.date();
        rules_with(
            self.kind(),
            settings,
            json!({
                "format": "ISO8601",
                "includes_time": date.includes_time,
                "timezone": date.timezone,
            }),
        )
    }
}

pub struct HourHandler;

impl HourHandler {
    fn check(value: &Value) -> Result<String, &'static str> {
        let Value::String(raw) = value else {
            return Err("Hour must be in HH:MM format");
        };
        let (hours, minutes) = raw.trim().split_once(':').ok_or("Invalid hour format")?;
        let hours: u32 = hours.trim().parse().map_err(|_| "Invalid hour format")?;
        let minutes: u32 = minutes.trim().parse().map_err(|_| "Invalid hour format")?;
        if hours > 23 || minutes > 59 {
            return Err("Invalid hour/minute values");
        }
        Ok(format!("{:02}:{:02}", hours, minutes))
    }
}

#[async_trait]
impl ColumnHandler for HourHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Hour
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        match Self::check(value) {
            Ok(hour) => ValidationResult::valid_with(json!(hour)),
            Err(message) => ValidationResult::invalid(message),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let hour = Self::check(value).map_err(|m| TransformError::invalid("hour", m))?;
        Ok(json!({ "hour": hour }))
    }
}

pub struct WeekHandler;

impl WeekHandler {
    fn check(value: &Value) -> Result<(i64, i64), &'static str> {
        let map = value.as_object().ok_or("Week value must be a dictionary")?;
        let week = match map.get("week") {
            None => 0,
            Some(w) => parse_integer(w).ok_or("Invalid week/year format")?,
        };
        let year = match map.get("year") {
            None => i64::from(Utc::now().year()),
            Some(y) => parse_integer(y).ok_or("Invalid week/year format")?,
        };
        if !(1..=53).contains(&week) {
            return Err("Week must be between 1 and 53");
        }
        if year < 1900 {
            return Err("Invalid year");
        }
        Ok((week, year))
    }
}

#[async_trait]
impl ColumnHandler for WeekHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Week
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        match Self::check(value) {
            Ok((week, year)) => ValidationResult::valid_with(json!({ "week": week, "year": year })),
            Err(message) => ValidationResult::invalid(message),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let (week, year) = Self::check(value).map_err(|m| TransformError::invalid("week", m))?;
        Ok(json!({ "week": week, "year": year }))
    }
}

pub struct WorldClockHandler;

#[async_trait]
impl ColumnHandler for WorldClockHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::WorldClock
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        let name = value_to_text(value);
        match name.trim().parse::<Tz>() {
            Ok(tz) => ValidationResult::valid_with(json!(tz.name())),
            Err(_) => ValidationResult::invalid(format!("Invalid timezone: {}", name)),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let name = value_to_text(value);
        let tz: Tz = name
            .trim()
            .parse()
            .map_err(|_| TransformError::invalid("world_clock", format!("Invalid timezone: {}", name)))?;
        Ok(json!({ "timezone": tz.name() }))
    }
}

// =============================================================================
// Contact fields
// =============================================================================

pub struct EmailHandler;

#[async_trait]
impl ColumnHandler for EmailHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Email
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        let result = validate_email(&value_to_text(value));
        if result.is_valid {
            result.with_message("Email is valid")
        } else {
            result
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let email = require_valid(self.kind(), validate_email(&value_to_text(value)))?;
        Ok(json!({ "email": email, "text": email }))
    }
}

pub struct PhoneHandler;

#[async_trait]
impl ColumnHandler for PhoneHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Phone
    }

    async fn validate_value(&self, value: &Value, settings: &Settings) -> ValidationResult {
        let result = validate_phone(&value_to_text(value), &settings.phone());
        if result.is_valid {
            result.with_message("Phone number is valid")
        } else {
            result
        }
    }

    async fn transform_value(&self, value: &Value, settings: &Settings) -> TransformResult<Value> {
        let phone_settings = settings.phone();
        let phone = require_valid(self.kind(), validate_phone(&value_to_text(value), &phone_settings))?;
        Ok(json!({
            "phone": phone,
            "code": phone_settings.country_code.unwrap_or_default(),
        }))
    }

    fn validation_rules(&self, settings: &Settings) -> Value {
        rules_with(self.kind(), settings, json!({ "country_code": settings.phone().country_code }))
    }
}

/// Link given as a URL string or a `{url, text}` object.
pub struct LinkHandler;

impl LinkHandler {
    fn check(value: &Value) -> ValidationResult {
        let (url, text) = match value {
            Value::Object(map) => (
                map.get("url").map(value_to_text).unwrap_or_default(),
                map.get("text").map(value_to_text).filter(|t| !t.trim().is_empty()),
            ),
            other => (value_to_text(other), None),
        };

        let result = validate_url(&url);
        match result.transformed_value {
            Some(Value::String(normalized)) if result.is_valid => {
                let text = text.unwrap_or_else(|| normalized.clone());
                ValidationResult::valid_with(json!({ "url": normalized, "text": text }))
                    .with_message("Valid URL")
            }
            _ => result,
        }
    }
}

#[async_trait]
impl ColumnHandler for LinkHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Link
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        Self::check(value)
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        require_valid(self.kind(), Self::check(value))
    }
}

pub struct CountryHandler;

impl CountryHandler {
    fn check(value: &Value) -> Result<String, String> {
        let raw = value_to_text(value);
        let code = raw.trim();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(code.to_ascii_uppercase())
        } else {
            Err(format!("Invalid country code: '{}' (expected two letters, e.g. US)", raw))
        }
    }
}

#[async_trait]
impl ColumnHandler for CountryHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Country
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        match Self::check(value) {
            Ok(code) => ValidationResult::valid_with(json!(code)),
            Err(message) => ValidationResult::invalid(message),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let code = Self::check(value).map_err(|m| TransformError::invalid("country", m))?;
        Ok(json!({ "country_code": code }))
    }
}

// =============================================================================
// Flags and collections
// =============================================================================

pub struct CheckboxHandler;

#[async_trait]
impl ColumnHandler for CheckboxHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Checkbox
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        match value {
            Value::Bool(_) | Value::Number(_) | Value::String(_) => ValidationResult::valid(),
            other => ValidationResult::invalid(format!("Invalid checkbox value: {}", other)),
        }
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let checked = match value {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => {
                let s = s.trim().to_lowercase();
                CHECKED_WORDS.contains(&s.as_str())
            }
            other => {
                return Err(TransformError::invalid("checkbox", format!("Invalid checkbox value: {}", other)));
            }
        };
        Ok(json!({ "checked": checked }))
    }
}

/// Wrap a scalar into a one-element list; lists pass through.
fn as_list(value: &Value) -> Value {
    match value {
        Value::Array(_) => value.clone(),
        other => json!([value_to_text(other)]),
    }
}

pub struct TagsHandler;

#[async_trait]
impl ColumnHandler for TagsHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Tags
    }

    async fn validate_value(&self, _value: &Value, _settings: &Settings) -> ValidationResult {
        ValidationResult::valid()
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        Ok(json!({ "tag_ids": as_list(value) }))
    }
}

pub struct FileHandler;

#[async_trait]
impl ColumnHandler for FileHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::File
    }

    async fn validate_value(&self, _value: &Value, _settings: &Settings) -> ValidationResult {
        ValidationResult::valid()
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        Ok(json!({ "files": as_list(value) }))
    }
}

pub struct ItemIdHandler;

#[async_trait]
impl ColumnHandler for ItemIdHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::ItemId
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        let id = value_to_text(value);
        if id.trim().is_empty() {
            return ValidationResult::invalid("Item ID cannot be empty");
        }
        ValidationResult::valid_with(json!(id))
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        let id = value_to_text(value);
        if id.trim().is_empty() {
            return Err(TransformError::invalid("item_id", "Item ID cannot be empty"));
        }
        Ok(json!({ "id": id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none() -> Settings {
        Settings::default()
    }

    async fn format(handler: &dyn ColumnHandler, value: Value, settings: &Settings) -> Option<Value> {
        handler.format_value(&value, settings).await.unwrap().formatted_value
    }

    #[tokio::test]
    async fn test_text_normalizes() {
        let handler = TextHandler::new(ColumnKind::Text);
        assert_eq!(
            format(&handler, json!("Café   test"), &none()).await,
            Some(json!({"text": "Cafe test"}))
        );
        let empty = handler.validate_value(&json!("   "), &none()).await;
        assert_eq!(empty.message.as_deref(), Some("Text cannot be empty after normalization"));
    }

    #[tokio::test]
    async fn test_number() {
        let handler = NumberHandler;
        assert_eq!(format(&handler, json!("42.5"), &none()).await, Some(json!({"number": 42.5})));
        assert_eq!(format(&handler, json!(3), &none()).await, Some(json!({"number": 3.0})));
        let bad = handler.validate_value(&json!("abc"), &none()).await;
        assert_eq!(bad.message.as_deref(), Some("Invalid number value: abc"));
        assert!(!handler.validate_value(&json!("inf"), &none()).await.is_valid);
    }

    #[tokio::test]
    async fn test_rating_bounds() {
        let handler = RatingHandler;
        let settings = Settings::from_value(&json!({"max_rating": 5}));
        assert!(!handler.validate_value(&json!(6), &settings).await.is_valid);
        assert_eq!(format(&handler, json!(5), &settings).await, Some(json!({"rating": 5})));
        assert_eq!(format(&handler, json!("3.9"), &settings).await, Some(json!({"rating": 3})));
        assert!(handler.transform_value(&json!(7), &settings).await.is_err());
        assert_eq!(handler.validation_rules(&settings)["max_rating"], 5);
    }

    #[tokio::test]
    async fn test_date_emits_utc_day() {
        let handler = DateHandler;
        let settings = Settings::from_value(&json!({"timezone": "Asia/Tokyo"}));
        assert_eq!(
            format(&handler, json!("2024-03-15"), &settings).await,
            Some(json!({"date": "2024-03-14"}))
        );
        assert!(handler.transform_value(&json!("15/03/2024"), &none()).await.is_err());

        let rules = handler.validation_rules(&settings);
        assert_eq!(rules["timezone"], "Asia/Tokyo");
        assert_eq!(rules["format"], "ISO8601");
    }

    #[tokio::test]
    async fn test_email() {
        let handler = EmailHandler;
        assert_eq!(
            format(&handler, json!("ann@Example.org"), &none()).await,
            Some(json!({"email": "ann@example.org", "text": "ann@example.org"}))
        );
        assert!(format(&handler, json!("ann.example.org"), &none()).await.is_none());
        assert!(handler.transform_value(&json!("nope"), &none()).await.is_err());
    }

    #[tokio::test]
    async fn test_phone_echoes_country_code() {
        let handler = PhoneHandler;
        let settings = Settings::from_value(&json!({"country_code": "US"}));
        let out = format(&handler, json!("650-253-0000"), &settings).await.unwrap();
        assert_eq!(out["code"], "US");
        assert!(out["phone"].as_str().unwrap().starts_with("+1"));
    }

    #[tokio::test]
    async fn test_checkbox_words() {
        let handler = CheckboxHandler;
        for word in ["yes", "Y", "on", "Checked", "1", "true"] {
            assert_eq!(format(&handler, json!(word), &none()).await, Some(json!({"checked": true})));
        }
        assert_eq!(format(&handler, json!("no"), &none()).await, Some(json!({"checked": false})));
        assert_eq!(format(&handler, json!(0), &none()).await, Some(json!({"checked": false})));
        assert!(!handler.validate_value(&json!([true]), &none()).await.is_valid);
    }

    #[tokio::test]
    async fn test_link_forms() {
        let handler = LinkHandler;
        assert_eq!(
            format(&handler, json!("example.com"), &none()).await,
            Some(json!({"url": "https://example.com", "text": "https://example.com"}))
        );
        assert_eq!(
            format(&handler, json!({"url": "http://a.io", "text": "A"}), &none()).await,
            Some(json!({"url": "http://a.io", "text": "A"}))
        );
        assert!(format(&handler, json!("not a url"), &none()).await.is_none());
    }

    #[tokio::test]
    async fn test_lists_wrap_scalars() {
        assert_eq!(format(&TagsHandler, json!(7), &none()).await, Some(json!({"tag_ids": ["7"]})));
        assert_eq!(format(&TagsHandler, json!([1, 2]), &none()).await, Some(json!({"tag_ids": [1, 2]})));
        assert_eq!(
            format(&FileHandler, json!("a.pdf"), &none()).await,
            Some(json!({"files": ["a.pdf"]}))
        );
    }

    #[tokio::test]
    async fn test_hour_week_country_clock() {
        assert_eq!(format(&HourHandler, json!("9:05"), &none()).await, Some(json!({"hour": "09:05"})));
        assert!(format(&HourHandler, json!("24:00"), &none()).await.is_none());
        assert!(format(&HourHandler, json!(905), &none()).await.is_none());

        assert_eq!(
            format(&WeekHandler, json!({"week": 12, "year": 2024}), &none()).await,
            Some(json!({"week": 12, "year": 2024}))
        );
        assert!(format(&WeekHandler, json!({"week": 54}), &none()).await.is_none());
        assert!(format(&WeekHandler, json!({"week": 2, "year": 1850}), &none()).await.is_none());

        assert_eq!(
            format(&CountryHandler, json!("fr"), &none()).await,
            Some(json!({"country_code": "FR"}))
        );
        assert!(format(&CountryHandler, json!("France"), &none()).await.is_none());

        assert_eq!(
            format(&WorldClockHandler, json!("Europe/Paris"), &none()).await,
            Some(json!({"timezone": "Europe/Paris"}))
        );
        assert!(format(&WorldClockHandler, json!("Paris"), &none()).await.is_none());
    }

    #[tokio::test]
    async fn test_ids_and_counters() {
        assert_eq!(format(&ItemIdHandler, json!(123), &none()).await, Some(json!({"id": "123"})));
        assert!(format(&ItemIdHandler, json!(" "), &none()).await.is_none());
        assert_eq!(format(&AutoNumberHandler, json!("17"), &none()).await, Some(json!({"number": 17})));
        let negative = AutoNumberHandler.validate_value(&json!(-1), &none()).await;
        assert_eq!(negative.message.as_deref(), Some("Auto number must be positive"));
    }
}
