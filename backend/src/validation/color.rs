//! Hex color parsing with derived RGB/HSV metadata.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::models::{value_to_text, ValidationResult};

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}){1,2}$").expect("static regex"));

/// Convert RGB fractions in `[0, 1]` to HSV fractions in `[0, 1]`.
pub fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let v = max;
    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, v);
    }
    let delta = max - min;
    let s = delta / max;
    let rc = (max - r) / delta;
    let gc = (max - g) / delta;
    let bc = (max - b) / delta;
    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    ((h / 6.0).rem_euclid(1.0), s, v)
}

/// Expand `#RGB` to `#RRGGBB` and return the six hex digits.
fn full_hex(color: &str) -> String {
    let digits = color.trim_start_matches('#');
    if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    }
}

/// Validate a color given as a hex string or `{color, label}` object.
pub fn validate_color_picker(value: &Value) -> ValidationResult {
    let (color, label) = match value {
        Value::Object(map) => (
            map.get("color").map(value_to_text).unwrap_or_default(),
            map.get("label").map(value_to_text).unwrap_or_default(),
        ),
        other => (value_to_text(other), String::new()),
    };

    if !HEX_COLOR.is_match(&color) {
        return ValidationResult::invalid("Invalid color format. Must be hex code (e.g. #FF0000)");
    }

    let hex = full_hex(&color);
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map(|c| f64::from(c) / 255.0)
            .ok()
    };
    let (Some(r), Some(g), Some(b)) = (channel(0), channel(2), channel(4)) else {
        return ValidationResult::invalid("Error converting color format");
    };
    let (h, s, v) = rgb_to_hsv(r, g, b);

    ValidationResult::valid_with(json!({
        "color": color,
        "label": label,
        "metadata": {
            "rgb": [r, g, b],
            "hsv": [h, s, v],
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_red_metadata() {
        let result = validate_color_picker(&json!("#FF0000"));
        assert!(result.is_valid);
        let value = result.transformed_value.unwrap();
        assert_eq!(value["color"], "#FF0000");
        assert_eq!(value["metadata"]["rgb"], json!([1.0, 0.0, 0.0]));
        assert_eq!(value["metadata"]["hsv"], json!([0.0, 1.0, 1.0]));
    }

    #[test]
    fn test_short_form_and_label() {
        let result = validate_color_picker(&json!({"color": "#0f0", "label": "Green"}));
        assert!(result.is_valid);
        let value = result.transformed_value.unwrap();
        assert_eq!(value["label"], "Green");
        assert_eq!(value["metadata"]["rgb"], json!([0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_rejects_names_and_bad_hex() {
        for input in [json!("red"), json!("#12345"), json!("FF0000"), json!({"label": "x"})] {
            assert!(!validate_color_picker(&input).is_valid);
        }
    }

    #[test]
    fn test_hsv_hue_wraps() {
        // magenta-ish: red is max, blue above green gives a negative raw hue
        let (h, s, v) = rgb_to_hsv(1.0, 0.0, 0.5);
        assert!(h > 0.9 && h < 1.0);
        assert_eq!(s, 1.0);
        assert_eq!(v, 1.0);
    }
}
