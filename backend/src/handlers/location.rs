//! Location column: addresses resolved to coordinates.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::ColumnHandler;
use crate::cache::LocationCache;
use crate::error::TransformResult;
use crate::models::{value_to_text, ColumnKind, Settings, ValidationResult};
use crate::validation::{validate_location, GeocodedPlace, Geocoder};

/// Geocodes addresses, remembering every successful lookup.
///
/// Validation fails when the address cannot be resolved. The transform is
/// best effort: an unresolvable address becomes empty coordinates with the
/// original address, so item writes are not blocked.
pub struct LocationHandler {
    geocoder: Arc<dyn Geocoder>,
    cache: Arc<LocationCache>,
}

impl LocationHandler {
    pub fn new(geocoder: Arc<dyn Geocoder>, cache: Arc<LocationCache>) -> Self {
        Self { geocoder, cache }
    }

    pub fn cache(&self) -> &Arc<LocationCache> {
        &self.cache
    }

    async fn lookup(&self, address: &str) -> ValidationResult {
        if let Some(place) = self.cache.get(address) {
            debug!(address, "location cache hit");
            return ValidationResult::valid_with(place.to_value()).with_message("Location found (cached)");
        }

        let result = validate_location(address, self.geocoder.as_ref()).await;
        if let Some(place) = result.transformed_value.as_ref().and_then(GeocodedPlace::from_value) {
            self.cache.insert(address, place);
        }
        result
    }
}

#[async_trait]
impl ColumnHandler for LocationHandler {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Location
    }

    async fn validate_value(&self, value: &Value, _settings: &Settings) -> ValidationResult {
        if let Some(place) = GeocodedPlace::from_value(value) {
            return ValidationResult::valid_with(place.to_value()).with_message("Location coordinates provided");
        }
        self.lookup(&value_to_text(value)).await
    }

    async fn transform_value(&self, value: &Value, _settings: &Settings) -> TransformResult<Value> {
        if let Some(place) = GeocodedPlace::from_value(value) {
            return Ok(place.to_value());
        }

        let address = value_to_text(value);
        let result = self.lookup(&address).await;
        match result.transformed_value {
            Some(place) if result.is_valid => Ok(place),
            _ => {
                warn!(address = %address, reason = ?result.message, "geocoding failed, sending address only");
                Ok(GeocodedPlace::unresolved(&address).to_value())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::StubGeocoder;
    use serde_json::json;

    fn handler(geocoder: Arc<StubGeocoder>) -> LocationHandler {
        LocationHandler::new(geocoder, Arc::new(LocationCache::new()))
    }

    #[tokio::test]
    async fn test_second_lookup_served_from_cache() {
        let geocoder = Arc::new(StubGeocoder::found());
        let handler = handler(geocoder.clone());

        let first = handler.validate_value(&json!("New York"), &Settings::default()).await;
        assert_eq!(first.message.as_deref(), Some("Location found"));
        let second = handler.validate_value(&json!("New York"), &Settings::default()).await;
        assert_eq!(second.message.as_deref(), Some("Location found (cached)"));
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(handler.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_format_uses_validated_coordinates() {
        let geocoder = Arc::new(StubGeocoder::found());
        let handler = handler(geocoder.clone());
        let out = handler.format_value(&json!("Boston"), &Settings::default()).await.unwrap();
        assert_eq!(
            out.formatted_value,
            Some(json!({"lat": "40.7128", "lng": "-74.006", "address": "Boston, USA"}))
        );
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_address() {
        let handler = handler(Arc::new(StubGeocoder::missing()));

        let out = handler.format_value(&json!("Atlantis"), &Settings::default()).await.unwrap();
        assert!(out.formatted_value.is_none());
        assert_eq!(
            out.validation_result.message.as_deref(),
            Some("Location not found. Please check the address.")
        );

        // direct transform falls back to the bare address
        let placeholder = handler.transform_value(&json!("Atlantis"), &Settings::default()).await.unwrap();
        assert_eq!(placeholder, json!({"lat": "", "lng": "", "address": "Atlantis"}));
        assert!(handler.cache().is_empty());
    }

    #[tokio::test]
    async fn test_coordinates_pass_through() {
        let geocoder = Arc::new(StubGeocoder::found());
        let handler = handler(geocoder.clone());
        let place = json!({"lat": "1.5", "lng": "2.5", "address": "Somewhere"});
        let out = handler.transform_value(&place, &Settings::default()).await.unwrap();
        assert_eq!(out, place);
        assert_eq!(geocoder.calls(), 0);
    }
}
