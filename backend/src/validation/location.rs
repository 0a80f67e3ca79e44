//! Address geocoding.
//!
//! The lookup goes through the [`Geocoder`] trait so handlers and tests can
//! swap the provider. [`NominatimGeocoder`] talks to an OpenStreetMap
//! Nominatim search endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::GeocodeError;
use crate::models::ValidationResult;

/// Public Nominatim search endpoint.
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Coordinates of a resolved address, as sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedPlace {
    pub lat: String,
    pub lng: String,
    pub address: String,
}

impl GeocodedPlace {
    /// Placeholder for an address that could not be resolved.
    pub fn unresolved(address: &str) -> Self {
        Self {
            lat: String::new(),
            lng: String::new(),
            address: address.to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "lat": self.lat,
            "lng": self.lng,
            "address": self.address,
        })
    }

    /// Read a `{lat, lng, address}` object; numeric coordinates are accepted.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let coord = |key: &str| match map.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        };
        Some(Self {
            lat: coord("lat")?,
            lng: coord("lng")?,
            address: map.get("address")?.as_str()?.to_string(),
        })
    }
}

/// Address to coordinates lookup.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the provider knows no such place.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedPlace>, GeocodeError>;
}

// =============================================================================
// Nominatim
// =============================================================================

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

/// Nominatim search client.
#[derive(Clone)]
pub struct NominatimGeocoder {
    http: reqwest::Client,
    url: String,
    user_agent: String,
    timeout: Duration,
}

impl NominatimGeocoder {
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            user_agent: user_agent.into(),
            timeout,
        }
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new(DEFAULT_GEOCODER_URL, "boardsync", Duration::from_secs(10))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
        debug!(address, "geocoding address");
        let response = self
            .http
            .get(&self.url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodeError::Timeout
                } else {
                    GeocodeError::Service(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Service(format!("HTTP {}", status)));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        Ok(places.into_iter().next().map(|place| GeocodedPlace {
            lat: place.lat,
            lng: place.lon,
            address: place.display_name,
        }))
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Geocode `address`, turning every outcome into a [`ValidationResult`].
pub async fn validate_location(address: &str, geocoder: &dyn Geocoder) -> ValidationResult {
    if address.trim().is_empty() {
        return ValidationResult::invalid("Address cannot be empty");
    }

    match geocoder.geocode(address).await {
        Ok(Some(place)) => ValidationResult::valid_with(place.to_value()).with_message("Location found"),
        Ok(None) => ValidationResult::invalid("Location not found. Please check the address."),
        Err(GeocodeError::Timeout) => {
            warn!(address, "geocoding timed out");
            ValidationResult::invalid("Geocoding service timeout. Please try again.")
        }
        Err(e) => {
            warn!(address, error = %e, "geocoding failed");
            ValidationResult::invalid(format!("Geocoding service error: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGeocoder(Result<Option<GeocodedPlace>, GeocodeError>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn geocode(&self, _address: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
            self.0.clone()
        }
    }

    fn paris() -> GeocodedPlace {
        GeocodedPlace {
            lat: "48.85".into(),
            lng: "2.35".into(),
            address: "Paris, France".into(),
        }
    }

    #[tokio::test]
    async fn test_found() {
        let result = validate_location("Paris", &FixedGeocoder(Ok(Some(paris())))).await;
        assert!(result.is_valid);
        assert_eq!(result.message.as_deref(), Some("Location found"));
        assert_eq!(result.transformed_value.unwrap()["lng"], "2.35");
    }

    #[tokio::test]
    async fn test_failure_messages() {
        let not_found = validate_location("Nowhere", &FixedGeocoder(Ok(None))).await;
        assert_eq!(
            not_found.message.as_deref(),
            Some("Location not found. Please check the address.")
        );

        let timeout = validate_location("Paris", &FixedGeocoder(Err(GeocodeError::Timeout))).await;
        assert_eq!(
            timeout.message.as_deref(),
            Some("Geocoding service timeout. Please try again.")
        );

        let service = validate_location(
            "Paris",
            &FixedGeocoder(Err(GeocodeError::Service("HTTP 503".into()))),
        )
        .await;
        assert!(service.message.unwrap().starts_with("Geocoding service error"));
    }

    #[test]
    fn test_place_from_value() {
        let place = GeocodedPlace::from_value(&serde_json::json!({
            "lat": 48.85, "lng": "2.35", "address": "Paris"
        }))
        .unwrap();
        assert_eq!(place.lat, "48.85");
        assert!(GeocodedPlace::from_value(&serde_json::json!({"lat": "1"})).is_none());
    }
}
