//! Error types for the board column pipeline.
//!
//! This module defines the error hierarchy used across the crate:
//!
//! - [`TransformError`] - A handler was asked to transform a value it rejects
//! - [`GeocodeError`] - Geocoding provider failures
//! - [`ClientError`] - Upstream GraphQL API failures
//! - [`ConfigError`] - Malformed environment configuration
//! - [`SchemaError`] - Board schema lookup, refresh and formatting failures
//! - [`ServerError`] - HTTP layer errors
//!
//! Validation failures are not errors: they travel as
//! [`ValidationResult`](crate::models::ValidationResult) values.

use thiserror::Error;

use crate::models::ValidationResult;

// =============================================================================
// Transform Errors
// =============================================================================

/// Raised when `transform_value` receives data that did not pass validation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransformError {
    /// The value is not acceptable for this column type.
    #[error("Invalid value for {column_type} column: {message}")]
    InvalidValue {
        column_type: String,
        message: String,
    },
}

impl TransformError {
    pub fn invalid(column_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            column_type: column_type.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Geocoding Errors
// =============================================================================

/// Errors from the geocoding provider.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeocodeError {
    /// The lookup exceeded its timeout.
    #[error("Geocoding service timeout")]
    Timeout,

    /// The provider answered with an error or could not be reached.
    #[error("Geocoding service error: {0}")]
    Service(String),

    /// The provider answered with something we cannot read.
    #[error("Invalid geocoding response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Upstream Client Errors
// =============================================================================

/// Errors from the upstream board API client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing API key.
    #[error("Missing MONDAY_API_KEY environment variable")]
    MissingApiKey,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The API answered with GraphQL errors or a non-success status.
    #[error("API error: {0}")]
    Api(String),

    /// The response body could not be decoded.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::RequestFailed(err.to_string())
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value we cannot parse.
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors from the board schema cache.
///
/// Lookup failures ([`SchemaError::UnknownColumn`],
/// [`SchemaError::NoHandler`]) are kept apart from
/// [`SchemaError::InvalidValue`] so callers can tell an unsupported column
/// from a bad value.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Required identifiers (API key, board id) are missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The upstream response does not have the expected board structure.
    #[error("Invalid API response format: {0}")]
    Data(String),

    /// The schema has not been loaded yet.
    #[error("Board schema is not initialized")]
    NotInitialized,

    /// No column with this id (or title) exists on the board.
    #[error("Unknown column ID: {0}")]
    UnknownColumn(String),

    /// The column type has no registered handler.
    #[error("No handler available for column type: {0}")]
    NoHandler(String),

    /// The value failed validation; the failing result is carried untouched.
    #[error("Invalid value for column {column_id}: {}", result.message.as_deref().unwrap_or("validation failed"))]
    InvalidValue {
        column_id: String,
        result: ValidationResult,
    },

    /// The upstream API call failed.
    #[error("Upstream error: {0}")]
    Upstream(#[from] ClientError),
}

impl SchemaError {
    /// Stable machine-readable code for tool responses.
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::Config(_) => "configuration_error",
            SchemaError::Data(_) => "data_error",
            SchemaError::NotInitialized => "not_initialized",
            SchemaError::UnknownColumn(_) => "unknown_column",
            SchemaError::NoHandler(_) => "unsupported_column_type",
            SchemaError::InvalidValue { .. } => "invalid_value",
            SchemaError::Upstream(ClientError::MissingApiKey) => "configuration_error",
            SchemaError::Upstream(_) => "upstream_error",
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind or serve.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Upstream client could not be built.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for upstream client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let client_err = ClientError::Api("board not found".into());
        let schema_err: SchemaError = client_err.into();
        assert!(schema_err.to_string().contains("board not found"));
        assert_eq!(schema_err.code(), "upstream_error");
    }

    #[test]
    fn test_lookup_codes_are_distinct_from_invalid_value() {
        let unknown = SchemaError::UnknownColumn("status_1".into());
        let unsupported = SchemaError::NoHandler("mystery".into());
        let invalid = SchemaError::InvalidValue {
            column_id: "status_1".into(),
            result: ValidationResult::invalid("Invalid value"),
        };
        assert_eq!(unknown.code(), "unknown_column");
        assert_eq!(unsupported.code(), "unsupported_column_type");
        assert_eq!(invalid.code(), "invalid_value");
        assert!(invalid.to_string().contains("Invalid value"));
    }

    #[test]
    fn test_transform_error_format() {
        let err = TransformError::invalid("rating", "Rating must be between 0 and 5");
        let msg = err.to_string();
        assert!(msg.contains("rating"));
        assert!(msg.contains("between 0 and 5"));
    }

    #[test]
    fn test_missing_api_key_is_configuration() {
        let err: SchemaError = ClientError::MissingApiKey.into();
        assert_eq!(err.code(), "configuration_error");
    }
}
