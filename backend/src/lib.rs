//! # Boardsync - typed column validation for monday.com boards
//!
//! Boardsync checks values against a board's column types and turns them into
//! the JSON shapes the board API accepts, so agents and scripts can create
//! and update items without knowing each column's wire format.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Raw value  │────▶│ BoardSchema │────▶│  Handler    │────▶│ Wire value  │
//! │ (any JSON)  │     │ (column id) │     │ (per type)  │     │ (board API) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use boardsync::{BoardTools, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tools = BoardTools::from_config(&Config::from_env().unwrap());
//!     let result = tools.validate_column_value("status", &"done".into()).await;
//!     println!("{}", result);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per concern
//! - [`models`] - ValidationResult, column kinds and settings
//! - [`validation`] - Primitive validators (dates, contacts, colors, ...)
//! - [`handlers`] - One handler per column type, and the registry
//! - [`cache`] - Location and resource caches
//! - [`schema`] - Board schema cache
//! - [`client`] - GraphQL board API client
//! - [`config`] - Environment configuration
//! - [`tools`] - Tool and resource operations
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Validation
pub mod handlers;
pub mod validation;

// Caching
pub mod cache;
pub mod schema;

// Upstream
pub mod client;
pub mod config;

// Operations
pub mod tools;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ClientError, ClientResult, ConfigError, GeocodeError, SchemaError, SchemaResult, ServerError,
    TransformError, TransformResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    ColumnDefinition, ColumnKind, ColumnSettings, ColumnValue, DateSettings, LabelSet, PhoneSettings,
    Settings, ValidationResult,
};

// =============================================================================
// Re-exports - Handlers
// =============================================================================

pub use handlers::{ColumnHandler, HandlerRegistry};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{close_matches, normalize_text, GeocodedPlace, Geocoder, NominatimGeocoder};

// =============================================================================
// Re-exports - Caches and schema
// =============================================================================

pub use cache::{LocationCache, ResourceCache};
pub use schema::{BoardSchema, BoardSnapshot, SchemaProvider, SchemaState};

// =============================================================================
// Re-exports - Client, config, tools
// =============================================================================

pub use client::{BoardApi, MondayClient};
pub use config::Config;
pub use tools::BoardTools;

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
