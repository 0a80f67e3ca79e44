//! Per-type validators.
//!
//! Pure functions for the primitive concerns shared by column handlers.
//! Every validator returns a [`ValidationResult`](crate::models::ValidationResult)
//! and never fails; only geocoding performs I/O.
//!
//! # Example
//!
//! ```rust,ignore
//! use boardsync::validation::{validate_date, close_matches};
//! use boardsync::models::Settings;
//!
//! let result = validate_date("15/03/2024", &Settings::default().date());
//! assert_eq!(result.transformed_value.unwrap(), "2024-03-15");
//! ```

pub mod color;
pub mod contact;
pub mod date;
pub mod fuzzy;
pub mod location;
pub mod structured;
pub mod text;

pub use color::{rgb_to_hsv, validate_color_picker};
pub use contact::{validate_email, validate_phone, validate_url};
pub use date::{parse_iso_timestamp, validate_date, DATE_FORMATS};
pub use fuzzy::{close_matches, similarity_ratio, MAX_SUGGESTIONS, SUGGESTION_CUTOFF};
pub use location::{validate_location, GeocodedPlace, Geocoder, NominatimGeocoder, DEFAULT_GEOCODER_URL};
pub use structured::{
    formula_result_type, validate_connect_boards, validate_dependency, validate_formula,
    validate_progress, validate_time_tracking, FormulaType, TimeTrackingStatus,
};
pub use text::normalize_text;
