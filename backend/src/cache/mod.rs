//! In-memory caches.
//!
//! - [`LocationCache`] - Bounded address → coordinates map owned by the
//!   location handler
//! - [`ResourceCache`] - Time-limited store for rendered board resources
//!
//! Both are explicitly constructed and shared through `Arc`; there is no
//! process-wide cache state.

pub mod location;
pub mod resource;

pub use location::{LocationCache, DEFAULT_LOCATION_CAPACITY};
pub use resource::{ResourceCache, DEFAULT_RESOURCE_TTL};
