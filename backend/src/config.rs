//! Runtime configuration from the environment.
//!
//! A `.env` file in the working directory is loaded first (if present), then
//! the variables below are read:
//!
//! | Variable | Default |
//! |---|---|
//! | `MONDAY_API_KEY` | none (required to load a board) |
//! | `MONDAY_BOARD_ID` | none (required to load a board) |
//! | `MONDAY_API_URL` | `https://api.monday.com/v2` |
//! | `GEOCODER_URL` | Nominatim search endpoint |
//! | `GEOCODER_USER_AGENT` | `boardsync` |
//! | `GEOCODE_TIMEOUT_SECS` | 10 |
//! | `API_TIMEOUT_SECS` | 30 |
//! | `SCHEMA_TTL_SECS` | 300 |
//! | `LOCATION_CACHE_CAPACITY` | 1000 |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::cache::DEFAULT_LOCATION_CAPACITY;
use crate::client::DEFAULT_API_URL;
use crate::error::ConfigError;
use crate::validation::DEFAULT_GEOCODER_URL;

pub const DEFAULT_USER_AGENT: &str = "boardsync";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub board_id: Option<String>,
    pub api_url: String,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    pub geocode_timeout: Duration,
    pub api_timeout: Duration,
    pub schema_ttl: Duration,
    pub location_cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            board_id: None,
            api_url: DEFAULT_API_URL.to_string(),
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            geocoder_user_agent: DEFAULT_USER_AGENT.to_string(),
            geocode_timeout: Duration::from_secs(10),
            api_timeout: Duration::from_secs(30),
            schema_ttl: Duration::from_secs(300),
            location_cache_capacity: DEFAULT_LOCATION_CAPACITY,
        }
    }
}

impl Config {
    /// Load `.env`, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!(
            board_id = config.board_id.as_deref().unwrap_or("<unset>"),
            api_key_set = config.api_key.is_some(),
            api_url = %config.api_url,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            api_key: get("MONDAY_API_KEY"),
            board_id: get("MONDAY_BOARD_ID"),
            api_url: get("MONDAY_API_URL").unwrap_or(defaults.api_url),
            geocoder_url: get("GEOCODER_URL").unwrap_or(defaults.geocoder_url),
            geocoder_user_agent: get("GEOCODER_USER_AGENT").unwrap_or(defaults.geocoder_user_agent),
            geocode_timeout: parse_or("GEOCODE_TIMEOUT_SECS", get("GEOCODE_TIMEOUT_SECS"), 10).map(Duration::from_secs)?,
            api_timeout: parse_or("API_TIMEOUT_SECS", get("API_TIMEOUT_SECS"), 30).map(Duration::from_secs)?,
            schema_ttl: parse_or("SCHEMA_TTL_SECS", get("SCHEMA_TTL_SECS"), 300).map(Duration::from_secs)?,
            location_cache_capacity: parse_or(
                "LOCATION_CACHE_CAPACITY",
                get("LOCATION_CACHE_CAPACITY"),
                DEFAULT_LOCATION_CAPACITY,
            )?,
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
            value,
        }),
    }
}
