//! Layered configuration: built-in defaults, an optional TOML file and
//! `GEOTRAIL_*` environment variables, in increasing priority.

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_FILE: &str = "geotrail";
const ENV_PREFIX: &str = "GEOTRAIL";

const DEFAULTS: &str = r#"
[geocoder]
base_url = "https://nominatim.openstreetmap.org"
user_agent = "geotrail/0.3 (waypoint-filter)"
timeout_secs = 10

[locator]
base_url = "https://ipapi.co"
user_agent = "geotrail/0.3"
timeout_secs = 5

[distance]
earth_radius_m = 6378137.0
"#;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    geocoder: ServiceConfig,
    locator: ServiceConfig,
    distance: DistanceConfig,
}

impl AppConfig {
    /// Load defaults, then `geotrail.toml` from the working directory if present,
    /// then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name(DEFAULT_FILE).required(false))
    }

    /// Load defaults, then the given file (which must exist), then environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::build(File::from(path).required(true))
    }

    fn build<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = Config::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("_").separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn geocoder(&self) -> &ServiceConfig {
        &self.geocoder
    }

    pub fn locator(&self) -> &ServiceConfig {
        &self.locator
    }

    pub fn distance(&self) -> &DistanceConfig {
        &self.distance
    }
}

/// Connection settings for one HTTP-backed capability.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    base_url: String,
    user_agent: String,
    timeout_secs: u64,
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            timeout_secs: 10,
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistanceConfig {
    earth_radius_m: f64,
}

impl DistanceConfig {
    pub fn earth_radius_m(&self) -> f64 {
        self.earth_radius_m
    }
}
