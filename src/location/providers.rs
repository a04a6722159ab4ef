//! Location and geocoding capabilities: the traits the provider consumes,
//! plus IP-based geolocation, fixed coordinates and Nominatim reverse geocoding.

use super::types::{AddressCandidate, GeoPoint, Position, SourceError};
use crate::config::ServiceConfig;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// A one-shot "where am I" capability.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Whether the capability exists on this host at all.
    fn is_supported(&self) -> bool;

    /// Query the current position once.
    async fn current_position(&self) -> Result<Position, SourceError>;
}

/// Coordinates to addresses.
#[async_trait]
pub trait GeocodingService: Send + Sync {
    /// Candidates for `point`, most specific first.
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<Vec<AddressCandidate>, SourceError>;
}

fn agent(config: &ServiceConfig) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(config.timeout())
        .user_agent(config.user_agent())
        .build()
}

fn map_ureq_error(e: ureq::Error) -> SourceError {
    match e {
        ureq::Error::Status(403, _) => SourceError::Denied,
        other => SourceError::Network(other.to_string()),
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, SourceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SourceError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SourceError::Task(e.to_string()))?
}

// ─── IP-based geolocation ───────────────────────────────────────

#[derive(Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    error: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
}

/// Locates the host by its public IP through an ipapi.co compatible service.
pub struct IpApiSource {
    config: ServiceConfig,
    offline: bool,
}

impl IpApiSource {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config, offline: false }
    }

    /// Offline mode reports the capability as missing.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    fn fetch(config: &ServiceConfig) -> Result<Position, SourceError> {
        let url = format!("{}/json/", config.base_url());
        debug!(%url, "Querying IP geolocation");

        let response = agent(config).get(&url).call().map_err(map_ureq_error)?;
        let r: IpApiResult = response
            .into_json()
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        if r.error.unwrap_or(false) {
            return Err(SourceError::InvalidResponse(
                r.reason.unwrap_or_else(|| "provider reported an error".into()),
            ));
        }

        let lat = r.latitude.ok_or_else(|| SourceError::InvalidResponse("no latitude".into()))?;
        let lon = r.longitude.ok_or_else(|| SourceError::InvalidResponse("no longitude".into()))?;

        Ok(Position {
            coords: GeoPoint::new(lat, lon),
            accuracy: r.accuracy,
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl LocationSource for IpApiSource {
    fn is_supported(&self) -> bool {
        !self.offline && !self.config.base_url().is_empty()
    }

    async fn current_position(&self) -> Result<Position, SourceError> {
        let config = self.config.clone();
        run_blocking(move || Self::fetch(&config)).await
    }
}

// ─── Fixed coordinates ──────────────────────────────────────────

/// A source that always reports the same, manually supplied point.
#[derive(Debug, Clone, Copy)]
pub struct FixedSource {
    point: GeoPoint,
}

impl FixedSource {
    pub fn new(point: GeoPoint) -> Self {
        Self { point }
    }
}

#[async_trait]
impl LocationSource for FixedSource {
    fn is_supported(&self) -> bool {
        true
    }

    async fn current_position(&self) -> Result<Position, SourceError> {
        Ok(Position::now(self.point))
    }
}

// ─── Nominatim reverse geocoding ────────────────────────────────

#[derive(Deserialize, Debug)]
struct NominatimReverse {
    #[serde(default)]
    lat: Option<String>,
    #[serde(default)]
    lon: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default, rename = "type")]
    place_type: Option<String>,
    #[serde(default)]
    address: BTreeMap<String, String>,
    #[serde(default)]
    error: Option<String>,
}

const LOCALITY_KEYS: &[&str] = &["city", "town", "village", "hamlet", "municipality"];

/// Reverse geocoding against an OpenStreetMap Nominatim instance.
///
/// Nominatim answers a reverse query with a single place, so the candidate
/// list is widened from its address breakdown: the full display name first,
/// then locality, region and finally the country on its own.
pub struct NominatimGeocoder {
    config: ServiceConfig,
    offline: bool,
}

impl NominatimGeocoder {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config, offline: false }
    }

    /// Offline mode fails every lookup without touching the network.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    fn fetch(config: &ServiceConfig, point: GeoPoint) -> Result<Vec<AddressCandidate>, SourceError> {
        let url = format!("{}/reverse", config.base_url());
        debug!(%url, %point, "Reverse geocoding");

        let response = agent(config)
            .get(&url)
            .query("lat", &point.lat.to_string())
            .query("lon", &point.lon.to_string())
            .query("format", "jsonv2")
            .query("addressdetails", "1")
            .call()
            .map_err(map_ureq_error)?;

        let body: NominatimReverse = response
            .into_json()
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        Ok(candidates_from(body))
    }
}

#[async_trait]
impl GeocodingService for NominatimGeocoder {
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<Vec<AddressCandidate>, SourceError> {
        if self.offline {
            debug!(%point, "Offline, skipping reverse geocoding");
            return Err(SourceError::Offline);
        }
        let config = self.config.clone();
        run_blocking(move || Self::fetch(&config, point)).await
    }
}

fn candidates_from(body: NominatimReverse) -> Vec<AddressCandidate> {
    if let Some(err) = &body.error {
        debug!(error = %err, "Nominatim returned no place");
        return Vec::new();
    }
    let Some(display_name) = body.display_name.filter(|d| !d.trim().is_empty()) else {
        return Vec::new();
    };

    let location = match (body.lat.as_deref(), body.lon.as_deref()) {
        (Some(lat), Some(lon)) => match (lat.parse(), lon.parse()) {
            (Ok(lat), Ok(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        },
        _ => None,
    };

    let mut top = AddressCandidate::new(display_name);
    if let Some(location) = location {
        top = top.with_location(location);
    }
    if let Some(kind) = body.place_type {
        top = top.with_kind(kind);
    }

    let address = &body.address;
    let locality = LOCALITY_KEYS.iter().find_map(|k| address.get(*k)).map(String::as_str);
    let state = address.get("state").map(String::as_str);
    let country = address.get("country").map(String::as_str);

    let mut candidates = vec![top];
    let mut push = |parts: &[Option<&str>], kind: &str| {
        let text = parts.iter().flatten().copied().collect::<Vec<_>>().join(", ");
        if text.is_empty() || candidates.iter().any(|c| c.formatted_address == text) {
            return;
        }
        candidates.push(AddressCandidate::new(text).with_kind(kind));
    };

    if locality.is_some() {
        push(&[locality, state, country], "locality");
    }
    if state.is_some() {
        push(&[state, country], "administrative_area");
    }
    push(&[country], "country");

    candidates
}
