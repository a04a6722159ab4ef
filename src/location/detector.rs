//! Position provider: one-shot detection, a single-slot cache of the last
//! known position and reverse geocoding of that cached position.
//!
//! Concurrent `detect()` calls are not coalesced. Each one queries the source,
//! and the cache holds whichever result completed last, which is not
//! necessarily the most recently issued query.

use super::providers::{GeocodingService, LocationSource};
use super::types::{DetectionError, GeoPoint, Position};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, instrument, warn};

pub struct PositionProvider<S, G> {
    source: S,
    geocoder: G,
    enabled: bool,
    last_known_position: Mutex<Option<GeoPoint>>,
}

impl<S, G> PositionProvider<S, G>
where
    S: LocationSource,
    G: GeocodingService,
{
    /// Build a provider. Availability of the source is checked here, once.
    pub fn new(source: S, geocoder: G) -> Self {
        let enabled = source.is_supported();
        if !enabled {
            debug!("Location source is not supported on this host");
        }
        Self {
            source,
            geocoder,
            enabled,
            last_known_position: Mutex::new(None),
        }
    }

    pub fn is_available(&self) -> bool {
        self.enabled
    }

    /// Last successfully detected coordinates, if any.
    pub fn current_position(&self) -> Option<GeoPoint> {
        *self.cache()
    }

    /// Query the source once and cache the coordinates on success.
    ///
    /// When the source is unavailable this resolves to
    /// [`DetectionError::Unavailable`] on the first poll, without suspending
    /// and without calling the source.
    #[instrument(skip(self))]
    pub async fn detect(&self) -> Result<Position, DetectionError> {
        if !self.enabled {
            return Err(DetectionError::Unavailable);
        }

        let position = self.source.current_position().await.map_err(|e| {
            warn!("⚠️ Location query failed: {}", e);
            DetectionError::QueryFailed(e)
        })?;

        *self.cache() = Some(position.coords);
        info!(position = %position.coords, "📍 Position updated");

        Ok(position)
    }

    /// Reverse geocode the cached position.
    ///
    /// The geocoder lists candidates from most to least specific; the last
    /// (coarsest) one is returned.
    #[instrument(skip(self))]
    pub async fn detect_address(&self) -> Result<String, DetectionError> {
        let point = self.current_position().ok_or(DetectionError::NoPosition)?;

        let candidates = self.geocoder.reverse_geocode(point).await.map_err(|e| {
            warn!("⚠️ Reverse geocoding failed: {}", e);
            DetectionError::GeocodingFailed(e)
        })?;
        debug!(count = candidates.len(), "Received address candidates");

        candidates
            .into_iter()
            .last()
            .map(|c| c.formatted_address)
            .ok_or(DetectionError::NoAddressFound)
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, Option<GeoPoint>> {
        self.last_known_position.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
