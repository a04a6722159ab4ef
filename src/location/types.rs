//! Core types for the location subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A latitude/longitude pair in decimal degrees.
///
/// No range validation is performed; values are handed to the external
/// capabilities exactly as given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0.0 { 'E' } else { 'W' };
        write!(f, "{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", self.lat.abs(), ns, self.lon.abs(), ew)
    }
}

/// Raw payload of a successful location query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coords: GeoPoint,
    /// Accuracy radius in meters, when the source reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn now(coords: GeoPoint) -> Self {
        Self {
            coords,
            accuracy: None,
            timestamp: Utc::now(),
        }
    }
}

/// One address returned by a reverse geocoding service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressCandidate {
    pub formatted_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Place type reported by the provider (e.g. "street_address", "country").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl AddressCandidate {
    pub fn new(formatted_address: impl Into<String>) -> Self {
        Self {
            formatted_address: formatted_address.into(),
            location: None,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }
}

/// Failure reported by an external location or geocoding capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("permission denied")]
    Denied,
    #[error("offline mode, network access disabled")]
    Offline,
    #[error("background task failed: {0}")]
    Task(String),
}

/// Errors surfaced by [`PositionProvider`](super::PositionProvider).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("location capability is not available on this host")]
    Unavailable,
    #[error("location query failed: {0}")]
    QueryFailed(SourceError),
    #[error("no position has been detected yet")]
    NoPosition,
    #[error("no address found for the current position")]
    NoAddressFound,
    #[error("reverse geocoding failed: {0}")]
    GeocodingFailed(SourceError),
}
