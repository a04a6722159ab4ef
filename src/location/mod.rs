//! Location subsystem for geotrail.
//!
//! Detects the host's position through an injected [`LocationSource`],
//! keeps the last fix, and turns it into an address through an injected
//! [`GeocodingService`].

pub mod detector;
pub mod providers;
pub mod types;

pub use detector::PositionProvider;
pub use providers::{FixedSource, GeocodingService, IpApiSource, LocationSource, NominatimGeocoder};
pub use types::{AddressCandidate, DetectionError, GeoPoint, Position, SourceError};
