//! Distance capability used by the path filter.

use crate::location::GeoPoint;

/// Mean equatorial radius used by common web mapping APIs, in meters.
pub const WGS84_EQUATORIAL_RADIUS_M: f64 = 6_378_137.0;

/// Distance in meters between two points of type `P`.
pub trait DistanceService<P> {
    fn distance_between(&self, origin: &P, destination: &P) -> f64;
}

impl<P, F> DistanceService<P> for F
where
    F: Fn(&P, &P) -> f64,
{
    fn distance_between(&self, origin: &P, destination: &P) -> f64 {
        self(origin, destination)
    }
}

/// Great-circle distance on a sphere (haversine).
#[derive(Debug, Clone, Copy)]
pub struct SphericalDistance {
    radius_m: f64,
}

impl SphericalDistance {
    pub fn new(radius_m: f64) -> Self {
        Self { radius_m }
    }
}

impl Default for SphericalDistance {
    fn default() -> Self {
        Self::new(WGS84_EQUATORIAL_RADIUS_M)
    }
}

impl DistanceService<GeoPoint> for SphericalDistance {
    fn distance_between(&self, origin: &GeoPoint, destination: &GeoPoint) -> f64 {
        let lat1 = origin.lat.to_radians();
        let lat2 = destination.lat.to_radians();
        let dlat = (destination.lat - origin.lat).to_radians();
        let dlon = (destination.lon - origin.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        // min() guards asin against rounding just above 1 for antipodal points
        let c = 2.0 * a.sqrt().min(1.0).asin();

        self.radius_m * c
    }
}
