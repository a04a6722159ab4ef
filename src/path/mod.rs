//! Waypoint path filtering by distance or arrival-time budget.

pub mod distance;
pub mod filter;

pub use distance::{DistanceService, SphericalDistance, WGS84_EQUATORIAL_RADIUS_M};
pub use filter::{PathError, PathFilter};
