//! Trims a journey to the trailing stretch reachable within a distance or
//! time budget, anchored at the destination.

use super::distance::DistanceService;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("a path needs at least 2 points to be filtered, got {len}")]
    TooShort { len: usize },
    #[error("invalid speed: {0} km/h")]
    InvalidSpeed(f64),
}

pub struct PathFilter<D> {
    distance: D,
}

impl<D> PathFilter<D> {
    pub fn new(distance: D) -> Self {
        Self { distance }
    }

    /// Distance in meters, straight from the distance service.
    pub fn distance_between<P>(&self, origin: &P, destination: &P) -> f64
    where
        D: DistanceService<P>,
    {
        self.distance.distance_between(origin, destination)
    }

    /// Keep the trailing points of `path` whose accumulated length first
    /// reaches `distance_budget` (meters).
    ///
    /// The last two points are always kept. The budget is checked before each
    /// extra segment is added, so the result can overshoot by one segment.
    pub fn filter_by_distance<P>(&self, path: &[P], distance_budget: f64) -> Result<Vec<P>, PathError>
    where
        P: Clone,
        D: DistanceService<P>,
    {
        let n = path.len();
        if n < 2 {
            return Err(PathError::TooShort { len: n });
        }

        let mut current = self.distance_between(&path[n - 1], &path[n - 2]);
        let mut start = n - 2;

        while start > 0 && current < distance_budget {
            current += self.distance_between(&path[start], &path[start - 1]);
            start -= 1;
        }

        debug!(
            kept = n - start,
            total = n,
            accumulated_m = current,
            budget_m = distance_budget,
            "Filtered path by distance"
        );

        Ok(path[start..].to_vec())
    }

    /// Like [`filter_by_distance`](Self::filter_by_distance), with the budget
    /// being how far `speed_kmh` covers between now and `arrival`.
    pub fn filter_by_arrival_time<P>(
        &self,
        path: &[P],
        speed_kmh: f64,
        arrival: DateTime<Utc>,
    ) -> Result<Vec<P>, PathError>
    where
        P: Clone,
        D: DistanceService<P>,
    {
        self.filter_by_arrival_time_at(path, speed_kmh, arrival, Utc::now())
    }

    /// [`filter_by_arrival_time`](Self::filter_by_arrival_time) against an explicit clock.
    pub fn filter_by_arrival_time_at<P>(
        &self,
        path: &[P],
        speed_kmh: f64,
        arrival: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<P>, PathError>
    where
        P: Clone,
        D: DistanceService<P>,
    {
        if !speed_kmh.is_finite() || speed_kmh < 0.0 {
            return Err(PathError::InvalidSpeed(speed_kmh));
        }

        let seconds = (arrival - now).num_milliseconds() as f64 / 1000.0;
        let meters_per_second = speed_kmh * 1000.0 / 3600.0;

        self.filter_by_distance(path, meters_per_second * seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::cell::RefCell;

    /// Every segment has the same length, whatever the point type.
    struct Constant(f64);

    impl<P> DistanceService<P> for Constant {
        fn distance_between(&self, _: &P, _: &P) -> f64 {
            self.0
        }
    }

    fn constant(d: f64) -> PathFilter<Constant> {
        PathFilter::new(Constant(d))
    }

    #[test]
    fn distance_between_delegates_once() {
        let calls = RefCell::new(Vec::new());
        let filter = PathFilter::new(|a: &char, b: &char| {
            calls.borrow_mut().push((*a, *b));
            7.5
        });

        assert_eq!(filter.distance_between(&'a', &'b'), 7.5);
        assert_eq!(calls.into_inner(), vec![('a', 'b')]);
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::single(&['a'])]
    fn short_paths_are_rejected(#[case] path: &[char]) {
        assert_eq!(
            constant(2.0).filter_by_distance(path, 5.0),
            Err(PathError::TooShort { len: path.len() })
        );
    }

    #[test]
    fn stops_once_budget_is_met() {
        let filtered = constant(2.0).filter_by_distance(&['a', 'b', 'c', 'd'], 4.0).unwrap();
        assert_eq!(filtered, vec!['b', 'c', 'd']);
    }

    #[rstest]
    #[case(-10.0, 2)]
    #[case(0.0, 2)]
    #[case(2.0, 2)]
    #[case(2.5, 3)]
    #[case(4.0, 3)]
    #[case(4.1, 4)]
    #[case(8.0, 5)]
    #[case(10.0, 6)]
    #[case(1_000.0, 6)]
    fn keeps_trailing_points_for_budget(#[case] budget: f64, #[case] kept: usize) {
        let path = ['a', 'b', 'c', 'd', 'e', 'f'];
        let filtered = constant(2.0).filter_by_distance(&path, budget).unwrap();
        assert_eq!(filtered, path[path.len() - kept..].to_vec());
    }

    #[test]
    fn walks_backwards_pairwise() {
        let calls = RefCell::new(Vec::new());
        let filter = PathFilter::new(|a: &u32, b: &u32| {
            calls.borrow_mut().push((*a, *b));
            1.0
        });

        filter.filter_by_distance(&[0, 1, 2, 3], 100.0).unwrap();
        assert_eq!(calls.into_inner(), vec![(3, 2), (2, 1), (1, 0)]);
    }

    #[test]
    fn uneven_segments_overshoot_by_last_segment() {
        // Segment lengths from the destination backwards: 1, 1, 50, 1
        let points = [0_u32, 1, 2, 3, 4];
        let lengths = |a: &u32, b: &u32| match (*a.max(b), *a.min(b)) {
            (2, 1) => 50.0,
            _ => 1.0,
        };
        let filtered = PathFilter::new(lengths).filter_by_distance(&points, 3.0).unwrap();
        assert_eq!(filtered, vec![1, 2, 3, 4]);
    }

    #[test]
    fn result_is_a_suffix_in_input_order() {
        let path: Vec<u32> = (0..20).collect();
        for budget in [0.0, 1.0, 3.5, 7.0, 19.0, 50.0] {
            let filtered = constant(1.0).filter_by_distance(&path, budget).unwrap();
            assert!(path.ends_with(&filtered), "budget {} gave {:?}", budget, filtered);
            assert!(filtered.len() >= 2);
            assert!(filtered.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn arrival_in_the_past_yields_last_two_points() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let filter = constant(2.0);
        let path = ['a', 'b', 'c', 'd'];

        let by_time = filter
            .filter_by_arrival_time_at(&path, 50.0, now - Duration::minutes(5), now)
            .unwrap();
        assert_eq!(by_time, filter.filter_by_distance(&path, 0.0).unwrap());
        assert_eq!(by_time, vec!['c', 'd']);
    }

    #[test]
    fn arrival_time_converts_to_distance_budget() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        // 36 km/h = 10 m/s, 1 s -> 10 m budget
        let filter = constant(4.0);
        let path = ['a', 'b', 'c', 'd', 'e', 'f'];

        let filtered = filter
            .filter_by_arrival_time_at(&path, 36.0, now + Duration::seconds(1), now)
            .unwrap();
        // 4 < 10, 8 < 10, 12 >= 10
        assert_eq!(filtered, vec!['c', 'd', 'e', 'f']);
    }

    #[test]
    fn arrival_time_in_future_with_wall_clock() {
        let filter = constant(1.0);
        let path = ['a', 'b', 'c', 'd'];
        let filtered = filter
            .filter_by_arrival_time(&path, 3_600.0, Utc::now() + Duration::hours(1))
            .unwrap();
        assert_eq!(filtered, path.to_vec());
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn invalid_speed_is_rejected(#[case] speed: f64) {
        let now = Utc::now();
        let result = constant(1.0).filter_by_arrival_time_at(&['a', 'b'], speed, now, now);
        assert!(matches!(result, Err(PathError::InvalidSpeed(_))));
    }

    #[test]
    fn zero_speed_gives_minimal_result() {
        let now = Utc::now();
        let filtered = constant(1.0)
            .filter_by_arrival_time_at(&['a', 'b', 'c'], 0.0, now + Duration::hours(2), now)
            .unwrap();
        assert_eq!(filtered, vec!['b', 'c']);
    }
}
