// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Great-circle distance helpers for GPS tracks.

use geo::{LineString, Point};

/// Mean Earth radius used for track distances (meters).
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance between two points in meters.
///
/// Points use `x` = longitude and `y` = latitude, in degrees.
pub fn haversine_distance(a: Point<f64>, b: Point<f64>) -> f64 {
    let d_lat = (b.y() - a.y()).to_radians();
    let d_lon = (b.x() - a.x()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.y().to_radians().cos() * b.y().to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Total length of a track, summed over consecutive points in order.
///
/// Returns 0 for tracks with fewer than two points.
pub fn path_distance(track: &LineString<f64>) -> f64 {
    track
        .lines()
        .map(|segment| haversine_distance(segment.start_point(), segment.end_point()))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = Point::new(-122.4194, 37.7749);
        assert_eq!(haversine_distance(p, p), 0.0);
    }

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let d = haversine_distance(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        let expected = EARTH_RADIUS_METERS * 1.0_f64.to_radians(); // ~111,195 m
        assert!((d - expected).abs() / expected < 0.001, "got {}", d);
        assert!((d - 111_195.0).abs() < 5.0, "got {}", d);
    }

    #[test]
    fn test_short_paths_are_zero() {
        let empty: LineString<f64> = LineString::new(vec![]);
        assert_eq!(path_distance(&empty), 0.0);

        let single = LineString::from(vec![(-122.0, 37.0)]);
        assert_eq!(path_distance(&single), 0.0);
    }

    #[test]
    fn test_path_is_order_sensitive() {
        let forward = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]);
        let sorted = LineString::from(vec![(0.0, 0.0), (0.0, 0.0), (1.0, 0.0)]);
        assert!(path_distance(&forward) > path_distance(&sorted) * 1.5);
    }

    #[test]
    fn test_duplicate_tail_adds_nothing() {
        let base = LineString::from(vec![(-122.0, 37.0), (-122.01, 37.01)]);
        let padded = LineString::from(vec![(-122.0, 37.0), (-122.01, 37.01), (-122.01, 37.01)]);
        assert_eq!(path_distance(&base), path_distance(&padded));
    }
}
