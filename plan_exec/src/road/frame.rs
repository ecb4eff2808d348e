//! # Road-relative frame transforms
//!
//! Converts between world-frame positions and road-relative `(s, d)`
//! coordinates by projecting onto the waypoint map.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Point2, Vector2};

// Internal
use super::map::RoadMap;
use util::maths;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position in the road-relative frame.
///
/// `s_m` is longitudinal progress along the track centre line, wrapped into
/// `[0, track_length_m)`. `d_m` is signed lateral offset, positive towards
/// the lanes (the right of travel).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadCoord {
    /// Longitudinal position along the track
    pub s_m: f64,

    /// Signed lateral offset from the track centre line
    pub d_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RoadMap {
    /// Transform a world-frame pose into road-relative coordinates.
    ///
    /// The heading selects the waypoint segment ahead of travel, the
    /// position is projected onto that segment, and the lateral offset is
    /// signed by the segment's stored lateral unit vector. The returned
    /// `s_m` is wrapped into `[0, track_length_m)`.
    pub fn to_road(&self, pos_m: Point2<f64>, heading_rad: f64) -> RoadCoord {
        let next = self.next_waypoint(pos_m, heading_rad);
        let prev = if next == 0 {
            self.num_waypoints() - 1
        }
        else {
            next - 1
        };

        let next_wp = &self.waypoints()[next];
        let prev_wp = &self.waypoints()[prev];

        let seg = next_wp.pos_m - prev_wp.pos_m;
        let rel = pos_m - prev_wp.pos_m;

        // Longitudinal progress along the segment and the perpendicular
        // residual from the projection onto it
        let along_m = rel.dot(&seg) / seg.norm();
        let proj = seg * (rel.dot(&seg) / seg.norm_squared());
        let residual = rel - proj;

        RoadCoord {
            s_m: maths::rem_euclid(prev_wp.s_m + along_m, self.track_length_m()),
            d_m: residual.dot(&prev_wp.d_unit),
        }
    }

    /// Transform road-relative coordinates into a world-frame position.
    ///
    /// `s_m` must already be wrapped into `[0, track_length_m)`. The point
    /// is placed along the waypoint segment containing `s_m`, then shifted
    /// laterally perpendicular to that segment's heading.
    pub fn to_world(&self, s_m: f64, d_m: f64) -> Point2<f64> {
        let prev = self
            .waypoints()
            .iter()
            .rposition(|wp| wp.s_m <= s_m)
            .unwrap_or(self.num_waypoints() - 1);
        let next = (prev + 1) % self.num_waypoints();

        let prev_wp = &self.waypoints()[prev];
        let next_wp = &self.waypoints()[next];

        let seg = next_wp.pos_m - prev_wp.pos_m;
        let heading_rad = seg.y.atan2(seg.x);

        let along_m = maths::rem_euclid(s_m - prev_wp.s_m, self.track_length_m());

        let on_centre = prev_wp.pos_m
            + along_m * Vector2::new(heading_rad.cos(), heading_rad.sin());

        // Positive d is to the right of travel
        let perp_rad = heading_rad - std::f64::consts::FRAC_PI_2;

        on_centre + d_m * Vector2::new(perp_rad.cos(), perp_rad.sin())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_straight_to_world() {
        let map = RoadMap::test_straight(10, 10.0);

        // Positive d is to the right of eastward travel, i.e. negative y
        let pos_m = map.to_world(25.0, 2.0);
        assert!((pos_m.x - 25.0).abs() < 1e-9);
        assert!((pos_m.y - -2.0).abs() < 1e-9);

        let pos_m = map.to_world(25.0, -2.0);
        assert!((pos_m.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_straight_round_trip() {
        let map = RoadMap::test_straight(10, 10.0);

        let pos_m = map.to_world(43.0, 6.0);
        let coord = map.to_road(pos_m, 0.0);

        assert!((coord.s_m - 43.0).abs() < 1e-9);
        assert!((coord.d_m - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_lateral_sign_symmetry() {
        let map = RoadMap::test_straight(10, 10.0);

        let right = map.to_road(Point2::new(25.0, -2.0), 0.0);
        let left = map.to_road(Point2::new(25.0, 2.0), 0.0);

        assert!((right.d_m - 2.0).abs() < 1e-9);
        assert!((left.d_m + 2.0).abs() < 1e-9);
        assert!((right.s_m - left.s_m).abs() < 1e-9);
    }

    #[test]
    fn test_circle_round_trip() {
        let map = RoadMap::test_circle(250.0, 64);

        // Lateral recovery picks up a small cosine error from the angle
        // between the chord perpendicular and the stored radial vector
        for &s_m in &[10.0, 300.0, 777.7, 1500.0] {
            for &d_m in &[0.0, 2.0, 6.0] {
                let pos_m = map.to_world(s_m, d_m);

                let theta_rad = s_m / 250.0;
                let heading_rad = theta_rad + std::f64::consts::FRAC_PI_2;

                let coord = map.to_road(pos_m, heading_rad);

                assert!(
                    (coord.s_m - s_m).abs() < 1e-6,
                    "s {} recovered as {}",
                    s_m,
                    coord.s_m
                );
                assert!(
                    (coord.d_m - d_m).abs() < 0.05,
                    "d {} recovered as {}",
                    d_m,
                    coord.d_m
                );
            }
        }
    }

    #[test]
    fn test_circle_round_trip_at_seam() {
        let map = RoadMap::test_circle(250.0, 64);
        let track_length_m = map.track_length_m();

        let s_m = track_length_m - 5.0;
        let pos_m = map.to_world(s_m, 2.0);

        let theta_rad = s_m / 250.0;
        let coord = map.to_road(pos_m, theta_rad + std::f64::consts::FRAC_PI_2);

        assert!((coord.s_m - s_m).abs() < 1e-6);
        assert!((coord.d_m - 2.0).abs() < 0.05);

        // Queries just past the seam land back near the start
        let coord = map.to_road(
            map.to_world(1.0, 0.0),
            std::f64::consts::FRAC_PI_2,
        );
        assert!(coord.s_m >= 0.0 && coord.s_m < track_length_m);
        assert!((coord.s_m - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_to_road_output_in_range() {
        let map = RoadMap::test_circle(250.0, 64);

        // A pose just behind the first waypoint projects onto the seam
        // segment and must report an s near the track end, inside the range
        let coord = map.to_road(
            Point2::new(250.0, -1.0),
            std::f64::consts::FRAC_PI_2,
        );

        assert!(coord.s_m >= 0.0 && coord.s_m < map.track_length_m());
        assert!(coord.s_m > map.track_length_m() - 2.0);
    }
}
