//! # Road map
//!
//! Loading, validation, and waypoint queries for the track centre-line map.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Point2, Vector2};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// Internal
use util::maths;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance on the norm of a waypoint's lateral unit vector.
const LATERAL_UNIT_TOL: f64 = 1e-3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single waypoint on the track centre line.
#[derive(Debug, Clone)]
pub struct Waypoint {
    /// Position of the waypoint in the world frame
    pub pos_m: Point2<f64>,

    /// Longitudinal position of the waypoint along the track
    pub s_m: f64,

    /// Unit vector from the waypoint towards positive lateral offsets
    pub d_unit: Vector2<f64>,
}

/// One record of the map file: `x y s dx dy`, space separated, no header.
#[derive(Debug, Deserialize)]
struct WaypointRecord {
    x_m: f64,
    y_m: f64,
    s_m: f64,
    d_unit_x: f64,
    d_unit_y: f64,
}

/// The waypoint map of the track centre line.
///
/// Waypoints are ordered by strictly increasing `s_m`. The track is a closed
/// loop: after the final waypoint it continues back to the first, and `s`
/// wraps at `track_length_m`. Immutable once built.
pub struct RoadMap {
    waypoints: Vec<Waypoint>,
    track_length_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with loading and validating a road map.
#[derive(Debug, Error)]
pub enum RoadMapError {
    #[error("Cannot read the map file: {0}")]
    FileReadError(csv::Error),

    #[error("A road map needs at least two waypoints, got {0}")]
    TooFewWaypoints(usize),

    #[error("Track length must be positive, got {0}")]
    InvalidTrackLength(f64),

    #[error(
        "Waypoint s values must start at or above zero and strictly increase \
        (violated at waypoint {0})"
    )]
    NonMonotonicS(usize),

    #[error("Waypoint {0} has s = {1} m, at or beyond the track length of {2} m")]
    WaypointBeyondTrackEnd(usize, f64, f64),

    #[error("Waypoint {0} lateral unit vector has norm {1}, expected 1")]
    NonUnitLateral(usize, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RoadMap {
    /// Load a road map from the given file.
    ///
    /// The file is space-delimited with one `x y s dx dy` record per line,
    /// where `(dx, dy)` is the unit vector towards positive lateral offsets.
    /// `track_length_m` is the full longitudinal length of the closed loop,
    /// which the file itself does not carry.
    pub fn load<P: AsRef<Path>>(
        map_file: P,
        track_length_m: f64
    ) -> Result<Self, RoadMapError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b' ')
            .from_path(map_file)
            .map_err(RoadMapError::FileReadError)?;

        let mut waypoints: Vec<Waypoint> = Vec::new();

        for record in reader.deserialize() {
            let record: WaypointRecord = record.map_err(RoadMapError::FileReadError)?;

            waypoints.push(Waypoint {
                pos_m: Point2::new(record.x_m, record.y_m),
                s_m: record.s_m,
                d_unit: Vector2::new(record.d_unit_x, record.d_unit_y),
            });
        }

        Self::from_waypoints(waypoints, track_length_m)
    }

    /// Build a road map from an already constructed waypoint list.
    ///
    /// Validates the same invariants as [`RoadMap::load`].
    pub fn from_waypoints(
        waypoints: Vec<Waypoint>,
        track_length_m: f64
    ) -> Result<Self, RoadMapError> {
        if waypoints.len() < 2 {
            return Err(RoadMapError::TooFewWaypoints(waypoints.len()));
        }

        if track_length_m <= 0.0 {
            return Err(RoadMapError::InvalidTrackLength(track_length_m));
        }

        if waypoints[0].s_m < 0.0 {
            return Err(RoadMapError::NonMonotonicS(0));
        }

        for i in 1..waypoints.len() {
            if waypoints[i].s_m <= waypoints[i - 1].s_m {
                return Err(RoadMapError::NonMonotonicS(i));
            }
        }

        // The final waypoint must sit before the track end so the seam
        // segment back to the first waypoint has positive length
        let last = waypoints.len() - 1;
        if waypoints[last].s_m >= track_length_m {
            return Err(RoadMapError::WaypointBeyondTrackEnd(
                last,
                waypoints[last].s_m,
                track_length_m,
            ));
        }

        for (i, waypoint) in waypoints.iter().enumerate() {
            let norm = waypoint.d_unit.norm();
            if (norm - 1.0).abs() > LATERAL_UNIT_TOL {
                return Err(RoadMapError::NonUnitLateral(i, norm));
            }
        }

        Ok(Self {
            waypoints,
            track_length_m,
        })
    }

    /// The waypoints of the map in longitudinal order.
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Number of waypoints in the map.
    pub fn num_waypoints(&self) -> usize {
        self.waypoints.len()
    }

    /// Full longitudinal length of the closed loop.
    pub fn track_length_m(&self) -> f64 {
        self.track_length_m
    }

    /// Get the index of the waypoint closest to the given position.
    pub fn closest_waypoint(&self, pos_m: Point2<f64>) -> usize {
        let mut closest = 0;
        let mut closest_dist_m = f64::INFINITY;

        for (i, waypoint) in self.waypoints.iter().enumerate() {
            let dist_m = (waypoint.pos_m - pos_m).norm();

            if dist_m < closest_dist_m {
                closest_dist_m = dist_m;
                closest = i;
            }
        }

        closest
    }

    /// Get the index of the next waypoint ahead of the given pose.
    ///
    /// Starts from the closest waypoint and advances by one if the bearing
    /// to it differs from the heading by more than 45 degrees, so that the
    /// returned waypoint is always ahead of travel rather than just nearby.
    pub fn next_waypoint(&self, pos_m: Point2<f64>, heading_rad: f64) -> usize {
        let closest = self.closest_waypoint(pos_m);
        let waypoint = &self.waypoints[closest];

        let bearing_rad = (waypoint.pos_m.y - pos_m.y).atan2(waypoint.pos_m.x - pos_m.x);

        let ang_dist_rad = maths::get_ang_dist_2pi(
            maths::map_pi_to_2pi(bearing_rad),
            maths::map_pi_to_2pi(heading_rad),
        )
        .abs();

        if ang_dist_rad > std::f64::consts::FRAC_PI_4 {
            (closest + 1) % self.waypoints.len()
        }
        else {
            closest
        }
    }
}

#[cfg(test)]
impl RoadMap {
    /// Build a circular test track of the given radius with evenly spaced
    /// waypoints. Travel is anticlockwise, lateral unit vectors point
    /// radially outward.
    pub fn test_circle(radius_m: f64, num_waypoints: usize) -> Self {
        let track_length_m = std::f64::consts::TAU * radius_m;

        let waypoints = (0..num_waypoints)
            .map(|i| {
                let theta_rad = std::f64::consts::TAU * (i as f64) / (num_waypoints as f64);
                Waypoint {
                    pos_m: Point2::new(
                        radius_m * theta_rad.cos(),
                        radius_m * theta_rad.sin(),
                    ),
                    s_m: radius_m * theta_rad,
                    d_unit: Vector2::new(theta_rad.cos(), theta_rad.sin()),
                }
            })
            .collect();

        Self::from_waypoints(waypoints, track_length_m).unwrap()
    }

    /// Build a straight test track heading east along the x axis. Not a
    /// sensible closed loop, so tests must keep their queries away from the
    /// seam segment.
    pub fn test_straight(num_waypoints: usize, spacing_m: f64) -> Self {
        let waypoints = (0..num_waypoints)
            .map(|i| Waypoint {
                pos_m: Point2::new((i as f64) * spacing_m, 0.0),
                s_m: (i as f64) * spacing_m,
                d_unit: Vector2::new(0.0, -1.0),
            })
            .collect();

        Self::from_waypoints(waypoints, (num_waypoints as f64) * spacing_m).unwrap()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn demo_waypoints() -> Vec<Waypoint> {
        vec![
            Waypoint {
                pos_m: Point2::new(0.0, 0.0),
                s_m: 0.0,
                d_unit: Vector2::new(0.0, -1.0),
            },
            Waypoint {
                pos_m: Point2::new(10.0, 0.0),
                s_m: 10.0,
                d_unit: Vector2::new(0.0, -1.0),
            },
            Waypoint {
                pos_m: Point2::new(20.0, 0.0),
                s_m: 20.0,
                d_unit: Vector2::new(0.0, -1.0),
            },
        ]
    }

    #[test]
    fn test_load_map_file() {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_map_load.csv", std::process::id()));
        std::fs::write(
            &path,
            "0.0 0.0 0.0 0.0 -1.0\n10.0 0.0 10.0 0.0 -1.0\n20.0 0.0 20.0 0.0 -1.0\n",
        )
        .unwrap();

        let map = RoadMap::load(&path, 30.0).unwrap();

        assert_eq!(map.num_waypoints(), 3);
        assert_eq!(map.waypoints()[1].pos_m, Point2::new(10.0, 0.0));
        assert_eq!(map.waypoints()[2].s_m, 20.0);
        assert_eq!(map.track_length_m(), 30.0);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_rejects_bad_files() {
        // Missing file
        assert!(matches!(
            RoadMap::load("/nonexistent/map.csv", 30.0),
            Err(RoadMapError::FileReadError(_))
        ));

        // Truncated record
        let mut path = std::env::temp_dir();
        path.push(format!("{}_map_truncated.csv", std::process::id()));
        std::fs::write(&path, "0.0 0.0 0.0 0.0 -1.0\n10.0 0.0\n").unwrap();

        assert!(matches!(
            RoadMap::load(&path, 30.0),
            Err(RoadMapError::FileReadError(_))
        ));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_validation() {
        // Too few waypoints
        let mut waypoints = demo_waypoints();
        waypoints.truncate(1);
        assert!(matches!(
            RoadMap::from_waypoints(waypoints, 30.0),
            Err(RoadMapError::TooFewWaypoints(1))
        ));

        // Non-monotonic s
        let mut waypoints = demo_waypoints();
        waypoints[2].s_m = 10.0;
        assert!(matches!(
            RoadMap::from_waypoints(waypoints, 30.0),
            Err(RoadMapError::NonMonotonicS(2))
        ));

        // Negative starting s
        let mut waypoints = demo_waypoints();
        waypoints[0].s_m = -1.0;
        assert!(matches!(
            RoadMap::from_waypoints(waypoints, 30.0),
            Err(RoadMapError::NonMonotonicS(0))
        ));

        // Final waypoint at the track end
        assert!(matches!(
            RoadMap::from_waypoints(demo_waypoints(), 20.0),
            Err(RoadMapError::WaypointBeyondTrackEnd(2, _, _))
        ));

        // Bad track length
        assert!(matches!(
            RoadMap::from_waypoints(demo_waypoints(), 0.0),
            Err(RoadMapError::InvalidTrackLength(_))
        ));

        // Lateral vector not unit length
        let mut waypoints = demo_waypoints();
        waypoints[1].d_unit = Vector2::new(0.0, -2.0);
        assert!(matches!(
            RoadMap::from_waypoints(waypoints, 30.0),
            Err(RoadMapError::NonUnitLateral(1, _))
        ));
    }

    #[test]
    fn test_closest_waypoint() {
        let map = RoadMap::test_circle(100.0, 36);

        // On top of waypoint 9 (90 degrees round)
        assert_eq!(map.closest_waypoint(Point2::new(0.0, 100.0)), 9);

        // Slightly off the centre line near waypoint 0
        assert_eq!(map.closest_waypoint(Point2::new(103.0, 1.0)), 0);
    }

    #[test]
    fn test_next_waypoint_heading_disambiguation() {
        let map = RoadMap::test_straight(10, 10.0);

        // Just past waypoint 5 heading east: waypoint 5 is behind, expect 6
        assert_eq!(map.next_waypoint(Point2::new(51.0, 0.5), 0.0), 6);

        // Just before waypoint 5 heading east: waypoint 5 is ahead
        assert_eq!(map.next_waypoint(Point2::new(49.0, 0.5), 0.0), 5);

        // Just past waypoint 5 heading west: waypoint 5 is now ahead of
        // travel
        assert_eq!(
            map.next_waypoint(Point2::new(51.0, 0.5), std::f64::consts::PI),
            5
        );
    }

    #[test]
    fn test_next_waypoint_wraps_at_map_end() {
        let map = RoadMap::test_circle(100.0, 36);

        // Just past the final waypoint, heading anticlockwise: the next
        // waypoint ahead is the first one
        let theta_rad = std::f64::consts::TAU * 35.5 / 36.0;
        let pos_m = Point2::new(100.0 * theta_rad.cos(), 100.0 * theta_rad.sin());

        assert_eq!(
            map.next_waypoint(pos_m, theta_rad + std::f64::consts::FRAC_PI_2),
            0
        );
    }
}
