//! Planner parameters
//!
//! Loaded from `params/planner.toml` at init.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the planner module.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Params {
    /// Path to the waypoint map file, relative to the software root.
    pub map_file: String,

    /// Full longitudinal length of the closed track loop.
    ///
    /// Units: metres
    pub track_length_m: f64,

    /// Width of each lane.
    ///
    /// Units: metres
    pub lane_width_m: f64,

    /// Number of lanes on the ego side of the road.
    pub num_lanes: usize,

    /// Lane the ego vehicle starts in, 0 being leftmost.
    pub start_lane: usize,

    /// Reference speed ceiling.
    ///
    /// Units: miles per hour
    pub speed_limit_mph: f64,

    /// Change in reference speed per planning cycle.
    ///
    /// Units: miles per hour
    pub speed_step_mph: f64,

    /// Minimum clear distance ahead of the ego vehicle for a lane to count
    /// as safe.
    ///
    /// Units: metres
    pub front_gap_m: f64,

    /// Minimum clear distance behind the ego vehicle for a lane to count as
    /// safe.
    ///
    /// Units: metres
    pub rear_gap_m: f64,

    /// Longitudinal spacing of the lane anchors used by the spline fit.
    ///
    /// Units: metres
    pub anchor_spacing_m: f64,

    /// Number of points in a full planned trajectory.
    pub plan_horizon_points: usize,

    /// Time between consecutive trajectory points, the simulator's control
    /// period.
    ///
    /// Units: seconds
    pub tick_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Lateral offset of the centre of the given lane from the road centre
    /// line.
    pub fn lane_centre_m(&self, lane: usize) -> f64 {
        self.lane_width_m / 2.0 + self.lane_width_m * (lane as f64)
    }

    /// Index of the rightmost lane.
    pub fn rightmost_lane(&self) -> usize {
        self.num_lanes - 1
    }
}

#[cfg(test)]
impl Params {
    /// Parameters matching `params/planner.toml` for use in tests, with the
    /// full-size track length.
    pub fn test_defaults() -> Self {
        Self {
            map_file: String::from("data/synthetic_loop.csv"),
            track_length_m: 6945.554,
            lane_width_m: 4.0,
            num_lanes: 3,
            start_lane: 1,
            speed_limit_mph: 49.5,
            speed_step_mph: 0.224,
            front_gap_m: 30.0,
            rear_gap_m: 5.0,
            anchor_spacing_m: 30.0,
            plan_horizon_points: 50,
            tick_s: 0.02,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lane_centres() {
        let params = Params::test_defaults();

        assert!((params.lane_centre_m(0) - 2.0).abs() < 1e-9);
        assert!((params.lane_centre_m(1) - 6.0).abs() < 1e-9);
        assert!((params.lane_centre_m(2) - 10.0).abs() < 1e-9);
        assert_eq!(params.rightmost_lane(), 2);
    }
}
