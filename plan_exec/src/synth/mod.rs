//! # Trajectory synthesis
//!
//! Builds the world-frame trajectory for the next planning horizon. The new
//! path continues the unconsumed previous path, fits a cubic spline through
//! widely spaced anchors at the target lane centre, and resamples it at a
//! spacing matched to the reference speed.
//!
//! The spline is fitted in a local frame aligned with the path end heading
//! so that curved track sections still present monotonically increasing x
//! to the fit.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod trajectory;

pub use trajectory::Trajectory;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use nalgebra::{Point2, Vector2};

// Internal
use crate::planner::Params;
use crate::road::RoadMap;
use util::maths;
use util::spline::CubicSpline;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Miles per hour in one metre per second.
pub const MPH_PER_MS: f64 = 2.24;

/// Number of anchors placed ahead of the path end at the target lane centre.
const NUM_LANE_ANCHORS: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Flags describing how the last synthesis went.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynthStatus {
    /// True if the spline fit was abandoned and the path was extended
    /// straight along the end heading instead
    pub spline_fallback: bool,
}

/// A local reference frame anchored at the path end, x axis along the end
/// heading. The same yaw rotates both into and out of the frame, so points
/// survive the round trip unchanged.
struct RefFrame {
    origin_m: Point2<f64>,
    yaw_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RefFrame {
    fn to_local(&self, point_m: Point2<f64>) -> Point2<f64> {
        let shift = point_m - self.origin_m;

        Point2::new(
            shift.x * self.yaw_rad.cos() + shift.y * self.yaw_rad.sin(),
            -shift.x * self.yaw_rad.sin() + shift.y * self.yaw_rad.cos(),
        )
    }

    fn to_world(&self, point_m: Point2<f64>) -> Point2<f64> {
        Point2::new(
            point_m.x * self.yaw_rad.cos() - point_m.y * self.yaw_rad.sin()
                + self.origin_m.x,
            point_m.x * self.yaw_rad.sin() + point_m.y * self.yaw_rad.cos()
                + self.origin_m.y,
        )
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Synthesize the trajectory for this cycle.
///
/// The unconsumed previous path is reused verbatim and new points are
/// appended until the plan horizon is full. `plan_s_m` is the longitudinal
/// position of the path end (or of the vehicle if there is no previous
/// path) and must already be wrapped into `[0, track_length_m)`.
///
/// If the anchors are not monotonically increasing in the local frame the
/// spline cannot be fitted, and the path is instead extended straight along
/// the end heading with the fallback flag raised.
pub fn synthesize(
    map: &RoadMap,
    params: &Params,
    pose_m: Point2<f64>,
    heading_rad: f64,
    prev_path: &Trajectory,
    plan_s_m: f64,
    lane: usize,
    ref_speed_mph: f64,
) -> (Trajectory, SynthStatus) {
    // Seed the anchors with the last two path points so the new section
    // starts tangent to the old one. With no usable previous path a point
    // one metre behind the pose stands in for it.
    let (mut anchors, frame) = if prev_path.len() < 2 {
        let behind_m =
            pose_m - Vector2::new(heading_rad.cos(), heading_rad.sin());

        (
            vec![behind_m, pose_m],
            RefFrame {
                origin_m: pose_m,
                yaw_rad: heading_rad,
            },
        )
    }
    else {
        let last = prev_path.points_m[prev_path.len() - 1];
        let prev = prev_path.points_m[prev_path.len() - 2];
        let yaw_rad = (last.y - prev.y).atan2(last.x - prev.x);

        (
            vec![prev, last],
            RefFrame {
                origin_m: last,
                yaw_rad,
            },
        )
    };

    let lane_centre_m = params.lane_centre_m(lane);

    for i in 1..=NUM_LANE_ANCHORS {
        let anchor_s_m = maths::rem_euclid(
            plan_s_m + (i as f64) * params.anchor_spacing_m,
            map.track_length_m(),
        );

        anchors.push(map.to_world(anchor_s_m, lane_centre_m));
    }

    let local_anchors: Vec<Point2<f64>> =
        anchors.iter().map(|a| frame.to_local(*a)).collect();

    let monotonic = local_anchors.windows(2).all(|w| w[1].x > w[0].x);

    let spline = if monotonic {
        let xs: Vec<f64> = local_anchors.iter().map(|a| a.x).collect();
        let ys: Vec<f64> = local_anchors.iter().map(|a| a.y).collect();

        CubicSpline::new(&xs, &ys).ok()
    }
    else {
        None
    };

    let mut trajectory = prev_path.clone();
    let mut status = SynthStatus::default();

    match spline {
        Some(spline) => {
            // Pick a local x step such that points along the chord to the
            // first lane anchor are one tick apart at the reference speed
            let target_x_m = params.anchor_spacing_m;
            let target_y_m = spline.eval(target_x_m);
            let chord_m =
                maths::norm(&[0.0; 2], &[target_x_m, target_y_m]).unwrap();

            // Zero reference speed gives an infinite step count and a zero
            // step, holding position rather than producing non-finite
            // points
            let num_steps =
                chord_m / (params.tick_s * ref_speed_mph / MPH_PER_MS);
            let step_m = target_x_m / num_steps;

            let mut x_m = 0.0;
            while trajectory.len() < params.plan_horizon_points {
                x_m += step_m;

                trajectory
                    .points_m
                    .push(frame.to_world(Point2::new(x_m, spline.eval(x_m))));
            }
        }
        None => {
            warn!(
                "Lane anchors not monotonic ahead of the path end, extending \
                straight along the end heading"
            );
            status.spline_fallback = true;

            let step_m = params.tick_s * ref_speed_mph / MPH_PER_MS;

            let mut x_m = 0.0;
            while trajectory.len() < params.plan_horizon_points {
                x_m += step_m;

                trajectory
                    .points_m
                    .push(frame.to_world(Point2::new(x_m, 0.0)));
            }
        }
    }

    (trajectory, status)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_fills_the_horizon_from_scratch() {
        let map = RoadMap::test_circle(250.0, 64);
        let params = Params::test_defaults();

        let pose_m = map.to_world(100.0, 6.0);
        let heading_rad = 100.0 / 250.0 + FRAC_PI_2;

        let (traj, status) = synthesize(
            &map,
            &params,
            pose_m,
            heading_rad,
            &Trajectory::default(),
            100.0,
            1,
            30.0,
        );

        assert_eq!(traj.len(), params.plan_horizon_points);
        assert!(!status.spline_fallback);
        assert!(traj
            .points_m
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn test_previous_path_reused_verbatim() {
        let map = RoadMap::test_circle(250.0, 64);
        let params = Params::test_defaults();

        let pose_m = map.to_world(100.0, 6.0);
        let heading_rad = 100.0 / 250.0 + FRAC_PI_2;

        let (full, _) = synthesize(
            &map,
            &params,
            pose_m,
            heading_rad,
            &Trajectory::default(),
            100.0,
            1,
            30.0,
        );

        // Simulate the controller consuming the first three points
        let mut prev = full.clone();
        prev.points_m.drain(0..3);

        let last = prev.points_m[prev.len() - 1];
        let second_last = prev.points_m[prev.len() - 2];
        let end_yaw_rad = (last.y - second_last.y).atan2(last.x - second_last.x);
        let end_s_m = map.to_road(last, end_yaw_rad).s_m;

        let (traj, status) = synthesize(
            &map,
            &params,
            pose_m,
            heading_rad,
            &prev,
            end_s_m,
            1,
            30.0,
        );

        assert_eq!(traj.len(), params.plan_horizon_points);
        assert!(!status.spline_fallback);
        assert_eq!(&traj.points_m[..prev.len()], &prev.points_m[..]);
    }

    #[test]
    fn test_full_previous_path_passes_through() {
        let map = RoadMap::test_circle(250.0, 64);
        let params = Params::test_defaults();

        let pose_m = map.to_world(100.0, 6.0);
        let heading_rad = 100.0 / 250.0 + FRAC_PI_2;

        let (full, _) = synthesize(
            &map,
            &params,
            pose_m,
            heading_rad,
            &Trajectory::default(),
            100.0,
            1,
            30.0,
        );

        let (traj, _) = synthesize(
            &map,
            &params,
            pose_m,
            heading_rad,
            &full,
            100.0,
            1,
            30.0,
        );

        assert_eq!(traj.points_m, full.points_m);
    }

    #[test]
    fn test_straight_track_spacing_matches_speed() {
        let map = RoadMap::test_straight(40, 10.0);
        let params = Params::test_defaults();

        let pose_m = map.to_world(50.0, 6.0);

        let (traj, status) = synthesize(
            &map,
            &params,
            pose_m,
            0.0,
            &Trajectory::default(),
            50.0,
            1,
            30.0,
        );

        assert!(!status.spline_fallback);

        // On a straight track the path stays on the lane centre and the
        // point spacing is one tick of travel at the reference speed
        let expected_step_m = params.tick_s * 30.0 / MPH_PER_MS;

        for pair in traj.points_m.windows(2) {
            let step_m = (pair[1] - pair[0]).norm();
            assert!((step_m - expected_step_m).abs() < 1e-6);
            assert!(pair[1].x > pair[0].x);
        }

        for point in &traj.points_m {
            assert!((point.y - -6.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_lane_change_blends_towards_target_centre() {
        let map = RoadMap::test_straight(40, 10.0);
        let params = Params::test_defaults();

        // In lane 1 at (50, -6), targeting lane 0 whose centre is y = -2
        let pose_m = map.to_world(50.0, 6.0);

        let (traj, status) = synthesize(
            &map,
            &params,
            pose_m,
            0.0,
            &Trajectory::default(),
            50.0,
            0,
            30.0,
        );

        assert!(!status.spline_fallback);

        let first = traj.points_m[0];
        let last = traj.points_m[traj.len() - 1];

        // The path leaves the old lane centre smoothly and moves towards
        // the target without overshooting it
        assert!((first.y - -6.0).abs() < 0.1);
        assert!(last.y > -5.0);
        assert!(last.y <= -2.0 + 1e-6);

        for pair in traj.points_m.windows(2) {
            assert!((pair[1].y - pair[0].y).abs() < 0.1);
        }
    }

    #[test]
    fn test_zero_speed_holds_position() {
        let map = RoadMap::test_circle(250.0, 64);
        let params = Params::test_defaults();

        let pose_m = map.to_world(100.0, 6.0);
        let heading_rad = 100.0 / 250.0 + FRAC_PI_2;

        let (traj, status) = synthesize(
            &map,
            &params,
            pose_m,
            heading_rad,
            &Trajectory::default(),
            100.0,
            1,
            0.0,
        );

        assert_eq!(traj.len(), params.plan_horizon_points);
        assert!(!status.spline_fallback);

        for point in &traj.points_m {
            assert!(point.x.is_finite() && point.y.is_finite());
            assert!((point - pose_m).norm() < 1e-9);
        }
    }

    #[test]
    fn test_fallback_when_anchors_not_monotonic() {
        let map = RoadMap::test_circle(250.0, 64);
        let params = Params::test_defaults();

        // A previous path whose end heading points backwards along the
        // track puts the lane anchors behind the path end
        let prev = Trajectory {
            points_m: vec![map.to_world(100.5, 6.0), map.to_world(100.0, 6.0)],
        };

        let (traj, status) = synthesize(
            &map,
            &params,
            map.to_world(100.0, 6.0),
            0.0,
            &prev,
            100.0,
            1,
            30.0,
        );

        assert!(status.spline_fallback);
        assert_eq!(traj.len(), params.plan_horizon_points);
        assert_eq!(&traj.points_m[..2], &prev.points_m[..]);
        assert!(traj
            .points_m
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn test_fallback_on_duplicate_path_end() {
        let map = RoadMap::test_circle(250.0, 64);
        let params = Params::test_defaults();

        let point = map.to_world(100.0, 6.0);
        let prev = Trajectory {
            points_m: vec![point, point],
        };

        let (traj, status) = synthesize(
            &map,
            &params,
            point,
            0.0,
            &prev,
            100.0,
            1,
            30.0,
        );

        assert!(status.spline_fallback);
        assert_eq!(traj.len(), params.plan_horizon_points);
    }

    #[test]
    fn test_synthesis_across_the_seam() {
        let map = RoadMap::test_circle(250.0, 64);
        let params = Params::test_defaults();

        // Path end just before the track wraps, anchors land past it
        let plan_s_m = map.track_length_m() - 10.0;
        let pose_m = map.to_world(plan_s_m, 6.0);
        let heading_rad = plan_s_m / 250.0 + FRAC_PI_2;

        let (traj, status) = synthesize(
            &map,
            &params,
            pose_m,
            heading_rad,
            &Trajectory::default(),
            plan_s_m,
            1,
            30.0,
        );

        assert_eq!(traj.len(), params.plan_horizon_points);
        assert!(!status.spline_fallback);
        assert!(traj
            .points_m
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite()));

        // The path carries on around the seam rather than jumping
        for pair in traj.points_m.windows(2) {
            assert!((pair[1] - pair[0]).norm() < 1.0);
        }
    }
}
