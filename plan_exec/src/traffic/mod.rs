//! # Traffic analysis
//!
//! Predicts sensed vehicle positions forward in time and decides whether
//! lanes hold a safe gap for the ego vehicle.
//!
//! All comparisons use raw longitudinal differences, so a vehicle on the far
//! side of the track seam appears a full lap away rather than just behind.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use crate::planner::Params;
use comms_if::sim::SensedVehicle;
use util::maths;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Predict a vehicle's longitudinal position `horizon_steps` ticks ahead.
///
/// The vehicle is assumed to hold its lane and its current speed, so its
/// progress is the magnitude of its world-frame velocity integrated over the
/// horizon. The result is not wrapped at the track length.
pub fn predicted_s_m(
    vehicle: &SensedVehicle,
    horizon_steps: usize,
    tick_s: f64
) -> f64 {
    let speed_ms = maths::norm(&[0f64; 2], &[vehicle.vx_ms, vehicle.vy_ms]).unwrap();

    vehicle.s_m + (horizon_steps as f64) * tick_s * speed_ms
}

/// True if no vehicle in the given lane leaves too small a gap around the
/// ego vehicle's longitudinal position at the prediction horizon.
///
/// A vehicle is a hazard if its predicted position is strictly ahead of
/// `ego_s_m` by less than the front gap, or strictly behind it by less than
/// the rear gap. A vehicle exactly at `ego_s_m` is neither.
pub fn lane_is_safe(
    vehicles: &[SensedVehicle],
    horizon_steps: usize,
    ego_s_m: f64,
    lane: usize,
    params: &Params,
) -> bool {
    for vehicle in vehicles {
        if !in_lane_band(vehicle.d_m, lane, params) {
            continue;
        }

        let s_pred_m = predicted_s_m(vehicle, horizon_steps, params.tick_s);

        if s_pred_m > ego_s_m && s_pred_m - ego_s_m < params.front_gap_m {
            return false;
        }
        if s_pred_m < ego_s_m && ego_s_m - s_pred_m < params.rear_gap_m {
            return false;
        }
    }

    true
}

/// True if a vehicle in the given lane is predicted strictly ahead of the
/// ego vehicle by less than the front gap.
pub fn lane_blocked_ahead(
    vehicles: &[SensedVehicle],
    horizon_steps: usize,
    ego_s_m: f64,
    lane: usize,
    params: &Params,
) -> bool {
    for vehicle in vehicles {
        if !in_lane_band(vehicle.d_m, lane, params) {
            continue;
        }

        let s_pred_m = predicted_s_m(vehicle, horizon_steps, params.tick_s);

        if s_pred_m > ego_s_m && s_pred_m - ego_s_m < params.front_gap_m {
            return true;
        }
    }

    false
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// True if the lateral offset falls strictly inside the lane's band, one
/// lane width centred on the lane centre. Offsets exactly on a lane boundary
/// belong to neither adjacent lane.
fn in_lane_band(d_m: f64, lane: usize, params: &Params) -> bool {
    let centre_m = params.lane_centre_m(lane);
    let half_width_m = params.lane_width_m / 2.0;

    d_m > centre_m - half_width_m && d_m < centre_m + half_width_m
}

#[cfg(test)]
mod test {
    use super::*;

    fn vehicle(s_m: f64, d_m: f64, vx_ms: f64, vy_ms: f64) -> SensedVehicle {
        SensedVehicle {
            id: 0,
            x_m: 0.0,
            y_m: 0.0,
            vx_ms,
            vy_ms,
            s_m,
            d_m,
        }
    }

    #[test]
    fn test_predicted_s() {
        let params = Params::test_defaults();

        // 50 steps at 0.02 s and 10 m/s is 10 m of progress
        let ahead = predicted_s_m(&vehicle(100.0, 6.0, 10.0, 0.0), 50, params.tick_s);
        assert!((ahead - 110.0).abs() < 1e-9);

        // Speed is a magnitude, so direction of travel makes no difference
        let reversed = predicted_s_m(&vehicle(100.0, 6.0, -10.0, 0.0), 50, params.tick_s);
        assert!((reversed - 110.0).abs() < 1e-9);

        let diagonal = predicted_s_m(&vehicle(100.0, 6.0, 3.0, 4.0), 50, params.tick_s);
        assert!((diagonal - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_lane_band_bounds() {
        let params = Params::test_defaults();

        // Lane 1 spans (4, 8) exclusive
        assert!(in_lane_band(6.0, 1, &params));
        assert!(in_lane_band(4.1, 1, &params));
        assert!(in_lane_band(7.9, 1, &params));

        // An offset exactly on the boundary is in neither lane
        assert!(!in_lane_band(4.0, 0, &params));
        assert!(!in_lane_band(4.0, 1, &params));
        assert!(in_lane_band(3.9, 0, &params));
        assert!(in_lane_band(4.1, 1, &params));
    }

    #[test]
    fn test_front_gap() {
        let params = Params::test_defaults();

        // Stationary vehicle 29 m ahead in lane 1 is too close
        let close = [vehicle(129.0, 6.0, 0.0, 0.0)];
        assert!(!lane_is_safe(&close, 0, 100.0, 1, &params));

        // 31 m ahead is clear, 30 m exactly is the strict boundary
        let clear = [vehicle(131.0, 6.0, 0.0, 0.0)];
        assert!(lane_is_safe(&clear, 0, 100.0, 1, &params));

        let boundary = [vehicle(130.0, 6.0, 0.0, 0.0)];
        assert!(lane_is_safe(&boundary, 0, 100.0, 1, &params));
    }

    #[test]
    fn test_rear_gap() {
        let params = Params::test_defaults();

        // 4 m behind is too close, 6 m is clear, 5 m exactly is the boundary
        let close = [vehicle(96.0, 6.0, 0.0, 0.0)];
        assert!(!lane_is_safe(&close, 0, 100.0, 1, &params));

        let clear = [vehicle(94.0, 6.0, 0.0, 0.0)];
        assert!(lane_is_safe(&clear, 0, 100.0, 1, &params));

        let boundary = [vehicle(95.0, 6.0, 0.0, 0.0)];
        assert!(lane_is_safe(&boundary, 0, 100.0, 1, &params));
    }

    #[test]
    fn test_coincident_vehicle_is_not_a_hazard() {
        let params = Params::test_defaults();

        let coincident = [vehicle(100.0, 6.0, 0.0, 0.0)];
        assert!(lane_is_safe(&coincident, 0, 100.0, 1, &params));
    }

    #[test]
    fn test_other_lane_ignored() {
        let params = Params::test_defaults();

        // A vehicle dead ahead in lane 0 has no bearing on lane 1
        let vehicles = [vehicle(110.0, 2.0, 0.0, 0.0)];
        assert!(lane_is_safe(&vehicles, 0, 100.0, 1, &params));
        assert!(!lane_is_safe(&vehicles, 0, 100.0, 0, &params));
    }

    #[test]
    fn test_blocked_ahead() {
        let params = Params::test_defaults();

        let vehicles = [
            vehicle(120.0, 6.0, 0.0, 0.0),
            vehicle(96.0, 2.0, 0.0, 0.0),
        ];

        assert!(lane_blocked_ahead(&vehicles, 0, 100.0, 1, &params));

        // The lane 0 vehicle is behind, so lane 0 is not blocked ahead even
        // though it fails the full safety check
        assert!(!lane_blocked_ahead(&vehicles, 0, 100.0, 0, &params));
        assert!(!lane_is_safe(&vehicles, 0, 100.0, 0, &params));
    }

    #[test]
    fn test_prediction_moves_hazard() {
        let params = Params::test_defaults();

        // With no prediction a vehicle 35 m ahead is outside the front gap
        let vehicles = [vehicle(135.0, 6.0, 10.0, 0.0)];
        assert!(lane_is_safe(&vehicles, 0, 100.0, 1, &params));

        // A vehicle 35 m behind at 10 m/s covers 10 m over 50 steps and
        // ends up 25 m behind, still outside the rear gap
        let vehicles = [vehicle(65.0, 6.0, 10.0, 0.0)];
        assert!(lane_is_safe(&vehicles, 50, 100.0, 1, &params));

        // 32 m behind ends up 3 m behind, inside the rear gap
        let vehicles = [vehicle(68.0, 6.0, 10.0, 0.0)];
        assert!(!lane_is_safe(&vehicles, 50, 100.0, 1, &params));
    }

    #[test]
    fn test_seam_vehicle_appears_a_lap_away() {
        let params = Params::test_defaults();

        // Ego near the track end, vehicle just past the seam: by raw
        // differences the vehicle is thousands of metres behind, so the
        // lane reads safe
        let vehicles = [vehicle(5.0, 6.0, 0.0, 0.0)];
        assert!(lane_is_safe(&vehicles, 0, 6940.0, 1, &params));
    }
}
