//! # Behavior selection
//!
//! Chooses the manoeuvre for the next planning cycle: keep the current lane
//! (possibly speeding up or slowing down) or change lane. Lane changes are
//! only attempted when the current lane is blocked ahead, and a left change
//! is always preferred over a right one.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::planner::Params;
use crate::traffic;
use comms_if::sim::SensedVehicle;
use util::maths;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The manoeuvre selected for a planning cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    /// Hold the current lane at the current reference speed
    KeepLane,

    /// Hold the current lane and raise the reference speed by one step
    KeepLaneAccel,

    /// Hold the current lane and lower the reference speed by one step
    KeepLaneBrake,

    /// Move one lane to the left
    ChangeLeft,

    /// Move one lane to the right
    ChangeRight,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The outcome of behavior selection for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    /// The selected manoeuvre
    pub behavior: Behavior,

    /// The lane to target when synthesizing the trajectory
    pub lane: usize,

    /// Reference speed to target when synthesizing the trajectory
    pub ref_speed_mph: f64,

    /// Whether the current lane was blocked ahead this cycle
    pub front_blocked: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Behavior {
    fn default() -> Self {
        Behavior::KeepLane
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Select the behavior for this cycle.
///
/// If the current lane is blocked ahead the planner first tries a left lane
/// change, then a right one, and brakes if neither neighbour is safe. A lane
/// change keeps the reference speed unchanged. In an unblocked lane the
/// reference speed is stepped up towards the limit. The reference speed is
/// always clamped into `[0, speed_limit_mph]`.
pub fn select(
    vehicles: &[SensedVehicle],
    horizon_steps: usize,
    plan_s_m: f64,
    lane: usize,
    ref_speed_mph: f64,
    params: &Params,
) -> Decision {
    let front_blocked =
        traffic::lane_blocked_ahead(vehicles, horizon_steps, plan_s_m, lane, params);

    if front_blocked {
        if lane > 0
            && traffic::lane_is_safe(vehicles, horizon_steps, plan_s_m, lane - 1, params)
        {
            return Decision {
                behavior: Behavior::ChangeLeft,
                lane: lane - 1,
                ref_speed_mph,
                front_blocked,
            };
        }

        if lane < params.rightmost_lane()
            && traffic::lane_is_safe(vehicles, horizon_steps, plan_s_m, lane + 1, params)
        {
            return Decision {
                behavior: Behavior::ChangeRight,
                lane: lane + 1,
                ref_speed_mph,
                front_blocked,
            };
        }

        return Decision {
            behavior: Behavior::KeepLaneBrake,
            lane,
            ref_speed_mph: maths::clamp(
                &(ref_speed_mph - params.speed_step_mph),
                &0.0,
                &params.speed_limit_mph,
            ),
            front_blocked,
        };
    }

    if ref_speed_mph < params.speed_limit_mph {
        return Decision {
            behavior: Behavior::KeepLaneAccel,
            lane,
            ref_speed_mph: maths::clamp(
                &(ref_speed_mph + params.speed_step_mph),
                &0.0,
                &params.speed_limit_mph,
            ),
            front_blocked,
        };
    }

    Decision {
        behavior: Behavior::KeepLane,
        lane,
        ref_speed_mph,
        front_blocked,
    }
}
