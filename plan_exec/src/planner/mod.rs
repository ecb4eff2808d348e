//! # Planner module
//!
//! Top level planning-cycle controller. Each cycle takes one telemetry
//! snapshot, selects a behavior from the sensed traffic, and synthesizes the
//! trajectory to hand back to the simulator.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

pub use params::Params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
use crate::behavior::{self, Behavior};
use crate::road::{RoadMap, RoadMapError};
use crate::synth::{self, Trajectory};
use comms_if::sim::TelemetrySnapshot;
use util::archive::{Archived, Archiver};
use util::host;
use util::module::State;
use util::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The planner module state.
#[derive(Default)]
pub struct Planner {
    params: Params,

    map: Option<RoadMap>,

    /// Lane the planner is currently targeting
    lane: usize,

    /// Reference speed the planner is currently targeting
    ref_speed_mph: f64,

    report: StatusReport,

    arch_report: Archiver,
}

/// Status report of a single planning cycle.
///
/// Kept flat so it can be archived as CSV.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StatusReport {
    /// Behavior selected this cycle
    pub behavior: Behavior,

    /// Lane targeted by the synthesized trajectory
    pub lane: usize,

    /// Reference speed targeted by the synthesized trajectory
    pub ref_speed_mph: f64,

    /// Whether the ego lane was blocked ahead
    pub front_blocked: bool,

    /// Whether synthesis fell back to a straight extension
    pub spline_fallback: bool,

    /// Number of points in the synthesized trajectory
    pub trajectory_points: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur in the planner module.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Cannot load the planner parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Cannot resolve the software root: {0}")]
    SwRootError(util::host::HostError),

    #[error("Cannot load the road map: {0}")]
    MapLoadError(RoadMapError),

    #[error("The planner has not been initialised")]
    NotInit,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for Planner {
    type InitData = &'static str;
    type InitError = PlannerError;

    type InputData = TelemetrySnapshot;
    type OutputData = Trajectory;
    type StatusReport = StatusReport;
    type ProcError = PlannerError;

    /// Initialise the planner.
    ///
    /// Loads the parameter file given in `init_data` and the road map it
    /// points at, and sets up the status report archive under the session.
    fn init(
        &mut self,
        init_data: Self::InitData,
        session: &Session
    ) -> Result<(), Self::InitError> {
        self.params = util::params::load(init_data)
            .map_err(PlannerError::ParamLoadError)?;

        let root = host::get_highway_sw_root().map_err(PlannerError::SwRootError)?;

        let map = RoadMap::load(
            root.join(&self.params.map_file),
            self.params.track_length_m,
        )
        .map_err(PlannerError::MapLoadError)?;

        info!(
            "Road map loaded: {} waypoints over a {:.1} m track",
            map.num_waypoints(),
            map.track_length_m()
        );

        self.map = Some(map);
        self.lane = self.params.start_lane;
        self.ref_speed_mph = 0.0;

        // Setup the archiver for the status report
        std::fs::create_dir_all(session.arch_root.join("planner")).unwrap();
        self.arch_report =
            Archiver::from_path(session, "planner/status_report.csv").unwrap();

        Ok(())
    }

    /// Run one planning cycle on the given telemetry snapshot.
    fn proc(
        &mut self,
        input_data: &Self::InputData
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let map = match self.map {
            Some(ref m) => m,
            None => return Err(PlannerError::NotInit),
        };

        let prev_path = Trajectory::from_parallel(
            &input_data.previous_path_x_m,
            &input_data.previous_path_y_m,
        );

        // Traffic is predicted forward to the end of the unconsumed path,
        // which is where the new trajectory section starts
        let horizon_steps = prev_path.len();

        let plan_s_m = if prev_path.is_empty() {
            input_data.s_m
        }
        else {
            input_data.end_path_s_m
        };

        let decision = behavior::select(
            &input_data.sensed_vehicles,
            horizon_steps,
            plan_s_m,
            self.lane,
            self.ref_speed_mph,
            &self.params,
        );

        if decision.lane != self.lane {
            info!(
                "Lane change: {} -> {} ({:?})",
                self.lane, decision.lane, decision.behavior
            );
        }

        self.lane = decision.lane;
        self.ref_speed_mph = decision.ref_speed_mph;

        trace!(
            "Cycle decision: {:?}, lane {}, ref speed {:.3} mph, {} points reused",
            decision.behavior,
            decision.lane,
            decision.ref_speed_mph,
            horizon_steps
        );

        let (trajectory, synth_status) = synth::synthesize(
            map,
            &self.params,
            Point2::new(input_data.x_m, input_data.y_m),
            input_data.yaw_deg.to_radians(),
            &prev_path,
            plan_s_m,
            decision.lane,
            decision.ref_speed_mph,
        );

        self.report = StatusReport {
            behavior: decision.behavior,
            lane: decision.lane,
            ref_speed_mph: decision.ref_speed_mph,
            front_blocked: decision.front_blocked,
            spline_fallback: synth_status.spline_fallback,
            trajectory_points: trajectory.len(),
        };

        Ok((trajectory, self.report))
    }
}

impl Archived for Planner {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;

        Ok(())
    }
}

#[cfg(test)]
impl Planner {
    /// Build an initialised planner for tests, with no session or archive
    /// backing.
    pub fn test_instance(params: Params, map: RoadMap) -> Self {
        let lane = params.start_lane;

        Self {
            params,
            map: Some(map),
            lane,
            ref_speed_mph: 0.0,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::sim::SensedVehicle;
    use std::f64::consts::FRAC_PI_2;

    fn telemetry(
        map: &RoadMap,
        s_m: f64,
        d_m: f64,
        vehicles: Vec<SensedVehicle>
    ) -> TelemetrySnapshot {
        let pos_m = map.to_world(s_m, d_m);
        let yaw_rad = s_m / 250.0 + FRAC_PI_2;

        TelemetrySnapshot {
            x_m: pos_m.x,
            y_m: pos_m.y,
            s_m,
            d_m,
            yaw_deg: yaw_rad.to_degrees(),
            speed_mph: 0.0,
            previous_path_x_m: vec![],
            previous_path_y_m: vec![],
            end_path_s_m: 0.0,
            end_path_d_m: 0.0,
            sensed_vehicles: vehicles,
        }
    }

    #[test]
    fn test_blocked_lane_triggers_a_left_change() {
        // A stationary vehicle 20 m ahead in the ego lane
        let blocker = SensedVehicle {
            id: 7,
            x_m: 0.0,
            y_m: 0.0,
            vx_ms: 0.0,
            vy_ms: 0.0,
            s_m: 120.0,
            d_m: 6.0,
        };

        let map = RoadMap::test_circle(250.0, 64);
        let input = telemetry(&map, 100.0, 6.0, vec![blocker]);

        let mut planner = Planner::test_instance(Params::test_defaults(), map);
        planner.ref_speed_mph = 40.0;

        let (trajectory, report) = planner.proc(&input).unwrap();

        assert_eq!(report.behavior, Behavior::ChangeLeft);
        assert_eq!(report.lane, 0);
        assert!(report.front_blocked);
        assert!(!report.spline_fallback);

        // The lane change leaves the reference speed alone
        assert!((report.ref_speed_mph - 40.0).abs() < 1e-9);

        assert_eq!(trajectory.len(), 50);
        assert_eq!(report.trajectory_points, 50);
    }

    #[test]
    fn test_accelerates_from_rest() {
        let map = RoadMap::test_circle(250.0, 64);
        let input = telemetry(&map, 100.0, 6.0, vec![]);

        let mut planner = Planner::test_instance(Params::test_defaults(), map);

        let (trajectory, report) = planner.proc(&input).unwrap();

        assert_eq!(report.behavior, Behavior::KeepLaneAccel);
        assert_eq!(report.lane, 1);
        assert!((report.ref_speed_mph - 0.224).abs() < 1e-9);
        assert!(!report.front_blocked);

        assert_eq!(trajectory.len(), 50);
        assert!(trajectory
            .points_m
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn test_proc_before_init_fails() {
        let map = RoadMap::test_circle(250.0, 64);
        let input = telemetry(&map, 100.0, 6.0, vec![]);

        let mut planner = Planner::default();

        assert!(matches!(planner.proc(&input), Err(PlannerError::NotInit)));
    }
}
