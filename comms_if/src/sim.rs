//! # Simulator wire-message definitions
//!
//! This module defines the messages exchanged between the planner and the
//! driving simulator (or anything standing in for it, like the sim rig).
//!
//! The exchange is strictly request-reply: the simulator sends one
//! [`SimMessage`] per planning tick and recieves exactly one [`SimResponse`]
//! back. Messages are JSON on the wire.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use serde_json;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A snapshot of the ego vehicle's telemetry at the start of a planning tick.
///
/// Positions are in the simulator's world frame (metres), with the
/// road-relative pair `(s_m, d_m)` computed by the simulator itself. `s_m`
/// is distance along the track from its start line, `d_m` is signed lateral
/// offset from the centre line (positive into the lanes).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct TelemetrySnapshot {
    /// Ego x position in the world frame
    pub x_m: f64,

    /// Ego y position in the world frame
    pub y_m: f64,

    /// Ego longitudinal position along the track
    pub s_m: f64,

    /// Ego signed lateral offset from the track centre line
    pub d_m: f64,

    /// Ego heading, degrees anticlockwise from the world x axis
    pub yaw_deg: f64,

    /// Ego speed in miles per hour
    pub speed_mph: f64,

    /// x positions of the previously commanded path not yet consumed by the
    /// simulator's controller, in execution order
    pub previous_path_x_m: Vec<f64>,

    /// y positions of the unconsumed previous path, parallel to
    /// `previous_path_x_m`
    pub previous_path_y_m: Vec<f64>,

    /// Longitudinal position of the last unconsumed previous path point.
    /// Zero when the previous path is empty.
    pub end_path_s_m: f64,

    /// Lateral offset of the last unconsumed previous path point. Zero when
    /// the previous path is empty.
    pub end_path_d_m: f64,

    /// All other vehicles currently sensed on the ego side of the road
    pub sensed_vehicles: Vec<SensedVehicle>,
}

/// One sensed vehicle on the ego side of the road.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SensedVehicle {
    /// Simulator identifier for this vehicle
    pub id: i32,

    /// Vehicle x position in the world frame
    pub x_m: f64,

    /// Vehicle y position in the world frame
    pub y_m: f64,

    /// Vehicle x velocity in metres per second
    pub vx_ms: f64,

    /// Vehicle y velocity in metres per second
    pub vy_ms: f64,

    /// Vehicle longitudinal position along the track
    pub s_m: f64,

    /// Vehicle signed lateral offset from the track centre line
    pub d_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A message from the simulator to the planner.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum SimMessage {
    /// A telemetry snapshot requesting a trajectory for this tick
    Telemetry(TelemetrySnapshot),

    /// The simulator is in manual mode, no planning required
    Manual,
}

/// The planner's reply to a [`SimMessage`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum SimResponse {
    /// The trajectory for the simulator's controller to follow, as parallel
    /// coordinate lists in execution order
    Control {
        next_x_m: Vec<f64>,
        next_y_m: Vec<f64>,
    },

    /// Acknowledge a manual-mode (or unparseable) message
    Manual,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum SimParseError {
    #[error("Message contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimMessage {
    /// Parse a message from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, SimParseError> {
        serde_json::from_str(json_str).map_err(SimParseError::InvalidJson)
    }

    /// Serialise this message into a JSON packet
    pub fn to_json(&self) -> Result<String, SimParseError> {
        serde_json::to_string(self).map_err(SimParseError::InvalidJson)
    }
}

impl SimResponse {
    /// Parse a response from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, SimParseError> {
        serde_json::from_str(json_str).map_err(SimParseError::InvalidJson)
    }

    /// Serialise this response into a JSON packet
    pub fn to_json(&self) -> Result<String, SimParseError> {
        serde_json::to_string(self).map_err(SimParseError::InvalidJson)
    }
}

impl TelemetrySnapshot {
    /// Parse a snapshot from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, SimParseError> {
        serde_json::from_str(json_str).map_err(SimParseError::InvalidJson)
    }

    /// Serialise this snapshot into a JSON packet
    pub fn to_json(&self) -> Result<String, SimParseError> {
        serde_json::to_string(self).map_err(SimParseError::InvalidJson)
    }
}
