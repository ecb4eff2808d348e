//! # TM Server
//!
//! Publishes a telemetry packet at the end of every planning cycle for any
//! listening monitor. Telemetry is fire-and-forget over PUB, so a missing
//! monitor never stalls the planning loop.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use comms_if::net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions};

use crate::behavior::Behavior;
use crate::data_store::DataStore;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    socket: MonitoredSocket,
}

/// Telemetry packet that is output by the server.
#[derive(Debug, Serialize, Deserialize)]
pub struct TmPacket {
    /// Planning cycle counter since boot
    pub cycle: u128,

    pub sim_time_s: f64,

    pub behavior: Behavior,

    pub lane: usize,

    pub ref_speed_mph: f64,

    pub front_blocked: bool,

    pub spline_fallback: bool,

    pub trajectory_points: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send telemetry: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the telemetry: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Create a new instance of the TM Server.
    ///
    /// This function will not block until a monitor connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, TmServerError> {
        // Create the socket options
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        // Connect the socket
        let socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            socket_options,
            &params.tm_endpoint
        )
        .map_err(TmServerError::SocketError)?;

        // Create self
        Ok(Self { socket })
    }

    pub fn send(&mut self, ds: &DataStore) -> Result<(), TmServerError> {
        // Build packet
        let packet = TmPacket::from_datastore(ds);

        // Serialize packet
        let packet_string = serde_json::to_string(&packet)
            .map_err(TmServerError::SerializationError)?;

        // Send the packet
        self.socket
            .send(&packet_string, 0)
            .map_err(TmServerError::SendError)
    }
}

impl TmPacket {
    pub fn from_datastore(ds: &DataStore) -> Self {
        Self {
            cycle: ds.num_cycles,
            sim_time_s: ds.sim_time_s,
            behavior: ds.planner_status_rpt.behavior,
            lane: ds.planner_status_rpt.lane,
            ref_speed_mph: ds.planner_status_rpt.ref_speed_mph,
            front_blocked: ds.planner_status_rpt.front_blocked,
            spline_fallback: ds.planner_status_rpt.spline_fallback,
            trajectory_points: ds.planner_status_rpt.trajectory_points,
        }
    }
}
