//! # Simulator Server
//!
//! This module abstracts over the networking between the planner and the
//! simulator. The simulator connects once at startup and then sends one
//! telemetry message per control tick, each of which must be answered with a
//! trajectory response over the same socket.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    sim::{SimMessage, SimParseError, SimResponse},
};
use log::warn;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An abstraction over the networking part of the simulator link.
///
/// The server accepts a single persistent connection from the simulator.
/// Every message taken from [`SimServer::recv_message`] must be answered
/// with [`SimServer::send_response`] before the next receive.
pub struct SimServer {
    /// REP socket which accepts telemetry from the simulator
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the [`SimServer`]
#[derive(thiserror::Error, Debug)]
pub enum SimServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the response to the simulator: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the response: {0}")]
    SerializationError(SimParseError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimServer {
    /// Create a new instance of the simulator server.
    ///
    /// This function will not wait for a connection from the simulator
    /// before returning.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, SimServerError> {
        // Create the socket options
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            recv_timeout: 200,
            send_timeout: 10,
            ..Default::default()
        };

        // Create the socket
        let socket = MonitoredSocket::new(
            ctx,
            zmq::REP,
            socket_options,
            &params.sim_endpoint
        )?;

        // Create self
        Ok(Self { socket })
    }

    /// Retrieve the next message from the simulator.
    ///
    /// `None` is returned if nothing arrived within the receive timeout, in
    /// which case no response is owed. A message which cannot be parsed is
    /// returned as [`SimMessage::Manual`], because once a message has been
    /// taken off the socket a response must still be sent to keep the
    /// REQ/REP exchange in step.
    pub fn recv_message(&mut self) -> Option<SimMessage> {
        match self.socket.recv_string(0) {
            Ok(Ok(json)) => match SimMessage::from_json(&json) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Could not parse the simulator message: {}", e);
                    Some(SimMessage::Manual)
                }
            },
            Ok(Err(_)) => {
                warn!("Simulator message is not valid UTF-8");
                Some(SimMessage::Manual)
            }
            // Nothing to read within the timeout
            Err(zmq::Error::EAGAIN) => None,
            Err(e) => {
                warn!("Could not read from the simulator socket: {}", e);
                None
            }
        }
    }

    /// Send a response to the simulator for the last received message.
    pub fn send_response(
        &mut self,
        response: &SimResponse
    ) -> Result<(), SimServerError> {
        // Serialize response
        let resp_str = response
            .to_json()
            .map_err(SimServerError::SerializationError)?;

        // Send response
        match self.socket.send(&resp_str, 0) {
            Ok(_) => Ok(()),
            Err(e) => Err(SimServerError::SendError(e)),
        }
    }
}

impl From<MonitoredSocketError> for SimServerError {
    fn from(e: MonitoredSocketError) -> Self {
        SimServerError::SocketError(e)
    }
}
