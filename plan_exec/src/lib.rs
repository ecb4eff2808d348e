//! # Planner library.
//!
//! This library allows other crates and binaries in the workspace to access
//! items defined inside the planner crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Behavior selection - decides the target lane and reference speed each cycle
pub mod behavior;

/// Planning cycle module - owns the persistent planner state and runs one full cycle
pub mod planner;

/// Road map and road-relative frame transforms
pub mod road;

/// Simulator-facing server - one telemetry/trajectory exchange per cycle
pub mod sim_server;

/// Trajectory synthesis - shapes the world-frame trajectory for the selected behavior
pub mod synth;

/// Telemetry server - broadcasts per-cycle monitoring packets
pub mod tm_server;

/// Traffic gap analysis - constant-velocity prediction and lane-band gap checks
pub mod traffic;

/// Global data store for the executable
pub mod data_store;
