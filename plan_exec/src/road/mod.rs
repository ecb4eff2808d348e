//! # Road map and frame transforms
//!
//! This module owns the waypoint map of the track and the transforms between
//! the world frame and the road-relative frame.
//!
//! The road-relative frame describes a position by `s`, the longitudinal
//! distance along the track centre line from the start line, and `d`, the
//! signed lateral offset from the centre line. Positive `d` points into the
//! lanes (to the right of the direction of travel).

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod frame;
mod map;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use frame::RoadCoord;
pub use map::{RoadMap, RoadMapError, Waypoint};
