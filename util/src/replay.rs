//! # Telemetry replay module
//!
//! This module provides a player for recorded telemetry scripts, allowing
//! planning cycles to be driven without a simulator on the other end of the
//! connection.
//!
//! A script is a plain text file of `time : telemetry;` entries, where `time`
//! is the session-relative execution time in seconds and `telemetry` is a
//! JSON telemetry snapshot as the simulator would send it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::sim::{SimParseError, TelemetrySnapshot};
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A telemetry snapshot which is scripted to arrive at a specific time.
struct TimedSnapshot {
    /// The time the snapshot is supposed to arrive at
    arrival_time_s: f64,

    /// The snapshot itself
    snapshot: TelemetrySnapshot
}

/// A telemetry script player.
///
/// After initialising with the path to the script to play use `.get_pending`
/// to acquire the snapshots which are due for processing.
pub struct TelemetryPlayer {
    _script_path: PathBuf,
    snapshots: VecDeque<TimedSnapshot>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid telemetry snapshot at {0} s: {1}")]
    InvalidTelemetry(f64, SimParseError)
}

pub enum PendingTelemetry {
    None,
    Some(Vec<TelemetrySnapshot>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TelemetryPlayer {

    /// Create a new player from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ReplayError> {

        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());

        // Check that the script file exists.
        if !path.exists() {
            return Err(
                ReplayError::ScriptNotFound(path.to_string_lossy().to_string()));
        }

        // Load the script into a string
        let script = match fs::read_to_string(script_path) {
            Ok(s) => s,
            Err(e) => return Err(ReplayError::ScriptLoadError(e))
        };

        // Empty queue of snapshots
        let mut snapshot_queue: VecDeque<TimedSnapshot> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .unwrap();

        let mut num_caps = 0;

        for cap in re.captures_iter(&script) {
            // Parse the arrival time
            let arrival_time_s: f64 = match cap.get(1).unwrap().as_str().parse() {
                Ok(t) => t,
                Err(e) => return Err(
                    ReplayError::InvalidTimestamp(format!("{}", e)))
            };

            // Parse the snapshot from the payload. The scripts contain JSON
            // only.
            let snapshot = match TelemetrySnapshot::from_json(
                cap.get(3).unwrap().as_str())
            {
                Ok(s) => s,
                Err(e) => return Err(ReplayError::InvalidTelemetry(
                    arrival_time_s, e
                ))
            };

            // Build the entry from the match
            snapshot_queue.push_back(TimedSnapshot {
                arrival_time_s,
                snapshot
            });

            num_caps += 1;
        }

        if num_caps == 0 {
            return Err(ReplayError::ScriptEmpty)
        }

        Ok(TelemetryPlayer {
            _script_path: path,
            snapshots: snapshot_queue
        })
    }

    /// Return a vector of due snapshots, or `None` if no snapshot is due yet.
    pub fn get_pending(&mut self) -> PendingTelemetry {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.snapshots.is_empty() {
            return PendingTelemetry::EndOfScript
        }

        let mut snapshot_vec: Vec<TelemetrySnapshot> = vec![];

        let current_time_s = get_elapsed_seconds();

        // Peek items from the queue, if the head's arrival time is lower than
        // the current time add it to the vector, and keep adding snapshots
        // until the arrival times are larger than the current time.
        while
            !self.snapshots.is_empty()
            &&
            self.snapshots.front().unwrap().arrival_time_s < current_time_s
        {
            snapshot_vec.push(self.snapshots.pop_front().unwrap().snapshot);
        }

        // If the vector is longer than 0 return Some, otherwise None
        if !snapshot_vec.is_empty() {
            PendingTelemetry::Some(snapshot_vec)
        }
        else {
            PendingTelemetry::None
        }
    }

    /// Get the number of snapshots remaining in the script
    pub fn get_num_snapshots(&self) -> usize {
        self.snapshots.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.snapshots.back() {
            Some(s) => s.arrival_time_s,
            None => 0f64
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn demo_snapshot_json() -> String {
        let snapshot = TelemetrySnapshot {
            x_m: 909.48,
            y_m: 1128.67,
            s_m: 124.834,
            d_m: 6.165,
            yaw_deg: 0.0,
            speed_mph: 0.0,
            previous_path_x_m: vec![],
            previous_path_y_m: vec![],
            end_path_s_m: 0.0,
            end_path_d_m: 0.0,
            sensed_vehicles: vec![]
        };

        snapshot.to_json().unwrap()
    }

    fn write_script(name: &str, content: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_script() {
        let script = format!(
            "0.1 : {};\n2.5 : {};\n",
            demo_snapshot_json(),
            demo_snapshot_json()
        );
        let path = write_script("replay_parse.prs", &script);

        let player = TelemetryPlayer::new(&path).unwrap();

        assert_eq!(player.get_num_snapshots(), 2);
        assert!((player.get_duration() - 2.5).abs() < 1e-9);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_script() {
        assert!(matches!(
            TelemetryPlayer::new("/nonexistent/script.prs"),
            Err(ReplayError::ScriptNotFound(_))
        ));
    }

    #[test]
    fn test_empty_script() {
        let path = write_script("replay_empty.prs", "# no entries here\n");

        assert!(matches!(
            TelemetryPlayer::new(&path),
            Err(ReplayError::ScriptEmpty)
        ));

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_invalid_telemetry() {
        let path = write_script("replay_invalid.prs", "0.1 : {\"not\": \"telemetry\"};\n");

        assert!(matches!(
            TelemetryPlayer::new(&path),
            Err(ReplayError::InvalidTelemetry(_, _))
        ));

        fs::remove_file(path).unwrap();
    }
}
