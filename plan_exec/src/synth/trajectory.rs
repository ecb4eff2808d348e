//! Trajectory data structure shared between synthesis and the wire format.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An ordered sequence of world-frame points for the controller to track,
/// one point per simulator tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// The points of the trajectory in the world frame
    pub points_m: Vec<Point2<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    /// Build a trajectory from parallel x and y arrays as carried on the
    /// wire. If the arrays differ in length the extra tail is dropped.
    pub fn from_parallel(x_m: &[f64], y_m: &[f64]) -> Self {
        Self {
            points_m: x_m
                .iter()
                .zip(y_m.iter())
                .map(|(&x, &y)| Point2::new(x, y))
                .collect(),
        }
    }

    /// Split the trajectory back into parallel x and y arrays.
    pub fn to_parallel(&self) -> (Vec<f64>, Vec<f64>) {
        (
            self.points_m.iter().map(|p| p.x).collect(),
            self.points_m.iter().map(|p| p.y).collect(),
        )
    }

    /// Number of points in the trajectory.
    pub fn len(&self) -> usize {
        self.points_m.len()
    }

    /// True if the trajectory holds no points.
    pub fn is_empty(&self) -> bool {
        self.points_m.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parallel_round_trip() {
        let traj = Trajectory::from_parallel(&[0.0, 1.0, 2.0], &[5.0, 6.0, 7.0]);

        assert_eq!(traj.len(), 3);
        assert_eq!(traj.points_m[1], Point2::new(1.0, 6.0));

        let (x_m, y_m) = traj.to_parallel();
        assert_eq!(x_m, vec![0.0, 1.0, 2.0]);
        assert_eq!(y_m, vec![5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_mismatched_lengths_drop_the_tail() {
        let traj = Trajectory::from_parallel(&[0.0, 1.0, 2.0], &[5.0]);

        assert_eq!(traj.len(), 1);
        assert_eq!(traj.points_m[0], Point2::new(0.0, 5.0));
    }

    #[test]
    fn test_empty() {
        let traj = Trajectory::from_parallel(&[], &[]);

        assert!(traj.is_empty());
        assert_eq!(traj.to_parallel(), (vec![], vec![]));
    }
}
