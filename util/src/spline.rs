//! # Cubic spline interpolation
//!
//! Natural cubic spline through a set of knots. Used by trajectory synthesis
//! to shape smooth paths through anchor points.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A natural cubic spline over a set of knots.
///
/// Within segment `i` the spline evaluates as
/// `a[i] + b[i]*dx + c[i]*dx^2 + d[i]*dx^3` with `dx = t - x[i]`. The second
/// derivative is zero at both end knots (the "natural" boundary condition).
pub struct CubicSpline {
    /// Knot x positions, strictly increasing
    x: Vec<f64>,

    /// Polynomial coefficients per segment (`a` is the knot y values)
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with fitting a spline.
#[derive(Debug, Error)]
pub enum SplineError {
    #[error("At least two knots are required to fit a spline, got {0}")]
    TooFewKnots(usize),

    #[error("Knot lists must be the same length ({0} x values, {1} y values)")]
    KnotCountMismatch(usize, usize),

    #[error("Knot x values must be strictly increasing (violated at index {0})")]
    NonMonotonicKnots(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CubicSpline {
    /// Fit a natural cubic spline through the given knots.
    ///
    /// The x values must be strictly increasing.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, SplineError> {
        if x.len() != y.len() {
            return Err(SplineError::KnotCountMismatch(x.len(), y.len()));
        }
        if x.len() < 2 {
            return Err(SplineError::TooFewKnots(x.len()));
        }
        for i in 1..x.len() {
            if x[i] <= x[i - 1] {
                return Err(SplineError::NonMonotonicKnots(i));
            }
        }

        let n = x.len();

        // Segment widths
        let h: Vec<f64> = (0..n - 1).map(|i| x[i + 1] - x[i]).collect();

        let a = y.to_vec();

        // Solve the tridiagonal system for the second-derivative coefficients
        // using the standard forward elimination and back substitution
        // sweeps. Natural boundary conditions pin c[0] and c[n-1] to zero.
        let mut alpha = vec![0.0; n];
        for i in 1..n - 1 {
            alpha[i] = 3.0 * (a[i + 1] - a[i]) / h[i] - 3.0 * (a[i] - a[i - 1]) / h[i - 1];
        }

        let mut l = vec![1.0; n];
        let mut mu = vec![0.0; n];
        let mut z = vec![0.0; n];
        for i in 1..n - 1 {
            l[i] = 2.0 * (x[i + 1] - x[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / l[i];
            z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
        }

        let mut c = vec![0.0; n];
        let mut b = vec![0.0; n - 1];
        let mut d = vec![0.0; n - 1];
        for j in (0..n - 1).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            b[j] = (a[j + 1] - a[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
            d[j] = (c[j + 1] - c[j]) / (3.0 * h[j]);
        }

        Ok(CubicSpline {
            x: x.to_vec(),
            a,
            b,
            c,
            d,
        })
    }

    /// Evaluate the spline at `t`.
    ///
    /// Outside the knot range the end segment's polynomial is extended, so
    /// callers evaluating slightly past the last knot get a smooth
    /// continuation rather than a discontinuity.
    pub fn eval(&self, t: f64) -> f64 {
        let i = self.segment_index(t);
        let dx = t - self.x[i];

        self.a[i] + self.b[i] * dx + self.c[i] * dx.powi(2) + self.d[i] * dx.powi(3)
    }

    /// Number of knots in the spline.
    pub fn num_knots(&self) -> usize {
        self.x.len()
    }

    /// Find the segment containing `t`, clamping to the end segments for out
    /// of range values.
    fn segment_index(&self, t: f64) -> usize {
        let idx = self.x.partition_point(|&xi| xi <= t);
        idx.saturating_sub(1).min(self.x.len() - 2)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_passes_through_knots() {
        let x = [0.0, 1.0, 2.5, 4.0, 7.0];
        let y = [1.0, -2.0, 0.5, 3.0, 2.0];

        let spline = CubicSpline::new(&x, &y).unwrap();

        for i in 0..x.len() {
            assert!((spline.eval(x[i]) - y[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_colinear_knots_give_a_line() {
        // A natural spline through colinear points is exactly the line
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];

        let spline = CubicSpline::new(&x, &y).unwrap();

        assert!((spline.eval(0.5) - 2.0).abs() < 1e-12);
        assert!((spline.eval(2.5) - 6.0).abs() < 1e-12);

        // End segment extension continues the line
        assert!((spline.eval(3.5) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_knots() {
        let spline = CubicSpline::new(&[0.0, 2.0], &[0.0, 1.0]).unwrap();

        assert_eq!(spline.num_knots(), 2);
        assert!((spline.eval(1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_knots() {
        assert!(matches!(
            CubicSpline::new(&[0.0], &[0.0]),
            Err(SplineError::TooFewKnots(1))
        ));
        assert!(matches!(
            CubicSpline::new(&[0.0, 1.0], &[0.0]),
            Err(SplineError::KnotCountMismatch(2, 1))
        ));
        assert!(matches!(
            CubicSpline::new(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0]),
            Err(SplineError::NonMonotonicKnots(2))
        ));
        assert!(matches!(
            CubicSpline::new(&[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0]),
            Err(SplineError::NonMonotonicKnots(2))
        ));
    }
}
