//! Cubic spline curves through control points, and 1D LUT baking.
//!
//! Used for tone curves and as the interpolation primitive of the
//! saturation roll-off in [`crate::gamut::GamutMapper`].
//!
//! # Algorithm
//! The second derivatives `M_i` at the knots solve a tridiagonal system
//! (interior rows shown, end rows per [`EndCondition`]):
//! ```text
//! h_{i-1}·M_{i-1} + 2(h_{i-1} + h_i)·M_i + h_i·M_{i+1}
//!     = 6·((y_{i+1} − y_i)/h_i − (y_i − y_{i−1})/h_{i−1})
//! ```
//! Each segment is then evaluated as
//! ```text
//! y = a·y_k + b·y_{k+1} + ((a³ − a)·M_k + (b³ − b)·M_{k+1})·h²/6
//! a = (x_{k+1} − x)/h,  b = 1 − a
//! ```
//!
//! # Complexity
//! - Build: O(N) (tridiagonal solve)
//! - Evaluate: O(log N) binary search + O(1) interpolation

use serde::{Deserialize, Serialize};

use crate::error::{ColorError, ColorResult};

/// Boundary condition at one end of a spline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum EndCondition {
    /// Zero second derivative.
    #[default]
    Natural,
    /// Clamped: the given first derivative.
    Slope(f32),
    /// The given second derivative.
    Curvature(f32),
}

/// A curve through control points: cubic spline, or a straight line for a
/// two-point curve built with `linear` set.
///
/// Outputs are clipped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct SplineCurve {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots. All zero for a straight line.
    y2: Vec<f64>,
}

impl SplineCurve {
    /// Build a curve from `[x, y]` control points in any order.
    ///
    /// Points sharing an x-value are merged into one point at their mean y.
    /// `linear` only matters for a two-point curve, which then becomes a
    /// straight line regardless of the end conditions.
    pub fn new(
        control_points: &[[f32; 2]],
        start: EndCondition,
        end: EndCondition,
        linear: bool,
    ) -> ColorResult<Self> {
        let (xs, ys) = dedup_control_points(control_points);
        let n = xs.len();
        if n < 2 {
            return Err(ColorError::InsufficientControlPoints(n));
        }

        if n == 2 && linear {
            return Ok(Self {
                xs,
                ys,
                y2: vec![0.0; 2],
            });
        }

        let y2 = solve_second_derivatives(&xs, &ys, start, end)?;
        Ok(Self { xs, ys, y2 })
    }

    /// Natural cubic spline (zero curvature at both ends).
    pub fn natural(control_points: &[[f32; 2]]) -> ColorResult<Self> {
        Self::new(
            control_points,
            EndCondition::Natural,
            EndCondition::Natural,
            false,
        )
    }

    /// `(x_left, x_right)` of the control points.
    pub fn x_range(&self) -> (f32, f32) {
        (self.xs[0] as f32, self.xs[self.xs.len() - 1] as f32)
    }

    /// Evaluate the curve at `x`.
    ///
    /// Values outside the control point range are clamped to the
    /// first/last control point's y-value.
    pub fn evaluate(&self, x: f32) -> f32 {
        let n = self.xs.len();
        let x = x as f64;

        let y = if x.is_nan() || x <= self.xs[0] {
            self.ys[0]
        } else if x >= self.xs[n - 1] {
            self.ys[n - 1]
        } else {
            // Segment k with xs[k] <= x < xs[k + 1]
            let k = self.xs.partition_point(|&xi| xi <= x).clamp(1, n - 1) - 1;
            let h = self.xs[k + 1] - self.xs[k];
            let a = (self.xs[k + 1] - x) / h;
            let b = (x - self.xs[k]) / h;
            a * self.ys[k]
                + b * self.ys[k + 1]
                + ((a * a * a - a) * self.y2[k] + (b * b * b - b) * self.y2[k + 1]) * (h * h)
                    / 6.0
        };

        (y as f32).clamp(0.0, 1.0)
    }
}

/// Sort by x and average the y-values of points sharing an x.
fn dedup_control_points(points: &[[f32; 2]]) -> (Vec<f64>, Vec<f64>) {
    let mut sorted: Vec<[f64; 2]> = points
        .iter()
        .filter(|p| p[0].is_finite() && p[1].is_finite())
        .map(|p| [p[0] as f64, p[1] as f64])
        .collect();
    sorted.sort_by(|a, b| a[0].total_cmp(&b[0]));

    let mut xs: Vec<f64> = Vec::with_capacity(sorted.len());
    let mut ys: Vec<f64> = Vec::with_capacity(sorted.len());
    let mut i = 0;
    while i < sorted.len() {
        let x = sorted[i][0];
        let mut sum = 0.0;
        let mut count = 0;
        while i < sorted.len() && sorted[i][0] == x {
            sum += sorted[i][1];
            count += 1;
            i += 1;
        }
        xs.push(x);
        ys.push(sum / count as f64);
    }
    (xs, ys)
}

fn solve_second_derivatives(
    xs: &[f64],
    ys: &[f64],
    start: EndCondition,
    end: EndCondition,
) -> ColorResult<Vec<f64>> {
    let n = xs.len();
    let mut sub = vec![0.0; n];
    let mut diag = vec![0.0; n];
    let mut sup = vec![0.0; n];
    let mut rhs = vec![0.0; n];

    let h = |i: usize| xs[i + 1] - xs[i];
    let secant = |i: usize| (ys[i + 1] - ys[i]) / h(i);

    match start {
        EndCondition::Natural => diag[0] = 1.0,
        EndCondition::Curvature(c) => {
            diag[0] = 1.0;
            rhs[0] = c as f64;
        }
        EndCondition::Slope(d) => {
            diag[0] = 2.0 * h(0);
            sup[0] = h(0);
            rhs[0] = 6.0 * (secant(0) - d as f64);
        }
    }

    for i in 1..n - 1 {
        sub[i] = h(i - 1);
        diag[i] = 2.0 * (h(i - 1) + h(i));
        sup[i] = h(i);
        rhs[i] = 6.0 * (secant(i) - secant(i - 1));
    }

    let last = n - 1;
    match end {
        EndCondition::Natural => diag[last] = 1.0,
        EndCondition::Curvature(c) => {
            diag[last] = 1.0;
            rhs[last] = c as f64;
        }
        EndCondition::Slope(d) => {
            sub[last] = h(last - 1);
            diag[last] = 2.0 * h(last - 1);
            rhs[last] = 6.0 * (d as f64 - secant(last - 1));
        }
    }

    solve_tridiagonal(&sub, &diag, &sup, &rhs).ok_or(ColorError::SingularSpline)
}

/// Gaussian elimination specialized for a tridiagonal matrix (Thomas algorithm).
///
/// `sub[0]` and `sup[n - 1]` are ignored. Returns `None` on a zero pivot.
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Option<Vec<f64>> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];

    if diag[0] == 0.0 {
        return None;
    }
    c[0] = sup[0] / diag[0];
    d[0] = rhs[0] / diag[0];

    for i in 1..n {
        let pivot = diag[i] - sub[i] * c[i - 1];
        if pivot == 0.0 {
            return None;
        }
        c[i] = sup[i] / pivot;
        d[i] = (rhs[i] - sub[i] * d[i - 1]) / pivot;
    }

    let mut out = d;
    for i in (0..n - 1).rev() {
        out[i] -= c[i] * out[i + 1];
    }
    Some(out)
}

/// Bake a set of curve control points into a 1D LUT.
///
/// The LUT maps uniformly-spaced input values [0..1] to output values
/// using a natural cubic spline through the control points.
///
/// Returns a `Vec<f32>` of length `size`. Fewer than two distinct control
/// points produce an identity LUT.
pub fn bake_curve_to_1d_lut(control_points: &[[f32; 2]], size: usize) -> Vec<f32> {
    let step = |i: usize| i as f32 / (size.max(2) - 1) as f32;

    match SplineCurve::natural(control_points) {
        Ok(curve) => (0..size).map(|i| curve.evaluate(step(i))).collect(),
        Err(_) => (0..size).map(step).collect(),
    }
}
