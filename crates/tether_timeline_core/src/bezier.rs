// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cubic Bezier evaluation and inversion.
//!
//! Curve tracks are chains of cubic segments joined at anchors. A segment is
//! parameterized by `t`, not by time, so evaluating a curve at a given `x`
//! first inverts the x-component with [`find_t_for_x`] and then reads the
//! y-component with [`cubic_bezier`].

use serde::{Deserialize, Serialize};

/// Default tolerance for [`find_t_for_x`], in normalized x units.
pub const DEFAULT_PRECISION: f64 = 0.0001;

/// Upper bound on bisection steps. 64 halvings exhaust `f64` resolution.
const MAX_BISECTIONS: u32 = 64;

/// A point in normalized curve space.
///
/// `x` is normalized time within the track, `y` the normalized value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Normalized time
    pub x: f64,
    /// Normalized value
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp both coordinates to [0, 1]
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }
}

/// Linear interpolation between two floats
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// One-dimensional cubic Bernstein polynomial.
pub fn cubic(p0: f64, c1: f64, c2: f64, p1: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let mt3 = mt2 * mt;

    p0 * mt3 + 3.0 * c1 * mt2 * t + 3.0 * c2 * mt * t2 + p1 * t3
}

/// Evaluate a cubic Bezier segment at parameter `t`.
///
/// `t` is expected in [0, 1]; values outside that range extrapolate the
/// polynomial and carry no meaning for curve tracks.
pub fn cubic_bezier(p0: Point, c1: Point, c2: Point, p1: Point, t: f64) -> Point {
    Point {
        x: cubic(p0.x, c1.x, c2.x, p1.x, t),
        y: cubic(p0.y, c1.y, c2.y, p1.y, t),
    }
}

/// Find the parameter `t` at which the x-component of a segment reaches
/// `target_x`, by bisection over [0, 1].
///
/// Assumes the x-component is non-decreasing in `t`. When it is not, the
/// result is some parameter whose x lies within `precision` of the target,
/// or the last midpoint once the step limit is reached.
pub fn find_t_for_x(p0: f64, c1: f64, c2: f64, p1: f64, target_x: f64, precision: f64) -> f64 {
    let mut lower = 0.0;
    let mut upper = 1.0;
    let mut mid = 0.5;
    let mut x = cubic(p0, c1, c2, p1, mid);

    let mut steps = 0;
    while (target_x - x).abs() > precision && steps < MAX_BISECTIONS {
        if target_x > x {
            lower = mid;
        } else {
            upper = mid;
        }
        mid = lower + 0.5 * (upper - lower);
        x = cubic(p0, c1, c2, p1, mid);
        steps += 1;
    }

    mid
}
