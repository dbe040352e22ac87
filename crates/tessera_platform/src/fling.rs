//! Fling (inertial scroll) support
//!
//! [`Extrapolation`] estimates the release velocity of a scroll gesture by a
//! least-squares polynomial fit over its most recent samples.
//! [`FlingAnimation`] turns that velocity into an exponentially decaying
//! sequence of scroll distances.

use crate::config::FlingConfig;
use crate::unit::{Config, Value};
use std::time::{Duration, Instant};

/// Maximum number of samples kept
const HISTORY: usize = 20;
/// Samples older than this, relative to the newest, are ignored
const PAST_DURATION: Duration = Duration::from_millis(100);
/// Degree of the fitted polynomial
const DEGREE: usize = 2;

#[derive(Clone, Copy, Debug, Default)]
struct Sample {
    t: Duration,
    v: f32,
}

/// Result of [`Extrapolation::estimate`]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Estimate {
    /// Velocity in units per second at the newest sample
    pub velocity: f32,
    /// Fitted position at the newest sample, relative to it
    pub distance: f32,
}

/// Ring buffer of position samples for one axis
#[derive(Clone, Debug, Default)]
pub struct Extrapolation {
    samples: [Sample; HISTORY],
    next: usize,
    len: usize,
    last_value: f32,
}

impl Extrapolation {
    /// Record a position change since the previous sample
    pub fn sample_delta(&mut self, t: Duration, delta: f32) {
        let v = self.last_value + delta;
        self.sample(t, v);
    }

    /// Record an absolute position
    pub fn sample(&mut self, t: Duration, v: f32) {
        self.samples[self.next] = Sample { t, v };
        self.next = (self.next + 1) % HISTORY;
        self.len = (self.len + 1).min(HISTORY);
        self.last_value = v;
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Estimate the velocity at the newest sample
    pub fn estimate(&self) -> Estimate {
        if self.len < 2 {
            return Estimate::default();
        }
        let newest = self.samples[(self.next + HISTORY - 1) % HISTORY];
        let mut xs = Vec::with_capacity(self.len);
        let mut ys = Vec::with_capacity(self.len);
        for i in 0..self.len {
            let s = self.samples[(self.next + HISTORY - 1 - i) % HISTORY];
            // Timestamps may go backwards across device resets.
            let Some(age) = newest.t.checked_sub(s.t) else {
                break;
            };
            if age > PAST_DURATION {
                break;
            }
            xs.push(-age.as_secs_f32());
            ys.push(s.v - newest.v);
        }
        let degree = DEGREE.min(xs.len().saturating_sub(1));
        if degree == 0 {
            return Estimate::default();
        }
        match poly_fit(&xs, &ys, degree) {
            Some(coeffs) => Estimate {
                distance: coeffs[0],
                velocity: coeffs[1],
            },
            None => Estimate::default(),
        }
    }
}

/// Decaying fling animation
#[derive(Clone, Debug, Default)]
pub struct FlingAnimation {
    start: Option<Instant>,
    v0: f32,
    x: f32,
    decay: f32,
    threshold: f32,
}

impl FlingAnimation {
    /// Start a fling with the given release speed (px/s, non-negative).
    ///
    /// Returns false and leaves the animation idle if the speed is below the
    /// configured minimum.
    pub fn start(&mut self, cfg: &Config, fling: &FlingConfig, now: Instant, speed: f32) -> bool {
        let min = cfg.px_f32(Value::dp(fling.min_velocity));
        let max = cfg.px_f32(Value::dp(fling.max_velocity));
        if !(speed >= min) {
            self.stop();
            return false;
        }
        *self = Self {
            start: Some(now),
            v0: speed.min(max),
            x: 0.0,
            decay: fling.decay,
            threshold: fling.threshold_velocity,
        };
        true
    }

    pub fn active(&self) -> bool {
        self.start.is_some()
    }

    pub fn stop(&mut self) {
        self.start = None;
    }

    /// Advance to `now` and return the distance travelled since the
    /// previous tick
    pub fn tick(&mut self, now: Instant) -> f32 {
        let Some(t0) = self.start else {
            return 0.0;
        };
        let t = now.saturating_duration_since(t0).as_secs_f32();
        let falloff = (-self.decay * t).exp();
        let x = self.v0 / self.decay * (1.0 - falloff);
        let dist = x - self.x;
        self.x = x;
        if self.v0 * falloff < self.threshold {
            self.stop();
        }
        dist
    }
}

// ============================================================================
// Least squares
// ============================================================================

/// Dense row-major matrix
#[derive(Clone, Debug, PartialEq)]
struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    fn get(&self, r: usize, c: usize) -> f32 {
        self.data[r * self.cols + c]
    }

    fn set(&mut self, r: usize, c: usize, v: f32) {
        self.data[r * self.cols + c] = v;
    }

    #[cfg(test)]
    fn mul(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.cols, other.rows);
        let mut out = Matrix::zeros(self.rows, other.cols);
        for r in 0..self.rows {
            for c in 0..other.cols {
                let v = (0..self.cols).map(|k| self.get(r, k) * other.get(k, c)).sum();
                out.set(r, c, v);
            }
        }
        out
    }
}

/// QR decomposition by modified Gram-Schmidt.
///
/// Returns `Q` (rows × cols, orthonormal columns) and upper triangular `R`
/// (cols × cols), or `None` if the columns are linearly dependent.
fn decompose_qr(a: &Matrix) -> Option<(Matrix, Matrix)> {
    let (m, n) = (a.rows, a.cols);
    let mut q = a.clone();
    let mut r = Matrix::zeros(n, n);
    for j in 0..n {
        let norm = (0..m).map(|i| q.get(i, j).powi(2)).sum::<f32>().sqrt();
        if norm <= 1e-6 {
            return None;
        }
        r.set(j, j, norm);
        for i in 0..m {
            q.set(i, j, q.get(i, j) / norm);
        }
        for k in j + 1..n {
            let dot: f32 = (0..m).map(|i| q.get(i, j) * q.get(i, k)).sum();
            r.set(j, k, dot);
            for i in 0..m {
                q.set(i, k, q.get(i, k) - dot * q.get(i, j));
            }
        }
    }
    Some((q, r))
}

/// Fit `y ≈ c0 + c1·x + … + cd·x^d` in the least squares sense
fn poly_fit(xs: &[f32], ys: &[f32], degree: usize) -> Option<Vec<f32>> {
    let (m, n) = (xs.len(), degree + 1);
    if m < n {
        return None;
    }
    let mut a = Matrix::zeros(m, n);
    for (i, &x) in xs.iter().enumerate() {
        let mut p = 1.0;
        for j in 0..n {
            a.set(i, j, p);
            p *= x;
        }
    }
    let (q, r) = decompose_qr(&a)?;
    // Solve R·c = Qᵀ·y by back substitution.
    let qty: Vec<f32> = (0..n)
        .map(|j| (0..m).map(|i| q.get(i, j) * ys[i]).sum())
        .collect();
    let mut c = vec![0.0; n];
    for j in (0..n).rev() {
        let tail: f32 = (j + 1..n).map(|k| r.get(j, k) * c[k]).sum();
        c[j] = (qty[j] - tail) / r.get(j, j);
    }
    Some(c)
}
