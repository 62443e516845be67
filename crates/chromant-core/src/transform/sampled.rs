//! Precomputed lookup tables for expensive scalar functions.
//!
//! A [`SampledFunction`] evaluates its function once at `N` evenly spaced
//! points over `[x_min, x_max]` and answers in-domain queries by linear
//! interpolation between the two bracketing samples. Queries outside the
//! domain are not extrapolated from the table: they call the function
//! directly.
//!
//! # Complexity
//! - Build: O(N) function evaluations
//! - Evaluate: O(1)

use std::fmt;

type ScalarFn = dyn Fn(f64) -> f64 + Send + Sync;

/// A monotone (or otherwise smooth) function baked into a dense table.
///
/// Immutable after construction, so it can be shared across worker threads.
pub struct SampledFunction {
    x_min: f32,
    x_max: f32,
    /// Samples per unit of input, `(N - 1) / (x_max - x_min)`.
    scale: f32,
    samples: Vec<f32>,
    func: Box<ScalarFn>,
}

impl SampledFunction {
    /// Fewest samples a table may hold.
    pub const MIN_SAMPLES: usize = 256;
    /// Most samples a table may hold.
    pub const MAX_SAMPLES: usize = 65536;

    /// Sample `func` over `[x_min, x_max]`.
    ///
    /// `samples` is clamped to [`MIN_SAMPLES`](Self::MIN_SAMPLES)..=[`MAX_SAMPLES`](Self::MAX_SAMPLES).
    /// The function is evaluated in f64 and stored as f32, so exact values
    /// at the domain ends (e.g. `f(1) == 1`) survive the table.
    pub fn new<F>(x_min: f32, x_max: f32, samples: usize, func: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        let n = samples.clamp(Self::MIN_SAMPLES, Self::MAX_SAMPLES);
        let range = (x_max - x_min).max(f32::EPSILON);
        let lo = x_min as f64;
        let hi = x_max as f64;
        let last = (n - 1) as f64;

        let samples = (0..n)
            .map(|i| {
                let t = i as f64 / last;
                func(lo * (1.0 - t) + hi * t) as f32
            })
            .collect();

        Self {
            x_min,
            x_max,
            scale: (n - 1) as f32 / range,
            samples,
            func: Box::new(func),
        }
    }

    /// Evaluate at `x`. NaN is treated as `0.0`.
    #[inline]
    pub fn eval(&self, x: f32) -> f32 {
        // Upstream producers occasionally hand us NaN; map it to a defined
        // input rather than poisoning every downstream pixel.
        let x = if x.is_nan() { 0.0 } else { x };

        if x < self.x_min || x > self.x_max {
            return (self.func)(x as f64) as f32;
        }

        let pos = (x - self.x_min) * self.scale;
        let idx = pos as usize;
        let last = self.samples.len() - 1;
        if idx >= last {
            return self.samples[last];
        }

        let frac = pos - idx as f32;
        let a = self.samples[idx];
        let b = self.samples[idx + 1];
        a + (b - a) * frac
    }

    /// Evaluate the underlying function without the table.
    pub fn eval_exact(&self, x: f32) -> f32 {
        (self.func)(x as f64) as f32
    }

    /// The sampled domain `(x_min, x_max)`.
    pub fn domain(&self) -> (f32, f32) {
        (self.x_min, self.x_max)
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false`: a table holds at least [`MIN_SAMPLES`](Self::MIN_SAMPLES).
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl fmt::Debug for SampledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampledFunction")
            .field("domain", &(self.x_min, self.x_max))
            .field("samples", &self.samples.len())
            .finish()
    }
}
