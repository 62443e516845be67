//! Lightness/chroma model built on the CIELAB compression.
//!
//! Forward, relative to the equal-energy white:
//! ```text
//! f = cbrt(t)              (t > 216/24389)
//!   = (24389/27·t + 16)/116 (otherwise)
//! J = 1.16·fY − 0.16
//! a = 5·(fX − fY),  b = 2·(fY − fZ)
//! C = √(a² + b²)
//! s = √(C / (0.1·√J))      (J > ε, else 0)
//! h = atan2(b, a) / 2π     in [0, 1)
//! ```
//! `J`, `a`, `b` are CIE `L*`, `a*`, `b*` divided by 100.

use std::f64::consts::TAU;
use std::sync::Arc;

use glam::{Mat3, Vec3};

use crate::appearance::{Jsh, wrap_hue};
use crate::color_management::{ColorRegistry, EQUAL_ENERGY};
use crate::error::ColorResult;
use crate::transform::SampledFunction;

const CIE_E: f64 = 216.0 / 24389.0;
const CIE_K: f64 = 24389.0 / 27.0;
/// Inverse-compression threshold, `cbrt(CIE_E)`.
const DELTA: f32 = 6.0 / 29.0;

/// Below this lightness saturation is reported as zero.
const J_EPSILON: f32 = 1e-5;

const COMPRESSION_SAMPLES: usize = 65536;

fn compress(t: f64) -> f64 {
    if t > CIE_E {
        t.cbrt()
    } else {
        (CIE_K * t + 16.0) / 116.0
    }
}

/// `compress` sampled over `[0, 1]`. Served through
/// [`ColorRegistry::lab_compression`] so converters share one copy.
pub(crate) fn compression_table() -> SampledFunction {
    SampledFunction::new(0.0, 1.0, COMPRESSION_SAMPLES, compress)
}

#[inline]
fn expand(f: f32) -> f32 {
    if f > DELTA {
        f * f * f
    } else {
        (116.0 * f - 16.0) / CIE_K as f32
    }
}

/// XYZ ↔ Jsh through the CIELAB compression.
#[derive(Debug, Clone)]
pub struct LabConverter {
    /// Input white → `E`.
    cat_in: Mat3,
    /// `E` → output white.
    cat_out: Mat3,
    compression: Arc<SampledFunction>,
}

impl LabConverter {
    pub fn new(registry: &ColorRegistry, illum_in: &str, illum_out: &str) -> ColorResult<Self> {
        let cat_in = registry.cat(illum_in, EQUAL_ENERGY)?.to_mat3();
        let cat_out = registry.cat(EQUAL_ENERGY, illum_out)?.to_mat3();
        Ok(Self {
            cat_in,
            cat_out,
            compression: registry.lab_compression(),
        })
    }

    pub fn to_jsh(&self, xyz: Vec3) -> Jsh {
        let t = self.cat_in * xyz;
        let fx = self.compression.eval(t.x);
        let fy = self.compression.eval(t.y);
        let fz = self.compression.eval(t.z);

        let a = 5.0 * (fx - fy);
        let b = 2.0 * (fy - fz);
        let j = 1.16 * fy - 0.16;

        let chroma = (a * a + b * b).sqrt();
        let s = if j > J_EPSILON {
            (chroma / (0.1 * j.sqrt())).sqrt()
        } else {
            0.0
        };
        let h = wrap_hue((b as f64).atan2(a as f64) / TAU) as f32;

        Jsh::new(j, s, h)
    }

    pub fn to_xyz(&self, jsh: Jsh) -> Vec3 {
        let Jsh { j, s, h } = jsh;
        let chroma = s * s * 0.1 * j.max(0.0).sqrt();
        let (sin, cos) = (h as f64 * TAU).sin_cos();
        let a = chroma * cos as f32;
        let b = chroma * sin as f32;

        let fy = (j + 0.16) / 1.16;
        let fx = fy + a / 5.0;
        let fz = fy - b / 2.0;

        self.cat_out * Vec3::new(expand(fx), expand(fy), expand(fz))
    }
}
